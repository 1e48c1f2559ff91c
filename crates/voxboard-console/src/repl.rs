//! The interactive console loop.
//!
//! Line-based equivalent of the dashboard routes: auth commands while
//! anonymous, assistant/console/analysis commands once signed in. Async work
//! runs on the shared runtime; the loop itself (and microphone capture,
//! whose stream handle is not `Send`) stays on the calling thread.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use voxboard_api::BackendClient;
use voxboard_audio::{encode_wav, Recorder, Speaker};
use voxboard_controllers::{
    AnalysisController, AssistantsController, ConsoleController, GuardDecision, RouteGuard,
    HOME_ROUTE,
};
use voxboard_session::{SessionManager, SessionPhase, SignUpProfile};
use voxboard_store::StoreClient;
use voxboard_types::Assistant;

/// Page controllers for one authenticated visit. Dropping the set cancels
/// its scope, aborting any in-flight fetch.
struct Pages {
    scope: CancellationToken,
    assistants: AssistantsController,
    console: ConsoleController,
    analysis: AnalysisController,
}

impl Drop for Pages {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

pub struct App {
    pub api: BackendClient,
    pub store: StoreClient,
    pub session: SessionManager,
    pub speaker: Speaker,
    pub language: String,
    guard: RouteGuard,
    pages: Option<Pages>,
}

impl App {
    pub fn new(
        api: BackendClient,
        store: StoreClient,
        session: SessionManager,
        speaker: Speaker,
        language: String,
    ) -> Self {
        Self {
            api,
            store,
            session,
            speaker,
            language,
            guard: RouteGuard::new(),
            pages: None,
        }
    }

    /// Builds the page controllers for the signed-in user, mirroring a
    /// navigation to the dashboard.
    fn open_pages(&mut self) -> Option<&mut Pages> {
        let state = self.session.current();
        let (user, token) = match (state.user(), state.access_token()) {
            (Some(user), Some(token)) => (user.clone(), token.to_string()),
            _ => {
                self.pages = None;
                return None;
            }
        };

        if self.pages.is_none() {
            let scope = CancellationToken::new();
            let assistants =
                AssistantsController::new(self.api.clone(), user.userid.clone(), scope.clone());
            let console =
                ConsoleController::new(self.api.clone(), self.language.clone(), scope.clone())
                    .with_speaker(self.speaker.clone());
            let analysis = AnalysisController::new(
                self.api.clone(),
                self.store.clone(),
                Some(token),
                scope.clone(),
            );
            self.pages = Some(Pages {
                scope,
                assistants,
                console,
                analysis,
            });
        }
        self.pages.as_mut()
    }

    fn close_pages(&mut self) {
        self.pages = None;
    }
}

/// Runs the console loop until `quit` or end-of-input.
pub fn run(runtime: &Runtime, mut app: App) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;

    render_route(&mut app);
    println!("type `help` for commands");

    loop {
        let line = match editor.readline("voxboard> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "login" => cmd_login(runtime, &mut app, &mut editor, rest),
            "signup" => cmd_signup(runtime, &mut app, &mut editor),
            "logout" => {
                app.session.sign_out();
                app.close_pages();
                render_route(&mut app);
            }
            "whoami" => cmd_whoami(&app),
            "assistants" => cmd_assistants(runtime, &mut app),
            "search" => cmd_search(runtime, &mut app, rest),
            "select" => cmd_select(runtime, &mut app, rest),
            "new" => cmd_new_assistant(runtime, &mut app, &mut editor),
            "history" => cmd_history(runtime, &mut app),
            "chat" => cmd_chat(runtime, &mut app, rest),
            "record" => cmd_record(runtime, &mut app, &mut editor),
            "language" => cmd_language(&mut app, rest),
            "session" => cmd_session(runtime, &mut app, rest),
            "newsession" => cmd_new_session(runtime, &mut app),
            "analysis" => cmd_analysis(runtime, &mut app),
            other => println!("unknown command `{other}` — type `help`"),
        }
    }

    Ok(())
}

/// Applies the route guard to the current session phase, printing the
/// "route" the user landed on.
fn render_route(app: &mut App) {
    let phase = app.session.current().phase;
    match app.guard.decide(&phase) {
        GuardDecision::RenderAuthForms => {
            println!("signed out — `login <email>` or `signup` to continue");
        }
        GuardDecision::RedirectHome => {
            println!("→ {HOME_ROUTE}");
            if let SessionPhase::Authenticated { user, .. } = &phase {
                println!("signed in as {} <{}>", user.name, user.email);
            }
        }
        GuardDecision::RenderNothing => {}
    }
    if let Some(error) = app.session.current().error {
        println!("! {error}");
    }
}

fn print_help() {
    println!(
        "\
auth:       login <email> · signup · logout · whoami
dashboard:  assistants · search <text> · select <n> · new
console:    record · chat <text> · history · language <code> · session <id> · newsession
analysis:   analysis
other:      help · quit"
    );
}

fn cmd_login(runtime: &Runtime, app: &mut App, editor: &mut DefaultEditor, rest: &str) {
    let email = if rest.is_empty() {
        match editor.readline("email: ") {
            Ok(line) => line.trim().to_string(),
            Err(_) => return,
        }
    } else {
        rest.to_string()
    };
    let password = match rpassword::prompt_password("password: ") {
        Ok(password) => password,
        Err(e) => {
            println!("error: {e}");
            return;
        }
    };

    match runtime.block_on(app.session.sign_in(&email, &password)) {
        Ok(_) => {
            app.close_pages();
            render_route(app);
        }
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_signup(runtime: &Runtime, app: &mut App, editor: &mut DefaultEditor) {
    let mut field = |prompt: &str| -> Option<String> {
        editor.readline(prompt).ok().map(|l| l.trim().to_string())
    };
    let Some(name) = field("name: ") else { return };
    let Some(email) = field("email: ") else { return };
    let Some(phone_number) = field("phone: ") else { return };
    let password = match rpassword::prompt_password("password: ") {
        Ok(password) => password,
        Err(e) => {
            println!("error: {e}");
            return;
        }
    };

    let profile = SignUpProfile {
        name,
        email,
        phone_number,
    };
    match runtime.block_on(app.session.sign_up(profile, &password)) {
        Ok(_) => {
            app.close_pages();
            render_route(app);
        }
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_whoami(app: &App) {
    match app.session.current().user() {
        Some(user) => {
            let marker = if user.is_admin() { " [admin]" } else { "" };
            println!("{} <{}> ({}){marker}", user.name, user.email, user.userid);
        }
        None => println!("signed out"),
    }
}

fn print_assistants(assistants: &[&Assistant], selected: Option<&str>) {
    if assistants.is_empty() {
        println!("no assistants found");
        return;
    }
    for (index, assistant) in assistants.iter().enumerate() {
        let marker = if selected == Some(assistant.assistant_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker}{:>3}. {}  [{} / {}]",
            index + 1,
            assistant.name,
            assistant.provider,
            assistant.model
        );
    }
}

fn cmd_assistants(runtime: &Runtime, app: &mut App) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if let Err(e) = runtime.block_on(pages.assistants.load()) {
        println!("error: {e}");
        return;
    }
    let selected = pages.console.selected().map(str::to_string);
    print_assistants(&pages.assistants.filtered(), selected.as_deref());
}

fn cmd_search(runtime: &Runtime, app: &mut App, query: &str) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if pages.assistants.assistants().is_empty() {
        if let Err(e) = runtime.block_on(pages.assistants.load()) {
            println!("error: {e}");
            return;
        }
    }
    pages.assistants.set_search(query);
    pages.console.set_search(query);
    pages.analysis.set_search(query);
    let selected = pages.console.selected().map(str::to_string);
    print_assistants(&pages.assistants.filtered(), selected.as_deref());
}

/// Resolves `<n>` (1-based index into the filtered list) or an id/name to an
/// assistant id.
fn resolve_selection(pages: &Pages, rest: &str) -> Option<String> {
    let filtered = pages.assistants.filtered();
    if let Ok(index) = rest.parse::<usize>() {
        return filtered
            .get(index.checked_sub(1)?)
            .map(|a| a.assistant_id.clone());
    }
    filtered
        .iter()
        .find(|a| a.assistant_id == rest || a.name.eq_ignore_ascii_case(rest))
        .map(|a| a.assistant_id.clone())
}

fn cmd_select(runtime: &Runtime, app: &mut App, rest: &str) {
    let user_id = match app.session.current().user() {
        Some(user) => user.userid.clone(),
        None => {
            println!("sign in first");
            return;
        }
    };
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if pages.assistants.assistants().is_empty() {
        if let Err(e) = runtime.block_on(pages.assistants.load()) {
            println!("error: {e}");
            return;
        }
    }
    let Some(assistant_id) = resolve_selection(pages, rest) else {
        println!("no assistant matches `{rest}`");
        return;
    };

    pages.assistants.select(&assistant_id);
    let result = runtime.block_on(async {
        pages.console.load_assistants(&user_id).await?;
        pages.console.select(&assistant_id).await?;
        pages.analysis.load_assistants(&user_id).await?;
        Ok::<_, voxboard_controllers::ControllerError>(())
    });
    match result {
        Ok(()) => {
            let name = pages
                .assistants
                .selected()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| assistant_id.clone());
            println!(
                "selected {name} — {} history entries in session {}",
                pages.console.history().len(),
                pages.console.session_id()
            );
        }
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_new_assistant(runtime: &Runtime, app: &mut App, editor: &mut DefaultEditor) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    pages.assistants.open_create_form();

    let mut field = |prompt: &str, current: &str| -> Option<String> {
        let line = editor.readline(prompt).ok()?;
        let line = line.trim();
        Some(if line.is_empty() {
            current.to_string()
        } else {
            line.to_string()
        })
    };

    let defaults = pages.assistants.draft().cloned().unwrap_or_default();
    let Some(name) = field("name: ", "") else { return };
    let Some(first_message) = field("first message: ", "") else {
        return;
    };
    let Some(system_prompt) = field("system prompt: ", "") else {
        return;
    };
    let Some(provider) = field(&format!("provider [{}]: ", defaults.provider), &defaults.provider)
    else {
        return;
    };
    let Some(model) = field(&format!("model [{}]: ", defaults.model), &defaults.model) else {
        return;
    };

    if let Some(draft) = pages.assistants.draft_mut() {
        draft.name = name;
        draft.first_message = first_message;
        draft.system_prompt = system_prompt;
        draft.provider = provider;
        draft.model = model;
    }

    match runtime.block_on(pages.assistants.submit()) {
        Ok(created) => println!("created `{}` ({})", created.name, created.assistant_id),
        Err(e) => {
            println!("error: {e}");
            pages.assistants.close_form();
        }
    }
}

fn cmd_history(runtime: &Runtime, app: &mut App) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if let Err(e) = runtime.block_on(pages.console.fetch_history()) {
        println!("error: {e}");
        return;
    }
    let history = pages.console.history();
    if history.is_empty() {
        println!("no chat history yet");
        return;
    }
    for entry in history {
        let stamp = entry.created_at.format("%H:%M:%S");
        if let Some(query) = &entry.user_query {
            println!("[{stamp}] you: {query}");
        }
        if let Some(response) = &entry.bot_response {
            println!("[{stamp}] bot: {response}");
        }
    }
}

fn cmd_chat(runtime: &Runtime, app: &mut App, text: &str) {
    if text.is_empty() {
        println!("usage: chat <text>");
        return;
    }
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    match runtime.block_on(pages.console.send_text(text)) {
        Ok(response) => println!("bot: {response}"),
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_record(runtime: &Runtime, app: &mut App, editor: &mut DefaultEditor) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if let Err(e) = pages.console.begin_recording() {
        println!("error: {e}");
        return;
    }

    let recorder = Recorder;
    let recording = match recorder.start() {
        Ok(recording) => recording,
        Err(e) => {
            pages.console.cancel_recording();
            println!("error: {e}");
            return;
        }
    };
    println!("recording — press Enter to stop");
    let _ = editor.readline("");

    let samples = recording.stop();
    let wav = match encode_wav(&samples) {
        Ok(wav) => wav,
        Err(e) => {
            pages.console.cancel_recording();
            println!("error: {e}");
            return;
        }
    };

    match runtime.block_on(pages.console.finish_recording(wav)) {
        Ok(turn) => {
            println!("you said: {}", turn.transcription);
            println!("bot: {}", turn.response);
            println!("speaking in: {}", pages.console.language());
        }
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_language(app: &mut App, code: &str) {
    if code.is_empty() {
        println!("usage: language <code>   (e.g. en, hi, es, fr, de)");
        return;
    }
    app.language = code.to_string();
    if let Some(pages) = app.open_pages() {
        pages.console.set_language(code);
    }
    println!("language set to {code}");
}

fn cmd_session(runtime: &Runtime, app: &mut App, session_id: &str) {
    if session_id.is_empty() {
        println!("usage: session <id>");
        return;
    }
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    match runtime.block_on(pages.console.set_session(session_id)) {
        Ok(()) => println!(
            "session {} — {} history entries",
            pages.console.session_id(),
            pages.console.history().len()
        ),
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_new_session(runtime: &Runtime, app: &mut App) {
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    if pages.console.selected().is_none() {
        println!("select an assistant first");
        return;
    }
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let result = runtime.block_on(pages.console.open_new_session(session_id.clone()));
    match result {
        Ok(()) => println!("opened session {session_id}"),
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_analysis(runtime: &Runtime, app: &mut App) {
    let user_id = match app.session.current().user() {
        Some(user) => user.userid.clone(),
        None => {
            println!("sign in first");
            return;
        }
    };
    let Some(pages) = app.open_pages() else {
        println!("sign in first");
        return;
    };
    let Some(assistant_id) = pages.console.selected().map(str::to_string) else {
        println!("select an assistant first");
        return;
    };

    let result = runtime.block_on(async {
        if pages.analysis.assistants().is_empty() {
            pages.analysis.load_assistants(&user_id).await?;
        }
        pages.analysis.select(&assistant_id).await
    });
    if let Err(e) = result {
        println!("error: {e}");
        if let Some(message) = pages.analysis.error() {
            println!("! {message}");
        }
        return;
    }

    let rows = pages.analysis.rows();
    if rows.is_empty() {
        println!("no session data available for this assistant");
        return;
    }
    println!(
        "{:<34} {:<20} {:<14} {}",
        "session", "last activity", "sentiment", "messages"
    );
    for row in rows {
        let stamp = row.last_activity.format("%Y-%m-%d %H:%M").to_string();
        match &row.outcome {
            Ok(sentiment) => println!(
                "{:<34} {:<20} {:<14} {}",
                row.key.session_id,
                stamp,
                sentiment.label().label(),
                sentiment.message_count
            ),
            Err(message) => {
                println!("{:<34} {:<20} failed: {message}", row.key.session_id, stamp)
            }
        }
    }
}
