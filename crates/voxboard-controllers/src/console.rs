//! The voice-test console: recording state machine, voice/text turns, chat
//! history.

use crate::{filter_by_name, scoped, ControllerError};
use tokio_util::sync::CancellationToken;
use voxboard_api::{BackendClient, VoiceTurn};
use voxboard_audio::Speaker;
use voxboard_types::{Assistant, ChatHistoryEntry, SessionKey};

/// Upload name for a packaged recording.
const RECORDING_FILE_NAME: &str = "recording.wav";

/// Default chat session the console tests against.
const DEFAULT_SESSION_ID: &str = "1";

/// The two-state recording toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderPhase {
    #[default]
    Idle,
    Recording,
}

/// Controller behind the voice-test console.
///
/// Device I/O stays with the caller (the capture stream handle is not
/// `Send`); the controller owns the turn orchestration: upload, state
/// updates, the strictly-sequenced history re-fetch, and handing the reply
/// to speech synthesis.
pub struct ConsoleController {
    api: BackendClient,
    scope: CancellationToken,
    speaker: Option<Speaker>,
    assistants: Vec<Assistant>,
    search_query: String,
    selected: Option<String>,
    session_id: String,
    language: String,
    history: Vec<ChatHistoryEntry>,
    transcription: Option<String>,
    response: Option<String>,
    recorder_phase: RecorderPhase,
    error: Option<String>,
}

impl ConsoleController {
    pub fn new(api: BackendClient, language: impl Into<String>, scope: CancellationToken) -> Self {
        Self {
            api,
            scope,
            speaker: None,
            assistants: Vec::new(),
            search_query: String::new(),
            selected: None,
            session_id: DEFAULT_SESSION_ID.to_string(),
            language: language.into(),
            history: Vec::new(),
            transcription: None,
            response: None,
            recorder_phase: RecorderPhase::Idle,
            error: None,
        }
    }

    /// Attaches a speech synthesizer; replies are read aloud after each
    /// voice turn.
    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speaker = Some(speaker);
        self
    }

    /// Fetches the user's assistants from the backend API.
    pub async fn load_assistants(&mut self, user_id: &str) -> Result<(), ControllerError> {
        match scoped(&self.scope, self.api.assistants_for_user(user_id)).await? {
            Ok(assistants) => {
                self.assistants = assistants;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(user_id, "assistant fetch failed: {e}");
                self.assistants = Vec::new();
                Ok(())
            }
        }
    }

    pub fn assistants(&self) -> &[Assistant] {
        &self.assistants
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn filtered(&self) -> Vec<&Assistant> {
        filter_by_name(&self.assistants, &self.search_query)
    }

    /// Selects an assistant and loads its history for the current session.
    pub async fn select(&mut self, assistant_id: &str) -> Result<(), ControllerError> {
        if !self.assistants.iter().any(|a| a.assistant_id == assistant_id) {
            return Err(ControllerError::NoAssistantSelected);
        }
        self.selected = Some(assistant_id.to_string());
        self.fetch_history().await
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Switches the chat session and reloads history when an assistant is
    /// selected.
    pub async fn set_session(&mut self, session_id: impl Into<String>) -> Result<(), ControllerError> {
        self.session_id = session_id.into();
        if self.selected.is_some() {
            self.fetch_history().await?;
        }
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn history(&self) -> &[ChatHistoryEntry] {
        &self.history
    }

    pub fn transcription(&self) -> Option<&str> {
        self.transcription.as_deref()
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn recorder_phase(&self) -> RecorderPhase {
        self.recorder_phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn key(&self) -> Result<SessionKey, ControllerError> {
        let assistant_id = self
            .selected
            .as_deref()
            .ok_or(ControllerError::NoAssistantSelected)?;
        Ok(SessionKey::new(assistant_id, self.session_id.clone()))
    }

    /// `Idle → Recording`. Requires a selected assistant; clears the
    /// previous turn's transcript and reply.
    pub fn begin_recording(&mut self) -> Result<(), ControllerError> {
        self.key()?;
        if self.recorder_phase == RecorderPhase::Recording {
            return Err(ControllerError::AlreadyRecording);
        }
        self.transcription = None;
        self.response = None;
        self.error = None;
        self.recorder_phase = RecorderPhase::Recording;
        Ok(())
    }

    /// `Recording → Idle` with the captured audio: uploads the turn, applies
    /// the server's language override, re-fetches history strictly after the
    /// upload response, and reads the reply aloud.
    pub async fn finish_recording(&mut self, wav: Vec<u8>) -> Result<VoiceTurn, ControllerError> {
        if self.recorder_phase != RecorderPhase::Recording {
            return Err(ControllerError::NotRecording);
        }
        self.recorder_phase = RecorderPhase::Idle;

        let key = self.key()?;
        let turn = match scoped(
            &self.scope,
            self.api
                .voice_chat(&key, wav, RECORDING_FILE_NAME, &self.language),
        )
        .await?
        {
            Ok(turn) => turn,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };

        self.transcription = Some(turn.transcription.clone());
        self.response = Some(turn.response.clone());
        if let Some(language) = &turn.language {
            self.language = language.clone();
        }

        // Sequenced after the upload response so the new turn is included.
        self.fetch_history().await?;
        self.speak(&turn.response).await;
        Ok(turn)
    }

    /// Discards an in-progress recording without uploading anything.
    pub fn cancel_recording(&mut self) {
        self.recorder_phase = RecorderPhase::Idle;
    }

    /// Opens a fresh chat session for the selected assistant: writes the
    /// session marker through the backend, then switches to it.
    pub async fn open_new_session(
        &mut self,
        session_id: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let session_id = session_id.into();
        let assistant_id = self
            .selected
            .as_deref()
            .ok_or(ControllerError::NoAssistantSelected)?;
        let key = SessionKey::new(assistant_id, session_id.clone());
        match scoped(&self.scope, self.api.create_session(&key)).await? {
            Ok(()) => self.set_session(session_id).await,
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// One text turn against the selected assistant, followed by the same
    /// history re-fetch as a voice turn.
    pub async fn send_text(&mut self, user_query: &str) -> Result<String, ControllerError> {
        let key = self.key()?;
        let turn = match scoped(&self.scope, self.api.chat(&key, user_query)).await? {
            Ok(turn) => turn,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };
        self.response = Some(turn.response.clone());
        self.fetch_history().await?;
        Ok(turn.response)
    }

    /// Reloads history for the selected assistant + session. Failures are
    /// logged and leave the current history in place.
    pub async fn fetch_history(&mut self) -> Result<(), ControllerError> {
        let key = self.key()?;
        match scoped(&self.scope, self.api.history(&key)).await? {
            Ok(history) => {
                self.history = history;
            }
            Err(e) => {
                tracing::warn!(%key, "history fetch failed: {e}");
            }
        }
        Ok(())
    }

    async fn speak(&mut self, text: &str) {
        let Some(speaker) = &self.speaker else {
            return;
        };
        if let Err(e) = speaker.speak(text, &self.language).await {
            // Synthesis failure blocks nothing; the reply text is already
            // displayed.
            tracing::warn!("speech synthesis failed: {e}");
            self.error = Some(e.to_string());
        }
    }
}
