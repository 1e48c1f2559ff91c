//! The session-sentiment analysis view.
//!
//! Recent sessions come from the remote store's `chat_history` relation;
//! sentiment comes from the backend API, one request per session. The
//! fan-out reports per-item results: a failed sentiment fetch marks its own
//! row and leaves the others rendering their data.

use crate::{filter_by_name, scoped, ControllerError};
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use voxboard_api::BackendClient;
use voxboard_store::StoreClient;
use voxboard_types::{Assistant, SessionKey, SessionSentiment, SessionStamp};

/// How many recent sessions the view inspects.
const RECENT_SESSION_LIMIT: u32 = 10;

/// One row of the analysis table: the backend-supplied composite key, the
/// session's latest activity, and the per-session fetch outcome.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub key: SessionKey,
    pub last_activity: DateTime<Utc>,
    pub outcome: Result<SessionSentiment, String>,
}

/// Controller behind the analysis page.
pub struct AnalysisController {
    api: BackendClient,
    store: StoreClient,
    access_token: Option<String>,
    scope: CancellationToken,
    assistants: Vec<Assistant>,
    search_query: String,
    selected: Option<String>,
    rows: Vec<SessionRow>,
    error: Option<String>,
}

impl AnalysisController {
    pub fn new(
        api: BackendClient,
        store: StoreClient,
        access_token: Option<String>,
        scope: CancellationToken,
    ) -> Self {
        Self {
            api,
            store,
            access_token,
            scope,
            assistants: Vec::new(),
            search_query: String::new(),
            selected: None,
            rows: Vec::new(),
            error: None,
        }
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

    pub fn rows(&self) -> &[SessionRow] {
        &self.rows
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Selects an assistant and loads its session table.
    pub async fn select(&mut self, assistant_id: &str) -> Result<(), ControllerError> {
        if !self.assistants.iter().any(|a| a.assistant_id == assistant_id) {
            return Err(ControllerError::NoAssistantSelected);
        }
        self.selected = Some(assistant_id.to_string());
        self.fetch_sessions().await
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Loads the most recent sessions and fans out one sentiment fetch per
    /// session, reporting per-item results.
    pub async fn fetch_sessions(&mut self) -> Result<(), ControllerError> {
        let assistant_id = self
            .selected
            .clone()
            .ok_or(ControllerError::NoAssistantSelected)?;
        self.error = None;

        let stamps = match scoped(&self.scope, self.recent_sessions(&assistant_id)).await? {
            Ok(stamps) => stamps,
            Err(e) => {
                tracing::warn!(assistant_id, "session query failed: {e}");
                self.error = Some("failed to load session data".to_string());
                self.rows = Vec::new();
                return Err(e.into());
            }
        };

        if stamps.is_empty() {
            self.rows = Vec::new();
            return Ok(());
        }

        let rows = scoped(&self.scope, fan_out(&self.api, &assistant_id, stamps)).await?;
        self.rows = rows;
        Ok(())
    }

    /// Latest rows from `chat_history`, newest first, deduplicated to one
    /// row per session.
    async fn recent_sessions(
        &self,
        assistant_id: &str,
    ) -> Result<Vec<SessionStamp>, voxboard_store::StoreError> {
        let mut query = self
            .store
            .table("chat_history")
            .select("session_id,created_at")
            .eq("assistant_id", assistant_id)
            .order_descending("created_at")
            .limit(RECENT_SESSION_LIMIT);
        if let Some(token) = &self.access_token {
            query = query.bearer(token);
        }
        let stamps: Vec<SessionStamp> = query.fetch().await?;

        let mut seen = std::collections::HashSet::new();
        Ok(stamps
            .into_iter()
            .filter(|stamp| seen.insert(stamp.session_id.clone()))
            .collect())
    }
}

/// One sentiment request per session, joined per-item: each row carries its
/// own outcome and display order follows the session list.
async fn fan_out(
    api: &BackendClient,
    assistant_id: &str,
    stamps: Vec<SessionStamp>,
) -> Vec<SessionRow> {
    let mut tasks = JoinSet::new();
    for (index, stamp) in stamps.iter().enumerate() {
        let api = api.clone();
        let key = SessionKey::new(assistant_id, stamp.session_id.clone());
        tasks.spawn(async move {
            let outcome = api.sentiment(&key).await.map_err(|e| e.to_string());
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<Result<SessionSentiment, String>>> =
        (0..stamps.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => tracing::warn!("sentiment task failed to join: {e}"),
        }
    }

    stamps
        .into_iter()
        .zip(outcomes)
        .map(|(stamp, outcome)| SessionRow {
            key: SessionKey::new(assistant_id, stamp.session_id),
            last_activity: stamp.created_at,
            outcome: outcome.unwrap_or_else(|| Err("sentiment fetch did not complete".to_string())),
        })
        .collect()
}
