//! The assistants dashboard: list, search, select, create.

use crate::{filter_by_name, scoped, ControllerError};
use tokio_util::sync::CancellationToken;
use voxboard_api::BackendClient;
use voxboard_types::{Assistant, AssistantDraft};

/// Controller behind the assistants page.
///
/// The backend API is the single source of truth for the list; after a
/// successful create the full list is re-fetched rather than patched
/// locally, so the UI shows the stale list until the round trip completes.
pub struct AssistantsController {
    api: BackendClient,
    user_id: String,
    scope: CancellationToken,
    assistants: Vec<Assistant>,
    search_query: String,
    selected: Option<String>,
    /// The create/edit form; `Some` while the form is open.
    draft: Option<AssistantDraft>,
    error: Option<String>,
}

impl AssistantsController {
    pub fn new(api: BackendClient, user_id: impl Into<String>, scope: CancellationToken) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            scope,
            assistants: Vec::new(),
            search_query: String::new(),
            selected: None,
            draft: None,
            error: None,
        }
    }

    /// Fetches the user's assistants. A failed fetch leaves an empty list
    /// and logs — the page renders its empty state, matching the original
    /// behavior of not distinguishing "no data" from "fetch failed".
    pub async fn load(&mut self) -> Result<(), ControllerError> {
        match scoped(&self.scope, self.api.assistants_for_user(&self.user_id)).await? {
            Ok(assistants) => {
                self.assistants = assistants;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, "assistant fetch failed: {e}");
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

    /// The list as filtered by the current search query.
    pub fn filtered(&self) -> Vec<&Assistant> {
        filter_by_name(&self.assistants, &self.search_query)
    }

    /// Opens the form pre-filled from an existing assistant.
    pub fn select(&mut self, assistant_id: &str) -> Option<&Assistant> {
        let assistant = self
            .assistants
            .iter()
            .find(|a| a.assistant_id == assistant_id)?;
        self.selected = Some(assistant.assistant_id.clone());
        self.draft = Some(AssistantDraft::from_assistant(assistant));
        self.error = None;
        Some(assistant)
    }

    pub fn selected(&self) -> Option<&Assistant> {
        let id = self.selected.as_deref()?;
        self.assistants.iter().find(|a| a.assistant_id == id)
    }

    /// Opens an empty form with the dashboard defaults.
    pub fn open_create_form(&mut self) {
        self.draft = Some(AssistantDraft::default());
        self.selected = None;
        self.error = None;
    }

    pub fn close_form(&mut self) {
        self.draft = None;
        self.error = None;
    }

    pub fn draft(&self) -> Option<&AssistantDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut AssistantDraft> {
        self.draft.as_mut()
    }

    pub fn form_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Submits the open form: validates, posts the multipart create, then
    /// re-fetches the list. The form closes only after the refreshed list —
    /// which includes the new assistant — has landed.
    pub async fn submit(&mut self) -> Result<Assistant, ControllerError> {
        let Some(draft) = self.draft.clone() else {
            return Err(ControllerError::NoAssistantSelected);
        };
        if let Err(e) = draft.validate() {
            self.error = Some(e.to_string());
            return Err(e.into());
        }
        self.error = None;

        let created =
            match scoped(&self.scope, self.api.create_assistant(&self.user_id, &draft)).await? {
                Ok(created) => created,
                Err(e) => {
                    self.error = Some(e.to_string());
                    return Err(e.into());
                }
            };

        self.load().await?;
        self.selected = Some(created.assistant_id.clone());
        self.draft = None;
        Ok(created)
    }
}
