//! Route guard and page controllers for the voxboard dashboard.
//!
//! Each page of the original dashboard — assistants, voice-test console,
//! session analysis — repeated the same pattern: read the session, fetch a
//! list of assistants scoped to the user, hold a selection, run dependent
//! fetches, surface failures as a user-facing string. The controllers here
//! implement that pattern once each, with the structured-concurrency
//! redesign applied: every fetch is scoped to the controller's lifetime via
//! a cancellation token instead of being fired and forgotten.

pub mod analysis;
pub mod assistants;
pub mod console;
pub mod guard;

pub use analysis::{AnalysisController, SessionRow};
pub use assistants::AssistantsController;
pub use console::{ConsoleController, RecorderPhase};
pub use guard::{GuardDecision, RouteGuard, HOME_ROUTE};

use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use voxboard_types::Assistant;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Api(#[from] voxboard_api::ApiError),

    #[error(transparent)]
    Store(#[from] voxboard_store::StoreError),

    #[error(transparent)]
    Draft(#[from] voxboard_types::DraftError),

    #[error("no assistant selected")]
    NoAssistantSelected,

    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    /// The controller's scope was cancelled while the call was in flight.
    #[error("controller closed")]
    Closed,
}

/// Runs a fetch inside the controller's lifetime scope. Cancelling the
/// scope resolves to [`ControllerError::Closed`] and drops the in-flight
/// request instead of letting it complete against a closed page.
pub(crate) async fn scoped<F, T>(scope: &CancellationToken, fut: F) -> Result<T, ControllerError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = scope.cancelled() => Err(ControllerError::Closed),
        value = fut => Ok(value),
    }
}

/// Case-insensitive name filter over the in-memory assistant list.
///
/// O(n) per call with no memoization — assistant lists are expected to be
/// small. Empty queries return the full list.
pub fn filter_by_name<'a>(assistants: &'a [Assistant], query: &str) -> Vec<&'a Assistant> {
    let needle = query.to_lowercase();
    assistants
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(name: &str) -> Assistant {
        Assistant {
            assistant_id: format!("id-{name}"),
            user_id: None,
            name: name.to_string(),
            provider: "groq".into(),
            model: "llama-3.1-8b-instant".into(),
            voice_provider: "deepgram".into(),
            voice_model: "asteria".into(),
            first_message: String::new(),
            system_prompt: String::new(),
            file_urls: Vec::new(),
        }
    }

    #[test]
    fn filter_is_case_insensitive_containment() {
        let list = vec![assistant("Riley"), assistant("Support Bot"), assistant("riley-2")];
        let hits = filter_by_name(&list, "RILEY");
        let names: Vec<&str> = hits.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Riley", "riley-2"]);
    }

    #[test]
    fn empty_query_returns_the_full_list() {
        let list = vec![assistant("Riley"), assistant("Support Bot")];
        assert_eq!(filter_by_name(&list, "").len(), list.len());
    }

    #[test]
    fn filter_is_idempotent() {
        let list = vec![assistant("Riley"), assistant("Support Bot"), assistant("riley-2")];
        let once: Vec<String> = filter_by_name(&list, "ri")
            .iter()
            .map(|a| a.name.clone())
            .collect();
        let filtered: Vec<Assistant> = filter_by_name(&list, "ri").into_iter().cloned().collect();
        let twice: Vec<String> = filter_by_name(&filtered, "ri")
            .iter()
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn no_match_is_empty() {
        let list = vec![assistant("Riley")];
        assert!(filter_by_name(&list, "zzz").is_empty());
    }

    #[tokio::test]
    async fn scoped_resolves_closed_on_cancellation() {
        let scope = CancellationToken::new();
        scope.cancel();
        let result = scoped(&scope, async { 42 }).await;
        assert!(matches!(result, Err(ControllerError::Closed)));
    }
}
