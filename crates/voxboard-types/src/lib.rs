//! Shared types and constants for the voxboard client.
//!
//! This crate provides the foundational types used across all voxboard
//! crates: the user profile and auth session mirrored from the remote
//! session store, assistant configuration records, and the chat/sentiment
//! records read from the backend API.
//!
//! No crate in the workspace depends on anything *except* `voxboard-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

pub mod assistant;
pub mod chat;

pub use assistant::{Assistant, AssistantDraft, DraftError, FileAttachment};
pub use chat::{ChatHistoryEntry, SentimentLabel, SessionKey, SessionSentiment, SessionStamp};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user profile row from the remote store's `user` relation.
///
/// The remote store is the source of truth; this is a transient,
/// non-authoritative copy held only for display and request scoping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The auth account id this profile belongs to.
    pub userid: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub fullname: Option<String>,
    /// Role marker as stored server-side (e.g. `"ADMIN"`).
    #[serde(rename = "userType", default)]
    pub user_type: Option<String>,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: Option<String>,
}

impl User {
    /// Returns true when the profile carries the admin role marker.
    pub fn is_admin(&self) -> bool {
        self.user_type.as_deref() == Some("ADMIN")
    }
}

/// The auth-service account embedded in a token grant response.
///
/// Distinct from [`User`]: this is the auth account, the profile row is
/// fetched separately from the `user` relation by [`AuthUser::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authentication session issued by the remote store.
///
/// Held only by the session manager; invalidated on sign-out or expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires.
    #[serde(default)]
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// Returns true when the access token has expired as of `now_epoch_secs`.
    pub fn is_expired(&self, now_epoch_secs: i64) -> bool {
        self.expires_at != 0 && self.expires_at <= now_epoch_secs
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}
