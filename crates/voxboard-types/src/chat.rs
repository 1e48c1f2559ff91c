//! Chat history and session-sentiment records.
//!
//! A chat session groups a sequence of chat/voice turns for history and
//! sentiment purposes; it is distinct from the authentication session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One stored turn of a conversation, scoped to `(assistant_id, session_id)`.
///
/// Either side of the exchange may be absent (e.g. the synthetic
/// "session created" row the backend writes has both).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub user_query: Option<String>,
    #[serde(default)]
    pub bot_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The backend-supplied composite identity of a chat session.
///
/// List rendering keys off this pair; no client-side synthetic key is
/// derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub assistant_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(assistant_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.assistant_id, self.session_id)
    }
}

/// A session row from the recent-session query: the session id and its most
/// recent activity timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStamp {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side sentiment aggregation for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSentiment {
    pub session_id: String,
    /// Raw server label, possibly decorated (e.g. `"Bad (Reason: …)"`).
    pub sentiment: String,
    #[serde(default)]
    pub message_count: u32,
}

impl SessionSentiment {
    /// The closed label parsed out of the raw sentiment string.
    pub fn label(&self) -> SentimentLabel {
        SentimentLabel::parse(&self.sentiment)
    }
}

/// The closed label set the sentiment service chooses from.
///
/// The service may append a reason suffix to negative labels; parsing is a
/// case-insensitive containment check in service priority order, defaulting
/// to `Moderate` — the same extraction the service itself applies to its
/// model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    /// Positive / happy / satisfied.
    Good,
    /// Neutral / indifferent.
    #[default]
    Moderate,
    /// Mildly unhappy.
    Disappointed,
    /// Angry / frustrated.
    Bad,
}

impl SentimentLabel {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        for (needle, label) in [
            ("good", Self::Good),
            ("disappointed", Self::Disappointed),
            ("bad", Self::Bad),
        ] {
            if lowered.contains(needle) {
                return label;
            }
        }
        Self::Moderate
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Disappointed => "Disappointed",
            Self::Bad => "Bad",
        }
    }
}
