use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// Auth rejection from the store (bad credentials, duplicate sign-up,
    /// unconfirmed account). Carries the message parsed from the error body.
    #[error("auth error: {0}")]
    Auth(String),

    /// Single-row query matched no row.
    #[error("no row found in `{table}`")]
    RowNotFound { table: String },

    /// Non-success response outside the auth taxonomy.
    #[error("store request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Extracts a human-readable message from a store error body.
///
/// The auth service answers with `error_description`, the REST layer with
/// `message`, and some older paths with `msg`; fall back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "message", "msg", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}
