use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// Non-success response; carries the `detail`/`message` the backend put
    /// in the error body.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Extracts the backend's error message from a response body.
///
/// The backend answers with `{"detail": …}` on handled failures and
/// `{"message": …}` on a few legacy paths; anything else falls back to a
/// status line.
pub(crate) fn backend_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    format!("server error: {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_prefers_detail() {
        assert_eq!(
            backend_message(500, r#"{"detail":"Error creating assistant: boom"}"#),
            "Error creating assistant: boom"
        );
        assert_eq!(
            backend_message(404, r#"{"message":"not found"}"#),
            "not found"
        );
    }

    #[test]
    fn backend_message_falls_back_to_status() {
        assert_eq!(backend_message(502, "<html>bad gateway</html>"), "server error: 502");
    }
}
