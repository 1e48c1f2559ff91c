//! HTTP client for the backend API — the external service that owns
//! assistant CRUD, file ingestion, chat/voice turn processing, chat history,
//! and sentiment aggregation.
//!
//! All calls are fire-once: a failure is mapped to [`ApiError`] and handed
//! back to the caller; there is no retry budget or backoff. List-valued
//! responses with an unexpected shape are logged and treated as empty so the
//! dashboard renders an empty state instead of failing.

pub mod error;

pub use error::ApiError;

use error::backend_message;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voxboard_types::{Assistant, AssistantDraft, ChatHistoryEntry, SessionKey, SessionSentiment};

/// Default timeout for control-plane requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Voice turns run speech recognition, retrieval, generation and storage
/// server-side; give them a much longer budget than list fetches.
const VOICE_TURN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct AssistantsEnvelope {
    #[serde(default)]
    assistants: Option<Vec<Assistant>>,
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    history: Option<Vec<ChatHistoryEntry>>,
}

#[derive(Debug, Deserialize)]
struct SessionsEnvelope {
    #[serde(default)]
    sessions: Option<Vec<String>>,
}

/// Response of a processed voice turn.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceTurn {
    /// The assistant's reply, to be handed to speech synthesis.
    pub response: String,
    /// What the backend heard in the uploaded audio.
    pub transcription: String,
    /// Language the backend detected; overrides the declared one for
    /// subsequent turns when present.
    #[serde(default)]
    pub language: Option<String>,
}

/// Response of a text chat turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub response: String,
}

#[derive(Debug, Serialize)]
struct ChatInput<'a> {
    assistant_id: &'a str,
    session_id: &'a str,
    user_query: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionCreate<'a> {
    assistant_id: &'a str,
    session_id: &'a str,
}

/// Client for the backend API at a configurable base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Builds a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` for an empty URL and `ApiError::Transport`
    /// when the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ApiError::Config(
                "backend base URL is empty — set api.base_url in config.toml".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `GET /assistants/{user_id}` — all assistants owned by the user.
    pub async fn assistants_for_user(&self, user_id: &str) -> Result<Vec<Assistant>, ApiError> {
        let envelope: AssistantsEnvelope = self
            .get_json(&format!("assistants/{user_id}"))
            .await?;
        Ok(envelope.assistants.unwrap_or_else(|| {
            tracing::warn!(user_id, "assistants response missing `assistants` array");
            Vec::new()
        }))
    }

    /// `POST /assistants/create` — multipart create with optional knowledge
    /// files. The draft must already be validated.
    pub async fn create_assistant(
        &self,
        user_id: &str,
        draft: &AssistantDraft,
    ) -> Result<Assistant, ApiError> {
        let mut form = Form::new()
            .text("user_id", user_id.to_string())
            .text("name", draft.name.clone())
            .text("first_message", draft.first_message.clone())
            .text("system_prompt", draft.system_prompt.clone())
            .text("provider", draft.provider.clone())
            .text("model", draft.model.clone())
            .text("voice_provider", draft.voice_provider.clone())
            .text("voice_model", draft.voice_model.clone());

        for file in &draft.files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| ApiError::Config(format!("bad attachment content type: {e}")))?;
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(self.url("assistants/create"))
            .multipart(form)
            .send()
            .await?;
        self.parse(response).await
    }

    /// `GET /history/{assistant_id}/{session_id}` — stored turns, oldest
    /// first.
    pub async fn history(&self, key: &SessionKey) -> Result<Vec<ChatHistoryEntry>, ApiError> {
        let envelope: HistoryEnvelope = self
            .get_json(&format!(
                "history/{}/{}",
                key.assistant_id, key.session_id
            ))
            .await?;
        Ok(envelope.history.unwrap_or_else(|| {
            tracing::warn!(%key, "history response missing `history` array");
            Vec::new()
        }))
    }

    /// `POST /voice-chat/{assistant_id}/{session_id}` — uploads one recorded
    /// utterance and returns the processed turn.
    pub async fn voice_chat(
        &self,
        key: &SessionKey,
        audio: Vec<u8>,
        file_name: &str,
        language: &str,
    ) -> Result<VoiceTurn, ApiError> {
        let part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/wav")
            .map_err(|e| ApiError::Config(format!("bad audio content type: {e}")))?;
        let form = Form::new()
            .part("audio_file", part)
            .text("language", language.to_string());

        let response = self
            .http
            .post(self.url(&format!(
                "voice-chat/{}/{}",
                key.assistant_id, key.session_id
            )))
            .timeout(VOICE_TURN_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        self.parse(response).await
    }

    /// `GET /sentiment/{assistant_id}/{session_id}` — server-side sentiment
    /// aggregation for one session.
    pub async fn sentiment(&self, key: &SessionKey) -> Result<SessionSentiment, ApiError> {
        self.get_json(&format!(
            "sentiment/{}/{}",
            key.assistant_id, key.session_id
        ))
        .await
    }

    /// `GET /sessions/{assistant_id}` — distinct session ids with stored
    /// history.
    pub async fn sessions_for_assistant(
        &self,
        assistant_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        let envelope: SessionsEnvelope = self
            .get_json(&format!("sessions/{assistant_id}"))
            .await?;
        Ok(envelope.sessions.unwrap_or_else(|| {
            tracing::warn!(assistant_id, "sessions response missing `sessions` array");
            Vec::new()
        }))
    }

    /// `POST /sessions/create` — opens a new session by writing its marker
    /// row.
    pub async fn create_session(&self, key: &SessionKey) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("sessions/create"))
            .json(&SessionCreate {
                assistant_id: &key.assistant_id,
                session_id: &key.session_id,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: backend_message(status.as_u16(), &body),
            });
        }
        Ok(())
    }

    /// `POST /chat/{assistant_id}/{session_id}` — one text turn.
    pub async fn chat(&self, key: &SessionKey, user_query: &str) -> Result<ChatTurn, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("chat/{}/{}", key.assistant_id, key.session_id)))
            .timeout(VOICE_TURN_TIMEOUT)
            .json(&ChatInput {
                assistant_id: &key.assistant_id,
                session_id: &key.session_id,
                user_query,
            })
            .send()
            .await?;
        self.parse(response).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.http.get(self.url(path)).send().await?;
        self.parse(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: backend_message(status.as_u16(), &body),
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Shape(format!("backend response did not parse: {e}")))
    }
}
