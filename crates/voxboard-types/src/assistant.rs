//! Assistant configuration records and the create-form draft.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configured voice/LLM agent owned by a user, managed by the backend API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    pub assistant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub provider: String,
    pub model: String,
    pub voice_provider: String,
    pub voice_model: String,
    pub first_message: String,
    pub system_prompt: String,
    /// Public URLs of the knowledge files ingested at creation time.
    #[serde(default)]
    pub file_urls: Vec<String>,
}

/// A file attached to an assistant draft, held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Validation failures raised at draft submit time.
///
/// Nothing prevents an empty draft from existing; validation only runs when
/// the form is submitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("please fill all required fields: {0} is empty")]
    MissingField(&'static str),
}

/// The create/update form payload for an assistant.
///
/// Carries the provider/model defaults the dashboard pre-selects for a new
/// assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantDraft {
    pub name: String,
    pub first_message: String,
    pub system_prompt: String,
    pub provider: String,
    pub model: String,
    pub voice_provider: String,
    pub voice_model: String,
    pub files: Vec<FileAttachment>,
}

impl Default for AssistantDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            first_message: String::new(),
            system_prompt: String::new(),
            provider: "groq".to_string(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            voice_provider: "deepgram".to_string(),
            voice_model: "asteria".to_string(),
            files: Vec::new(),
        }
    }
}

impl AssistantDraft {
    /// Pre-fills the form from an existing assistant, as the dashboard does
    /// when a list entry is clicked. Attached files are not carried over.
    pub fn from_assistant(assistant: &Assistant) -> Self {
        Self {
            name: assistant.name.clone(),
            first_message: assistant.first_message.clone(),
            system_prompt: assistant.system_prompt.clone(),
            provider: assistant.provider.clone(),
            model: assistant.model.clone(),
            voice_provider: assistant.voice_provider.clone(),
            voice_model: assistant.voice_model.clone(),
            files: Vec::new(),
        }
    }

    /// Submit-time validation: name, first message and system prompt are
    /// required; everything else has a pre-selected default.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingField("name"));
        }
        if self.first_message.trim().is_empty() {
            return Err(DraftError::MissingField("first_message"));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(DraftError::MissingField("system_prompt"));
        }
        Ok(())
    }
}
