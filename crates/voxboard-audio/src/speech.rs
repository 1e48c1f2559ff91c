//! Speech synthesis via the system TTS engine, and locale-based language
//! detection.

use crate::error::AudioError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for synthesis (64 KiB).
const MAX_SPEECH_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for the synthesis process.
const SPEECH_TIMEOUT: Duration = Duration::from_secs(60);

/// Fallback language when the locale gives nothing usable.
const DEFAULT_LANGUAGE: &str = "en";

/// Reads assistant replies aloud through `espeak-ng` (or a compatible
/// binary), voiced by a two-letter language code.
#[derive(Debug, Clone)]
pub struct Speaker {
    binary: PathBuf,
}

impl Default for Speaker {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("espeak-ng"),
        }
    }
}

impl Speaker {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Speaks the text in the given language. Blocks (asynchronously) until
    /// playback finishes or the timeout fires.
    pub async fn speak(&self, text: &str, language: &str) -> Result<(), AudioError> {
        if text.len() > MAX_SPEECH_INPUT_BYTES {
            return Err(AudioError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_SPEECH_INPUT_BYTES
            )));
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("-v")
            .arg(language)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| AudioError::Synthesis(format!("failed to spawn {:?}: {e}", self.binary)))?;

        let output = tokio::time::timeout(SPEECH_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                AudioError::Synthesis(format!(
                    "synthesis timed out after {} seconds",
                    SPEECH_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| AudioError::Synthesis(format!("failed to wait for synthesis: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Synthesis(format!(
                "synthesis failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Two-letter language code from a POSIX locale string
/// (`en_US.UTF-8` → `en`). Returns `None` for empty or `C`/`POSIX` locales.
pub fn language_from_locale(locale: &str) -> Option<String> {
    let tag = locale
        .split(['_', '.', '@'])
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())?;
    if tag.eq_ignore_ascii_case("c") || tag.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(tag.to_lowercase())
}

/// Detects the user's language from the environment, defaulting to English —
/// the console equivalent of the browser-language probe.
pub fn detect_language() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| language_from_locale(&value))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
