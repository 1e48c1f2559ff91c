//! Console configuration loading from file and environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use voxboard_store::StoreConfig;

/// Top-level console configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Remote session store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audio settings.
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Backend API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend API.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxboard_console=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Audio configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Speech synthesis binary used to read replies aloud.
    #[serde(default = "default_tts_binary")]
    pub tts_binary: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tts_binary() -> String {
    "espeak-ng".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tts_binary: default_tts_binary(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXBOARD_API_URL` overrides `api.base_url`
/// - `VOXBOARD_STORE_URL` overrides `store.url`
/// - `VOXBOARD_STORE_KEY` overrides `store.anon_key`
/// - `VOXBOARD_LOG_LEVEL` overrides `logging.level`
/// - `VOXBOARD_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `VOXBOARD_TTS_BINARY` overrides `audio.tts_binary`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(url) = std::env::var("VOXBOARD_API_URL") {
        config.api.base_url = url;
    }
    if let Ok(url) = std::env::var("VOXBOARD_STORE_URL") {
        config.store.url = url;
    }
    if let Ok(key) = std::env::var("VOXBOARD_STORE_KEY") {
        config.store.anon_key = key;
    }
    if let Ok(level) = std::env::var("VOXBOARD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("VOXBOARD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(binary) = std::env::var("VOXBOARD_TTS_BINARY") {
        config.audio.tts_binary = binary;
    }

    Ok(config)
}

/// Resolve the application data directory.
///
/// Uses `dirs::data_dir()` to locate the platform-specific directory:
/// - Windows: `%APPDATA%\Voxboard`
/// - macOS: `~/Library/Application Support/Voxboard`
/// - Linux: `~/.local/share/Voxboard`
pub fn resolve_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Voxboard")
}

/// Writes a default `config.toml` into the data directory if one does not
/// already exist. Returns the path to the config file.
pub fn ensure_config(data_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let config_path = data_dir.join("config.toml");
    if !config_path.exists() {
        let contents = r#"# voxboard console configuration (auto-generated).

[api]
base_url = "http://localhost:8000"

[store]
# Remote session store endpoint and public key.
url = ""
anon_key = ""

[logging]
level = "info"
json = false

[audio]
tts_binary = "espeak-ng"
"#;
        std::fs::write(&config_path, contents)?;
    }
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.store.url.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.audio.tts_binary, "espeak-ng");
    }

    #[test]
    fn file_values_override_defaults() {
        let contents = r#"
            [api]
            base_url = "https://api.voxboard.example"

            [store]
            url = "https://store.voxboard.example"
            anon_key = "public-anon"

            [logging]
            level = "debug"
            json = true
        "#;
        let config: Config = toml::from_str(contents).expect("config should parse");
        assert_eq!(config.api.base_url, "https://api.voxboard.example");
        assert_eq!(config.store.anon_key, "public-anon");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        // Unset sections still default.
        assert_eq!(config.audio.tts_binary, "espeak-ng");
    }

    #[test]
    fn ensure_config_creates_file_with_all_sections() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config_path = ensure_config(dir.path()).expect("ensure_config should succeed");
        assert!(config_path.exists(), "config file must be created");

        let contents = std::fs::read_to_string(&config_path).expect("should read config");
        assert!(contents.contains("[api]"), "missing [api] section");
        assert!(contents.contains("[store]"), "missing [store] section");
        assert!(contents.contains("[logging]"), "missing [logging] section");
        assert!(contents.contains("[audio]"), "missing [audio] section");

        let parsed = load_config(Some(&config_path.to_string_lossy()))
            .expect("generated config should parse");
        assert_eq!(parsed.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn ensure_config_is_idempotent() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let path1 = ensure_config(dir.path()).expect("first call should succeed");
        let contents1 = std::fs::read_to_string(&path1).expect("should read");

        let path2 = ensure_config(dir.path()).expect("second call should succeed");
        let contents2 = std::fs::read_to_string(&path2).expect("should read");

        assert_eq!(path1, path2, "paths should match");
        assert_eq!(contents1, contents2, "contents should not change on second call");
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/voxboard/config.toml"))
            .expect("missing file should not error");
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }
}
