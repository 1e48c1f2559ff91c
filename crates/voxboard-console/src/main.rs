//! voxboard console binary — the entry point for the voxboard client.
//!
//! Loads configuration, initializes structured logging, resolves the
//! persisted session against the remote store, and hands control to the
//! interactive console loop.

mod config;
mod repl;

use tracing_subscriber::EnvFilter;
use voxboard_api::BackendClient;
use voxboard_audio::{detect_language, Speaker};
use voxboard_session::{SessionManager, TokenVault};
use voxboard_store::StoreClient;

/// Keyring service under which the session refresh token is persisted.
const KEYRING_SERVICE: &str = "com.voxboard.console";

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VOXBOARD_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();

    // Default: a config.toml in the platform data directory, created on
    // first run.
    let selected_config_path = resolved_config_path.unwrap_or_else(|| {
        let data_dir = config::resolve_data_dir();
        std::fs::create_dir_all(&data_dir).expect("failed to create voxboard data directory");
        config::ensure_config(&data_dir)
            .expect("failed to initialize configuration")
            .to_string_lossy()
            .into_owned()
    });

    // Load configuration
    let config = config::load_config(Some(&selected_config_path))
        .expect("failed to load configuration — the console cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = %selected_config_path,
        "resolved startup configuration path"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start async runtime");

    // External collaborators
    let store = StoreClient::new(config.store.clone())
        .expect("invalid store settings — check [store] in config.toml");
    let api = BackendClient::new(config.api.base_url.clone())
        .expect("invalid backend settings — check [api] in config.toml");

    // Session resolution from the persisted refresh token
    let session = SessionManager::new(store.clone(), TokenVault::keyring(KEYRING_SERVICE));
    runtime.block_on(session.resolve());

    let language = detect_language();
    tracing::debug!(%language, "detected console language");

    let app = repl::App::new(
        api,
        store,
        session,
        Speaker::new(config.audio.tts_binary.clone()),
        language,
    );

    if let Err(e) = repl::run(&runtime, app) {
        tracing::error!("console loop failed: {e}");
        std::process::exit(1);
    }

    tracing::info!("voxboard console shut down");
}
