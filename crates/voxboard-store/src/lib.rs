//! Client for the remote session store — the hosted auth + Postgres service
//! that owns credentials, session tokens, and the `user` relation.
//!
//! Two surfaces are consumed over its REST protocol:
//! auth token grants (sign-in, sign-up, refresh) under `/auth/v1`, and
//! PostgREST-style table reads/writes under `/rest/v1/{table}` with equality
//! filters, ordering, limits and single-row mode.
//!
//! The store is an external collaborator: nothing here is authoritative, and
//! every call is fire-once — failures are reported to the caller, never
//! retried.

pub mod auth;
pub mod error;
pub mod table;

pub use auth::SignUpOutcome;
pub use error::StoreError;
pub use table::TableQuery;

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default timeout for store requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the remote store: endpoint plus the public
/// (anon) key.
#[derive(Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted service, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Public API key sent with every request.
    #[serde(default)]
    pub anon_key: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// HTTP client for the remote session store.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl StoreClient {
    /// Builds a client for the given endpoint and anon key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` when the endpoint is empty and
    /// `StoreError::Transport` when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        if config.url.trim().is_empty() {
            return Err(StoreError::Config(
                "store endpoint is empty — set store.url in config.toml".to_string(),
            ));
        }
        if config.anon_key.trim().is_empty() {
            return Err(StoreError::Config(
                "store anon key is empty — set store.anon_key in config.toml".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
        })
    }

    /// Starts a table query against `/rest/v1/{table}`.
    pub fn table(&self, table: impl Into<String>) -> TableQuery<'_> {
        TableQuery::new(self, table.into())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}
