//! Refresh-token persistence.
//!
//! The OS keyring is the durable backend; when it is unavailable the vault
//! degrades to no persistence and the user signs in again next launch. An
//! in-memory backend exists for tests and for callers that opt out of
//! persistence.

use std::sync::Mutex;

const KEYRING_USER: &str = "refresh-token";

#[derive(Debug)]
enum Backend {
    Keyring { service: String },
    Memory(Mutex<Option<String>>),
}

/// Stores the one credential the client persists between runs.
#[derive(Debug)]
pub struct TokenVault {
    backend: Backend,
}

impl TokenVault {
    /// Vault backed by the OS keyring under the given service name.
    pub fn keyring(service: impl Into<String>) -> Self {
        Self {
            backend: Backend::Keyring {
                service: service.into(),
            },
        }
    }

    /// Vault that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(None)),
        }
    }

    /// Seeded in-memory vault.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(Some(token.into()))),
        }
    }

    /// Reads the persisted refresh token.
    ///
    /// Keyring platform failures degrade to `None` with a warning; a missing
    /// entry is not an error.
    pub fn load(&self) -> Option<String> {
        match &self.backend {
            Backend::Memory(slot) => slot.lock().expect("vault lock poisoned").clone(),
            Backend::Keyring { service } => {
                let entry = match keyring::Entry::new(service, KEYRING_USER) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("keyring entry creation failed: {e}");
                        return None;
                    }
                };
                match entry.get_password() {
                    Ok(token) => Some(token),
                    Err(keyring::Error::NoEntry) => None,
                    Err(e) => {
                        tracing::warn!("keyring read failed (session will not persist): {e}");
                        None
                    }
                }
            }
        }
    }

    /// Persists the refresh token. Failures are logged, never fatal —
    /// the session still works for this run.
    pub fn store(&self, token: &str) {
        match &self.backend {
            Backend::Memory(slot) => {
                *slot.lock().expect("vault lock poisoned") = Some(token.to_string());
            }
            Backend::Keyring { service } => {
                match keyring::Entry::new(service, KEYRING_USER)
                    .and_then(|entry| entry.set_password(token))
                {
                    Ok(()) => {}
                    Err(e) => {
                        tracing::warn!("keyring store failed (session will not persist): {e}");
                    }
                }
            }
        }
    }

    /// Removes the persisted token (sign-out).
    pub fn clear(&self) {
        match &self.backend {
            Backend::Memory(slot) => {
                *slot.lock().expect("vault lock poisoned") = None;
            }
            Backend::Keyring { service } => {
                match keyring::Entry::new(service, KEYRING_USER) {
                    Ok(entry) => match entry.delete_credential() {
                        Ok(()) | Err(keyring::Error::NoEntry) => {}
                        Err(e) => tracing::warn!("keyring delete failed: {e}"),
                    },
                    Err(e) => tracing::warn!("keyring entry creation failed: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_vault_round_trips() {
        let vault = TokenVault::in_memory();
        assert_eq!(vault.load(), None);
        vault.store("jwt-refresh");
        assert_eq!(vault.load().as_deref(), Some("jwt-refresh"));
        vault.clear();
        assert_eq!(vault.load(), None);
    }

    #[test]
    fn seeded_vault_starts_populated() {
        let vault = TokenVault::with_token("persisted");
        assert_eq!(vault.load().as_deref(), Some("persisted"));
    }
}
