//! The session manager — the single source of truth for "who is signed in".
//!
//! Replaces the ambient auth context of the original dashboard with an
//! explicit contract: [`SessionManager::subscribe`] for change
//! notifications, [`SessionManager::current`] for a snapshot, and
//! [`SessionManager::refresh`] with a cancellation gate so the published
//! state always reflects the most recently *initiated* refresh — two
//! near-simultaneous refreshes can no longer race and leave the user set by
//! whichever response resolves last.
//!
//! State transitions: sign-in, sign-up and sign-out resolve a session from
//! the remote store, fetch the matching `user` profile row, and publish the
//! result to every subscriber. Any error along the way is captured as a
//! string in [`SessionState::error`]; `Resolving` is the only loading signal
//! consumers get.

pub mod vault;

pub use vault::TokenVault;

use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use voxboard_store::{StoreClient, StoreError};
use voxboard_types::{AuthSession, User};

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Initial resolution against the remote store is still in flight.
    Resolving,
    /// No session; the auth forms apply.
    Anonymous,
    /// A session and its profile row are loaded.
    Authenticated { user: User, session: AuthSession },
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Last failure as a user-facing string; cleared by the next successful
    /// transition.
    pub error: Option<String>,
}

impl SessionState {
    fn resolving() -> Self {
        Self {
            phase: SessionPhase::Resolving,
            error: None,
        }
    }

    /// The signed-in user, when there is one.
    pub fn user(&self) -> Option<&User> {
        match &self.phase {
            SessionPhase::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    /// The access token of the live session, when there is one.
    pub fn access_token(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Authenticated { session, .. } => Some(&session.access_token),
            _ => None,
        }
    }
}

/// Profile fields collected by the sign-up form.
#[derive(Debug, Clone)]
pub struct SignUpProfile {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
struct ProfileRow<'a> {
    userid: &'a str,
    name: &'a str,
    email: &'a str,
    #[serde(rename = "phoneNumber")]
    phone_number: &'a str,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The account exists but the store wants email confirmation before it
    /// will issue a session.
    #[error("account created — confirm the email address before signing in")]
    ConfirmationRequired,

    /// The auth account was created but the profile row insert failed,
    /// leaving an orphaned account (see DESIGN.md — flagged, not repaired).
    #[error("profile insert failed after account creation: {0}")]
    ProfileInsert(String),
}

struct Inner {
    store: StoreClient,
    vault: TokenVault,
    state_tx: watch::Sender<SessionState>,
    /// Cancellation gate: starting a refresh cancels whichever one is in
    /// flight, so only the most recently initiated refresh can publish.
    refresh_gate: Mutex<CancellationToken>,
}

/// Handle to the process-wide session state. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(store: StoreClient, vault: TokenVault) -> Self {
        let (state_tx, _) = watch::channel(SessionState::resolving());
        Self {
            inner: Arc::new(Inner {
                store,
                vault,
                state_tx,
                refresh_gate: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Change notifications for the subscriber's lifetime. The receiver
    /// always observes the latest state; dropping it unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Initial resolution: loads the persisted refresh token and exchanges
    /// it for a session + profile. Publishes `Resolving` first, then the
    /// outcome. With no persisted token the outcome is `Anonymous`.
    pub async fn resolve(&self) {
        self.publish(SessionState::resolving());
        self.refresh().await;
    }

    /// Re-resolves the session from the persisted refresh token.
    ///
    /// Starting a refresh cancels any in-flight one; a superseded refresh
    /// publishes nothing.
    pub async fn refresh(&self) {
        let gate = self.begin_refresh();

        let Some(refresh_token) = self.inner.vault.load() else {
            if !gate.is_cancelled() {
                self.publish(SessionState {
                    phase: SessionPhase::Anonymous,
                    error: None,
                });
            }
            return;
        };

        let outcome = tokio::select! {
            _ = gate.cancelled() => return,
            outcome = self.resolve_from_token(&refresh_token) => outcome,
        };
        // A newer refresh may have started between the response resolving
        // and this point; it owns the state now.
        if gate.is_cancelled() {
            return;
        }

        match outcome {
            Ok(state) => self.publish(state),
            Err(e) => {
                tracing::warn!("session refresh failed: {e}");
                self.publish(SessionState {
                    phase: SessionPhase::Anonymous,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    /// Signs in with email + password, persists the refresh token, and
    /// publishes the authenticated state.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let gate = self.begin_refresh();
        let result = self.sign_in_inner(email, password).await;
        match result {
            Ok((user, session)) => {
                self.inner.vault.store(&session.refresh_token);
                if !gate.is_cancelled() {
                    self.publish(SessionState {
                        phase: SessionPhase::Authenticated {
                            user: user.clone(),
                            session,
                        },
                        error: None,
                    });
                }
                Ok(user)
            }
            Err(e) => {
                if !gate.is_cancelled() {
                    self.publish(SessionState {
                        phase: SessionPhase::Anonymous,
                        error: Some(e.to_string()),
                    });
                }
                Err(e)
            }
        }
    }

    /// Creates the auth account, inserts the profile row, and signs in.
    ///
    /// The profile insert runs only after the auth account exists; when the
    /// insert fails the account is left orphaned — the failure is logged and
    /// surfaced, never silently repaired.
    pub async fn sign_up(
        &self,
        profile: SignUpProfile,
        password: &str,
    ) -> Result<User, SessionError> {
        let outcome = self.inner.store.sign_up(&profile.email, password).await?;

        let Some(session) = outcome.session else {
            self.publish(SessionState {
                phase: SessionPhase::Anonymous,
                error: Some(SessionError::ConfirmationRequired.to_string()),
            });
            return Err(SessionError::ConfirmationRequired);
        };

        let row = ProfileRow {
            userid: &session.user.id,
            name: &profile.name,
            email: &profile.email,
            phone_number: &profile.phone_number,
        };
        if let Err(e) = self
            .inner
            .store
            .insert("user", &row, Some(&session.access_token))
            .await
        {
            tracing::warn!(
                userid = %session.user.id,
                "auth account created but profile insert failed — account is orphaned: {e}"
            );
            let err = SessionError::ProfileInsert(e.to_string());
            self.publish(SessionState {
                phase: SessionPhase::Anonymous,
                error: Some(err.to_string()),
            });
            return Err(err);
        }

        let gate = self.begin_refresh();
        let user = match self.fetch_user(&session).await {
            Ok(user) => user,
            Err(e) => {
                if !gate.is_cancelled() {
                    self.publish(SessionState {
                        phase: SessionPhase::Anonymous,
                        error: Some(e.to_string()),
                    });
                }
                return Err(e);
            }
        };
        self.inner.vault.store(&session.refresh_token);
        if !gate.is_cancelled() {
            self.publish(SessionState {
                phase: SessionPhase::Authenticated {
                    user: user.clone(),
                    session,
                },
                error: None,
            });
        }
        Ok(user)
    }

    /// Drops the session and the persisted token. Client-side only — the
    /// remote store invalidates the token on expiry.
    pub fn sign_out(&self) {
        // Cancel anything in flight so it cannot resurrect the session.
        self.begin_refresh();
        self.inner.vault.clear();
        self.publish(SessionState {
            phase: SessionPhase::Anonymous,
            error: None,
        });
    }

    fn begin_refresh(&self) -> CancellationToken {
        let mut gate = self
            .inner
            .refresh_gate
            .lock()
            .expect("refresh gate poisoned");
        gate.cancel();
        let token = CancellationToken::new();
        *gate = token.clone();
        token
    }

    fn publish(&self, state: SessionState) {
        // send_replace never fails: the manager holds the sender and state
        // is observable via `current` even with no subscribers.
        self.inner.state_tx.send_replace(state);
    }

    async fn resolve_from_token(
        &self,
        refresh_token: &str,
    ) -> Result<SessionState, SessionError> {
        let session = self.inner.store.refresh_session(refresh_token).await?;
        // The store rotates refresh tokens on every grant.
        self.inner.vault.store(&session.refresh_token);
        let user = self.fetch_user(&session).await?;
        Ok(SessionState {
            phase: SessionPhase::Authenticated { user, session },
            error: None,
        })
    }

    async fn sign_in_inner(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthSession), SessionError> {
        let session = self
            .inner
            .store
            .sign_in_with_password(email, password)
            .await?;
        let user = self.fetch_user(&session).await?;
        Ok((user, session))
    }

    async fn fetch_user(&self, session: &AuthSession) -> Result<User, SessionError> {
        let user = self
            .inner
            .store
            .table("user")
            .eq("userid", &session.user.id)
            .bearer(&session.access_token)
            .single::<User>()
            .await?;
        Ok(user)
    }
}
