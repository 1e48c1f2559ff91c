//! Auth token grants: sign-in, sign-up, and refresh.

use crate::error::error_message;
use crate::{StoreClient, StoreError};
use serde::{Deserialize, Serialize};
use voxboard_types::{AuthSession, AuthUser};

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Raw token-grant response body. `access_token` is absent on sign-up when
/// the store requires email confirmation before issuing a session.
#[derive(Debug, Deserialize)]
struct GrantResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
}

impl GrantResponse {
    fn into_session(self) -> Result<AuthSession, StoreError> {
        let access_token = self
            .access_token
            .ok_or_else(|| StoreError::Shape("grant response missing access_token".into()))?;
        let refresh_token = self
            .refresh_token
            .ok_or_else(|| StoreError::Shape("grant response missing refresh_token".into()))?;
        let user = self
            .user
            .ok_or_else(|| StoreError::Shape("grant response missing user".into()))?;
        Ok(AuthSession {
            access_token,
            refresh_token,
            expires_at: self.expires_at.unwrap_or(0),
            user,
        })
    }
}

/// Result of account creation: the auth account always exists afterwards,
/// the session only when the store signs the account in immediately.
#[derive(Debug)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

impl StoreClient {
    /// Exchanges email + password for a session
    /// (`POST /auth/v1/token?grant_type=password`).
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let grant: GrantResponse = self
            .auth_request(
                "token?grant_type=password",
                &PasswordGrant { email, password },
            )
            .await?;
        grant.into_session()
    }

    /// Creates an auth account (`POST /auth/v1/signup`).
    ///
    /// When the store has email confirmation disabled the response carries a
    /// full session; otherwise only the created user is returned.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, StoreError> {
        let grant: GrantResponse = self
            .auth_request("signup", &PasswordGrant { email, password })
            .await?;

        if grant.access_token.is_some() {
            let session = grant.into_session()?;
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user = grant
                .user
                .ok_or_else(|| StoreError::Shape("sign-up response missing user".into()))?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    /// Resolves a fresh session from a persisted refresh token
    /// (`POST /auth/v1/token?grant_type=refresh_token`).
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, StoreError> {
        let grant: GrantResponse = self
            .auth_request(
                "token?grant_type=refresh_token",
                &RefreshGrant { refresh_token },
            )
            .await?;
        grant.into_session()
    }

    async fn auth_request<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, StoreError> {
        let response = self
            .http()
            .post(self.auth_url(path))
            .header("apikey", self.anon_key())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            tracing::debug!(%status, path, "auth request rejected: {message}");
            if status.is_client_error() {
                return Err(StoreError::Auth(message));
            }
            return Err(StoreError::Request {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| StoreError::Shape(format!("auth response did not parse: {e}")))
    }
}
