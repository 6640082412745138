//! Auth service access.
//!
//! Sign-in, sign-up and sign-out are delegated to an [`AuthProvider`]. The
//! hosted implementation talks to the project's `/auth/v1` endpoints; the
//! in-memory one keeps accounts in a map and is used by tests and the local
//! memory backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use invoicer_core::{Email, UserId};

use super::client::build_http_client;
use super::{RemoteError, api_error};

/// Errors returned by an [`AuthProvider`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password combination was not accepted.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The auth service refused the request (e.g. duplicate sign-up).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The auth service could not be reached or answered unexpectedly.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(RemoteError::Http(err))
    }
}

/// Sign-in form values.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// Sign-up form values.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

/// A signed-in user as reported by the auth service.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Email,
    pub access_token: SecretString,
}

/// Delegated authentication.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    /// Create an account.
    async fn sign_up(&self, registration: &Registration) -> Result<(), AuthError>;

    /// Revoke a session's access token.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError>;
}

// =============================================================================
// Hosted auth service
// =============================================================================

/// Client for the project's `/auth/v1` endpoints.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    auth_url: Url,
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("auth_url", &self.auth_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

impl SupabaseAuth {
    /// Create an auth client for the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid header value, the project
    /// URL cannot be joined, or the HTTP client cannot be built.
    pub fn new(
        project_url: &Url,
        anon_key: &SecretString,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let client = build_http_client(anon_key, timeout)?;
        let auth_url = project_url
            .join("auth/v1/")
            .map_err(|e| RemoteError::Parse(format!("invalid project URL: {e}")))?;
        Ok(Self { client, auth_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.auth_url
            .join(path)
            .map_err(|e| RemoteError::Parse(format!("invalid path {path}: {e}")))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let url = self.endpoint("token")?;
        let response = self
            .client
            .post(url)
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": credentials.email.as_str(),
                "password": credentials.password.expose_secret(),
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(api_error(response).await.into());
        }

        let token: TokenResponse = response.json().await?;
        let email = token
            .user
            .email
            .as_deref()
            .and_then(|e| Email::parse(e).ok())
            .unwrap_or_else(|| credentials.email.clone());

        Ok(AuthSession {
            user_id: UserId::new(token.user.id),
            email,
            access_token: SecretString::from(token.access_token),
        })
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn sign_up(&self, registration: &Registration) -> Result<(), AuthError> {
        let url = self.endpoint("signup")?;
        let response = self
            .client
            .post(url)
            .json(&json!({
                "email": registration.email.as_str(),
                "password": registration.password.expose_secret(),
                "data": { "name": registration.name },
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let message = match api_error(response).await {
                RemoteError::Api { message, .. } => message,
                other => other.to_string(),
            };
            return Err(AuthError::Rejected(message));
        }
        if !status.is_success() {
            return Err(api_error(response).await.into());
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let url = self.endpoint("logout")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }
        Ok(())
    }
}

// =============================================================================
// In-memory accounts
// =============================================================================

#[derive(Clone)]
struct Account {
    id: UserId,
    name: String,
    password: SecretString,
}

/// In-memory [`AuthProvider`].
///
/// Accounts and issued tokens live in maps guarded by `RwLock`. Clones share
/// state.
#[derive(Clone, Default)]
pub struct MemoryAuth {
    accounts: Arc<RwLock<HashMap<Email, Account>>>,
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl std::fmt::Debug for MemoryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let accounts = self.accounts.read().map(|a| a.len()).unwrap_or_default();
        f.debug_struct("MemoryAuth")
            .field("accounts", &accounts)
            .finish_non_exhaustive()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AuthError {
    AuthError::Remote(RemoteError::Api {
        status: 500,
        message: "memory auth lock poisoned".to_string(),
    })
}

impl MemoryAuth {
    /// Create a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding the placeholder account.
    #[must_use]
    pub fn seeded() -> Self {
        let user = &crate::seed::PLACEHOLDER_USER;
        let auth = Self::new();
        if let (Ok(email), Ok(mut accounts)) = (Email::parse(user.email), auth.accounts.write()) {
            accounts.insert(
                email,
                Account {
                    id: UserId::new(user.id),
                    name: user.name.to_string(),
                    password: SecretString::from(user.password),
                },
            );
        }
        auth
    }

    /// Display name of a registered account.
    #[must_use]
    pub fn name_of(&self, email: &Email) -> Option<String> {
        self.accounts
            .read()
            .ok()
            .and_then(|accounts| accounts.get(email).map(|a| a.name.clone()))
    }

    /// Number of access tokens that have not been signed out.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or_default()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let account = self
            .accounts
            .read()
            .map_err(poisoned)?
            .get(&credentials.email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        if account.password.expose_secret() != credentials.password.expose_secret() {
            return Err(AuthError::InvalidCredentials);
        }

        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .map_err(poisoned)?
            .insert(token.clone(), account.id.clone());

        Ok(AuthSession {
            user_id: account.id,
            email: credentials.email.clone(),
            access_token: SecretString::from(token),
        })
    }

    async fn sign_up(&self, registration: &Registration) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.contains_key(&registration.email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        accounts.insert(
            registration.email.clone(),
            Account {
                id: UserId::new(Uuid::new_v4().to_string()),
                name: registration.name.clone(),
                password: registration.password.clone(),
            },
        );
        Ok(())
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        self.tokens
            .write()
            .map_err(poisoned)?
            .remove(access_token.expose_secret());
        Ok(())
    }
}
