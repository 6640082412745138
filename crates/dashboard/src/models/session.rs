//! Session-related types for dashboard authentication.

use serde::{Deserialize, Serialize};

use invoicer_core::{Email, UserId};

use crate::supabase::AuthSession;

/// Session-stored user identity.
///
/// The access token is kept so sign-out can revoke it. `Debug` is
/// implemented by hand to redact it.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth service user id.
    pub id: UserId,
    /// Email the user signed in with.
    pub email: Email,
    access_token: String,
}

impl CurrentUser {
    /// The bearer token issued at sign-in.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl From<AuthSession> for CurrentUser {
    fn from(session: AuthSession) -> Self {
        use secrecy::ExposeSecret;

        Self {
            id: session.user_id,
            email: session.email,
            access_token: session.access_token.expose_secret().to_string(),
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
