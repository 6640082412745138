//! Sign-in, sign-up and sign-out.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument, warn};

use invoicer_core::Email;

use super::{ActionOutcome, Actions, FormState, LoginOutcome};
use crate::cache::Scope;
use crate::supabase::{Credentials, Registration};

const REGISTER_FAILED: &str = "Please try again with different credentials.";

/// Read a form field straight into a secret.
fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Sign-in form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

/// Sign-up form fields.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

impl LoginForm {
    fn credentials(&self) -> Option<Credentials> {
        let email = Email::parse(&self.email).ok()?;
        if self.password.expose_secret().is_empty() {
            return None;
        }
        Some(Credentials {
            email,
            password: self.password.clone(),
        })
    }
}

impl RegisterForm {
    fn registration(&self) -> Option<Registration> {
        let name = self.name.trim();
        if name.is_empty() || self.password.expose_secret().is_empty() {
            return None;
        }
        Some(Registration {
            name: name.to_string(),
            email: Email::parse(&self.email).ok()?,
            password: self.password.clone(),
        })
    }
}

impl Actions {
    /// Sign in with email and password.
    ///
    /// Every failure looks the same to the caller.
    #[instrument(skip_all)]
    pub async fn log_in(&self, form: &LoginForm) -> LoginOutcome {
        let Some(credentials) = form.credentials() else {
            return LoginOutcome::Failed { is_error: true };
        };

        match self.auth.sign_in(&credentials).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "User signed in");
                self.cache.revalidate_path("/", Scope::Layout).await;
                LoginOutcome::Succeeded {
                    session,
                    redirect_to: "/dashboard".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                LoginOutcome::Failed { is_error: true }
            }
        }
    }

    /// Create an account and send the user to the sign-in page.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &RegisterForm) -> ActionOutcome {
        let Some(registration) = form.registration() else {
            return ActionOutcome::Rejected(FormState::message(REGISTER_FAILED));
        };

        if let Err(e) = self.auth.sign_up(&registration).await {
            warn!(error = %e, "Registration failed");
            return ActionOutcome::Rejected(FormState::message(REGISTER_FAILED));
        }

        info!(email = %registration.email, "User registered");
        self.cache.revalidate_path("/", Scope::Layout).await;
        ActionOutcome::redirect("/login")
    }

    /// Revoke the session token, if any, and go home.
    ///
    /// Failing to revoke the token is logged and otherwise ignored.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: Option<&SecretString>) -> ActionOutcome {
        if let Some(token) = access_token
            && let Err(e) = self.auth.sign_out(token).await
        {
            warn!(error = %e, "Sign-out failed");
        }
        ActionOutcome::redirect("/")
    }
}
