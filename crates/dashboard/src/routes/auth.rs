//! Sign-in, sign-up and sign-out routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    actions::{ActionOutcome, LoginForm, LoginOutcome, RegisterForm},
    error::{AppError, clear_sentry_user, set_sentry_user},
    filters,
    middleware::{OptionalAuth, clear_current_user, set_current_user},
    models::CurrentUser,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub name: String,
    pub email: String,
    pub message: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page, or go straight to the dashboard when signed in.
pub async fn login_page(OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    LoginTemplate {
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.actions().log_in(&form).await {
        LoginOutcome::Succeeded {
            session: auth,
            redirect_to,
        } => {
            let user = CurrentUser::from(auth);
            set_current_user(&session, &user).await.map_err(|e| {
                AppError::Internal(format!("Failed to store session: {e}"))
            })?;
            set_sentry_user(user.id.as_str(), Some(user.email.as_str()));
            Ok(Redirect::to(&redirect_to).into_response())
        }
        LoginOutcome::Failed { is_error } => Ok(LoginTemplate {
            email: form.email,
            error: is_error.then(|| INVALID_CREDENTIALS.to_string()),
        }
        .into_response()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate {
        name: String::new(),
        email: String::new(),
        message: None,
    }
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    match state.actions().register(&form).await {
        ActionOutcome::Redirect(to) => Redirect::to(&to).into_response(),
        ActionOutcome::Rejected(form_state) => RegisterTemplate {
            name: form.name,
            email: form.email,
            message: form_state.message,
        }
        .into_response(),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out: drop the local session and revoke the remote token.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let user = match clear_current_user(&session).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to clear session: {}", e);
            None
        }
    };
    clear_sentry_user();

    let token = user.map(|u| SecretString::from(u.access_token()));
    match state.actions().sign_out(token.as_ref()).await {
        ActionOutcome::Redirect(to) => Redirect::to(&to).into_response(),
        ActionOutcome::Rejected(_) => Redirect::to("/").into_response(),
    }
}
