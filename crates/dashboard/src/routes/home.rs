//! Landing page and health checks.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{filters, middleware::OptionalAuth, state::AppState};

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
}

/// Display the landing page.
pub async fn home(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    HomeTemplate {
        signed_in: user.is_some(),
    }
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: checks the remote data service answers.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.backend().ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "remote unavailable").into_response()
        }
    }
}
