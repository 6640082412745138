//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Landing page
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (remote ping)
//!
//! # Auth
//! GET  /login        POST /login       - Sign-in form / sign in
//! GET  /register     POST /register    - Sign-up form / sign up
//! POST /logout                         - Sign out
//!
//! # Dashboard (signed-in users only)
//! GET  /dashboard                      - Cards, revenue chart, latest invoices
//! GET  /dashboard/invoices             - Invoice list (?query=&page=)
//! POST /dashboard/invoices             - Create invoice
//! GET  /dashboard/invoices/create      - Create form
//! GET  /dashboard/invoices/{id}/edit   - Edit form
//! POST /dashboard/invoices/{id}        - Update invoice
//! POST /dashboard/invoices/{id}/delete - Delete invoice
//! ```

pub mod auth;
pub mod dashboard;
pub mod home;
pub mod invoices;
pub mod pagination;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the dashboard router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(home::health))
        .route("/health/ready", get(home::ready))
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        // Dashboard
        .nest("/dashboard", dashboard_routes())
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::overview))
        .route("/invoices", get(invoices::index).post(invoices::create))
        .route("/invoices/create", get(invoices::create_page))
        .route("/invoices/{id}/edit", get(invoices::edit_page))
        .route("/invoices/{id}", post(invoices::update))
        .route("/invoices/{id}/delete", post(invoices::delete))
}
