//! Invoicer dashboard library.
//!
//! Server-rendered invoicing dashboard: revenue summaries, a searchable
//! invoice list and invoice create/update/delete against a hosted Postgres
//! database reached through its REST API.
//!
//! # Layers
//!
//! - [`supabase`] - remote data service and auth, behind the
//!   [`DataBackend`](supabase::DataBackend) and
//!   [`AuthProvider`](supabase::AuthProvider) traits
//! - [`data`] - one function per read query
//! - [`actions`] - one function per mutation
//! - [`cache`] - rendered-page cache and path revalidation
//! - [`routes`] - axum handlers and askama templates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod actions;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod supabase;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::create_session_layer;
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the application router with sessions, static files and request
/// tracing. Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
