//! Integration tests for Invoicer.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (no network, seeded in-memory backend)
//! cargo test -p invoicer-integration-tests
//!
//! # Live tests against a running dashboard
//! INVOICER_BACKEND=memory cargo run -p invoicer-dashboard &
//! cargo test -p invoicer-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `dashboard_routes` - full router driven with `tower::ServiceExt::oneshot`
//! - `live_server` - HTTP against `DASHBOARD_BASE_URL`, ignored by default

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use tower::ServiceExt;
use url::form_urlencoded;

use invoicer_dashboard::cache::PageCache;
use invoicer_dashboard::config::DashboardConfig;
use invoicer_dashboard::seed::PLACEHOLDER_USER;
use invoicer_dashboard::state::AppState;
use invoicer_dashboard::supabase::{DataBackend, MemoryAuth, MemoryBackend};

/// A router over seeded in-memory data, plus a handle on its tables.
pub struct TestApp {
    pub router: Router,
    pub backend: MemoryBackend,
}

impl TestApp {
    /// Build the app with the render cache enabled.
    #[must_use]
    pub fn new() -> Self {
        let backend = MemoryBackend::seeded();
        Self::with_backend(Arc::new(backend.clone()), backend)
    }

    /// Build the app on `backend`, which must read and write `tables`.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn DataBackend>, tables: MemoryBackend) -> Self {
        let config = DashboardConfig::from_lookup(&|key| match key {
            "INVOICER_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("memory config");

        let state = AppState::new(
            config,
            backend,
            Arc::new(MemoryAuth::seeded()),
            Arc::new(PageCache::new(std::time::Duration::from_secs(60))),
        );

        Self {
            router: invoicer_dashboard::app(state),
            backend: tables,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// GET `path`, with a session cookie when given.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::get(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("valid request"))
            .await
    }

    /// POST a urlencoded form to `path`.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body)).expect("valid request"))
            .await
    }

    /// Sign in as the placeholder user and return the session cookie.
    pub async fn sign_in(&self) -> String {
        let response = self
            .post_form(
                "/login",
                &[
                    ("email", PLACEHOLDER_USER.email),
                    ("password", PLACEHOLDER_USER.password),
                ],
                None,
            )
            .await;
        session_cookie(&response).expect("login sets a session cookie")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// The `name=value` part of the response's `Set-Cookie` header.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response<Body>) -> Option<&str> {
    response.headers().get(header::LOCATION)?.to_str().ok()
}

/// Read the whole body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}
