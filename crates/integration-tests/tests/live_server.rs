//! Tests against a running dashboard.
//!
//! These tests require the dashboard to be running, for example with the
//! seeded in-memory backend:
//!
//! ```bash
//! INVOICER_BACKEND=memory cargo run -p invoicer-dashboard
//! ```
//!
//! Run with: cargo test -p invoicer-integration-tests -- --ignored

use reqwest::{Client, StatusCode, redirect::Policy};

/// Base URL of the dashboard (configurable via environment).
fn base_url() -> String {
    std::env::var("DASHBOARD_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A cookie-keeping client that does not follow redirects.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running dashboard server"]
async fn test_live_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach dashboard");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running dashboard server"]
async fn test_live_sign_in_and_list_invoices() {
    let client = client();
    let base_url = base_url();

    let resp = client
        .get(format!("{base_url}/dashboard/invoices"))
        .send()
        .await
        .expect("Failed to get invoices");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .post(format!("{base_url}/login"))
        .form(&[("email", "user@nextmail.com"), ("password", "123456")])
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(format!("{base_url}/dashboard/invoices"))
        .send()
        .await
        .expect("Failed to get invoices");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("<table class=\"invoices\">"));
}
