//! Render cache behavior when a mutation lands during a list render.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use tokio::sync::Notify;

use invoicer_dashboard::supabase::{DataBackend, Filter, MemoryBackend, RemoteError, Select};
use invoicer_integration_tests::{TestApp, body_text};

/// Memory backend whose first invoice search stalls after reading its rows
/// until the test lets it continue.
struct StallingBackend {
    inner: MemoryBackend,
    armed: AtomicBool,
    read_done: Notify,
    resume: Notify,
}

#[async_trait]
impl DataBackend for StallingBackend {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        self.inner.select(query).await
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, RemoteError> {
        self.inner.count(table, filters).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        self.inner.insert(table, row).await
    }

    async fn update(
        &self,
        table: &str,
        changes: Value,
        filters: &[Filter],
    ) -> Result<(), RemoteError> {
        self.inner.update(table, changes, filters).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError> {
        self.inner.delete(table, filters).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
        let rows = self.inner.rpc(function, args).await;
        if function == "fetch_filtered_invoices5" && self.armed.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.resume.notified().await;
        }
        rows
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_create_during_list_render_is_not_hidden_by_cache() {
    let tables = MemoryBackend::seeded();
    let backend = Arc::new(StallingBackend {
        inner: tables.clone(),
        armed: AtomicBool::new(false),
        read_done: Notify::new(),
        resume: Notify::new(),
    });
    let app = TestApp::with_backend(backend.clone(), tables);
    let cookie = app.sign_in().await;

    backend.armed.store(true, Ordering::SeqCst);

    let render = app.get("/dashboard/invoices", Some(&cookie));
    let mutate = async {
        backend.read_done.notified().await;
        let created = app
            .post_form(
                "/dashboard/invoices",
                &[
                    ("customer_id", "3958dc9e-742f-4377-85e9-fec4b6a6442a"),
                    ("amount", "987654.32"),
                    ("status", "pending"),
                ],
                Some(&cookie),
            )
            .await;
        backend.resume.notify_one();
        created
    };
    let (listed, created) = tokio::join!(render, mutate);

    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(created.status(), StatusCode::SEE_OTHER);
    assert!(
        app.backend
            .rows("invoices")
            .iter()
            .any(|row| row["amount"] == 98_765_432)
    );

    let after = body_text(app.get("/dashboard/invoices", Some(&cookie)).await).await;
    assert!(after.contains("$987,654.32"));
}
