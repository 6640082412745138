//! Action layer.
//!
//! One function per mutation. Each action validates its input, calls the
//! remote service, marks affected render paths stale and tells the caller
//! where to go next. Nothing here touches HTTP: outcomes are plain values
//! that the route handlers map to a re-rendered form or a redirect.
//!
//! ```text
//! Idle -> Validating -> Invalid                     => Rejected(errors, message)
//!                    -> Executing -> Failed         => Rejected(message)
//!                                 -> Succeeded      => revalidate, Redirect(path)
//! ```

mod auth;
mod invoices;

use std::sync::Arc;

use serde::Serialize;

use invoicer_core::FieldErrors;

use crate::cache::RenderCache;
use crate::supabase::{AuthProvider, AuthSession, DataBackend};

pub use auth::{LoginForm, RegisterForm};

/// Path of the invoice list, revalidated after every invoice mutation.
pub const INVOICES_PATH: &str = "/dashboard/invoices";

/// Message returned when an invoice could not be deleted.
pub const DELETE_FAILED: &str = "Database Error: Failed to Delete Invoice.";

/// Field errors and a summary message for a form that must be shown again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub errors: FieldErrors,
    pub message: Option<String>,
}

impl FormState {
    /// A state carrying only a summary message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: FieldErrors::new(),
            message: Some(message.into()),
        }
    }
}

/// What the caller should do after a form action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Navigate to this path.
    Redirect(String),
    /// Render the form again with this state.
    Rejected(FormState),
}

impl ActionOutcome {
    fn redirect(path: &str) -> Self {
        Self::Redirect(path.to_string())
    }
}

/// Result of deleting an invoice. The caller stays on the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub message: Option<String>,
}

/// Result of a sign-in attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Store the session and navigate to `redirect_to`.
    Succeeded {
        session: AuthSession,
        redirect_to: String,
    },
    /// Show the generic invalid-credentials error.
    Failed { is_error: bool },
}

/// Mutations over invoices and accounts.
#[derive(Clone)]
pub struct Actions {
    backend: Arc<dyn DataBackend>,
    auth: Arc<dyn AuthProvider>,
    cache: Arc<dyn RenderCache>,
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions").finish_non_exhaustive()
    }
}

impl Actions {
    #[must_use]
    pub fn new(
        backend: Arc<dyn DataBackend>,
        auth: Arc<dyn AuthProvider>,
        cache: Arc<dyn RenderCache>,
    ) -> Self {
        Self {
            backend,
            auth,
            cache,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod doubles {
    //! Test doubles shared by the action tests.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::cache::{RenderCache, Scope};
    use crate::supabase::{DataBackend, Filter, RemoteError, Select};

    /// Render cache that records every revalidation.
    #[derive(Default)]
    pub struct RecordingCache {
        pub revalidated: Mutex<Vec<(String, Scope)>>,
    }

    impl RecordingCache {
        pub fn calls(&self) -> Vec<(String, Scope)> {
            self.revalidated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RenderCache for RecordingCache {
        async fn get(&self, _: &str) -> Option<String> {
            None
        }

        fn generation(&self) -> u64 {
            0
        }

        async fn put(&self, _: String, _: String, _: u64) {}

        async fn revalidate_path(&self, path: &str, scope: Scope) {
            self.revalidated
                .lock()
                .unwrap()
                .push((path.to_string(), scope));
        }
    }

    /// Backend whose writes fail and whose reads return nothing.
    pub struct FailingWrites;

    fn down() -> RemoteError {
        RemoteError::Api {
            status: 500,
            message: "insert or update on table \"invoices\" violates foreign key constraint"
                .to_string(),
        }
    }

    #[async_trait]
    impl DataBackend for FailingWrites {
        async fn select(&self, _: &Select) -> Result<Vec<Value>, RemoteError> {
            Ok(Vec::new())
        }
        async fn count(&self, _: &str, _: &[Filter]) -> Result<u64, RemoteError> {
            Ok(0)
        }
        async fn insert(&self, _: &str, _: Value) -> Result<(), RemoteError> {
            Err(down())
        }
        async fn update(&self, _: &str, _: Value, _: &[Filter]) -> Result<(), RemoteError> {
            Err(down())
        }
        async fn delete(&self, _: &str, _: &[Filter]) -> Result<(), RemoteError> {
            Err(down())
        }
        async fn rpc(&self, _: &str, _: Value) -> Result<Value, RemoteError> {
            Ok(Value::Null)
        }
        async fn ping(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }
}
