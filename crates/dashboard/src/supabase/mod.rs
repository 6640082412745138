//! Remote data service access.
//!
//! The dashboard reads and writes a hosted Postgres database through its REST
//! interface: table-scoped select/insert/update/delete with filter, order,
//! limit and offset modifiers, exact row counts, and named remote procedures.
//!
//! Everything above this module talks to the [`DataBackend`] trait, so the
//! data and action layers can run against:
//!
//! - [`SupabaseClient`] - the real REST API over `reqwest`
//! - [`MemoryBackend`] - in-process tables for tests and local development
//!
//! Auth lives next door in [`auth`], behind the [`AuthProvider`] trait.

pub mod auth;
mod client;
mod memory;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use auth::{
    AuthError, AuthProvider, AuthSession, Credentials, MemoryAuth, Registration, SupabaseAuth,
};
pub use client::SupabaseClient;
pub use memory::MemoryBackend;

/// Errors returned by the remote data service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response rows did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sort direction for [`Select::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: String },
}

impl Filter {
    /// `column = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Encode as a REST query pair, e.g. `("id", "eq.42")`.
    fn to_query_pair(&self) -> (String, String) {
        match self {
            Self::Eq { column, value } => (column.clone(), format!("eq.{value}")),
        }
    }
}

/// A table-scoped read.
///
/// ```rust,ignore
/// let query = Select::new("invoices")
///     .columns("id,amount,customers(name,email,image_url)")
///     .order("invoice_date", Direction::Desc)
///     .limit(5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Select {
    /// Select all columns of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        }
    }

    /// Restrict (or embed) columns using the REST `select` syntax.
    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Keep rows where `column = value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Order rows by a column.
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Encode as REST query parameters.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.iter().map(Filter::to_query_pair));
        if let Some((column, direction)) = &self.order {
            pairs.push(("order".to_string(), format!("{column}.{}", direction.as_str())));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

/// Generic query/command interface of the remote data service.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Read rows.
    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError>;

    /// Exact number of rows in `table` matching `filters`.
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, RemoteError>;

    /// Insert one row.
    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError>;

    /// Apply `changes` to every row matching `filters`.
    async fn update(
        &self,
        table: &str,
        changes: Value,
        filters: &[Filter],
    ) -> Result<(), RemoteError>;

    /// Delete every row matching `filters`. Matching nothing is not an error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError>;

    /// Invoke a named remote procedure.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RemoteError>;
}

/// Decode a list of JSON rows into typed values.
///
/// # Errors
///
/// Returns [`RemoteError::Decode`] if any row does not match `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, RemoteError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(RemoteError::from))
        .collect()
}

/// Error body shapes used by the REST and auth services.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

/// Turn a non-success response into [`RemoteError::Api`].
async fn api_error(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .unwrap_or(text);
    RemoteError::Api { status, message }
}
