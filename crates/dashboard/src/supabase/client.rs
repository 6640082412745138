//! REST client for the hosted database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{DataBackend, Filter, RemoteError, Select, api_error};

/// Header carrying the project's anon key.
const API_KEY_HEADER: &str = "apikey";

/// Client for the project's `/rest/v1` interface.
///
/// Cheap to clone; clones share one connection pool. Every request sends
/// `Cache-Control: no-store` so list and card data are always read fresh.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: Url,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid header value, the project
    /// URL cannot be joined, or the HTTP client cannot be built.
    pub fn new(
        project_url: &Url,
        anon_key: &SecretString,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let client = build_http_client(anon_key, timeout)?;
        let rest_url = project_url
            .join("rest/v1/")
            .map_err(|e| RemoteError::Parse(format!("invalid project URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner { client, rest_url }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.inner
            .rest_url
            .join(path)
            .map_err(|e| RemoteError::Parse(format!("invalid path {path}: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }
}

/// Build a `reqwest` client that authenticates every request with the anon key.
pub(super) fn build_http_client(
    anon_key: &SecretString,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, RemoteError> {
    let key = anon_key.expose_secret();
    let mut headers = HeaderMap::new();

    let mut api_key = HeaderValue::from_str(key)
        .map_err(|_| RemoteError::Parse("anon key is not a valid header value".to_string()))?;
    api_key.set_sensitive(true);
    headers.insert(API_KEY_HEADER, api_key);

    let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|_| RemoteError::Parse("anon key is not a valid header value".to_string()))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_query_pair).collect()
}

/// Extract the total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl DataBackend for SupabaseClient {
    #[instrument(skip(self), fields(table = %query.table))]
    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        let url = self.endpoint(&query.table)?;
        let response = self
            .send(self.inner.client.get(url).query(&query.to_query_pairs()))
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, filters))]
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, RemoteError> {
        let url = self.endpoint(table)?;
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_pairs(filters));

        let response = self
            .send(
                self.inner
                    .client
                    .head(url)
                    .query(&params)
                    .header("Prefer", "count=exact"),
            )
            .await?;

        let header = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RemoteError::Parse("missing Content-Range header".to_string()))?;

        parse_content_range_total(header)
            .ok_or_else(|| RemoteError::Parse(format!("unexpected Content-Range: {header}")))
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        let url = self.endpoint(table)?;
        self.send(
            self.inner
                .client
                .post(url)
                .header("Prefer", "return=minimal")
                .json(&row),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, changes, filters))]
    async fn update(
        &self,
        table: &str,
        changes: Value,
        filters: &[Filter],
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(table)?;
        self.send(
            self.inner
                .client
                .patch(url)
                .query(&filter_pairs(filters))
                .header("Prefer", "return=minimal")
                .json(&changes),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, filters))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError> {
        let url = self.endpoint(table)?;
        self.send(self.inner.client.delete(url).query(&filter_pairs(filters)))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, args))]
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
        let url = self.endpoint(&format!("rpc/{function}"))?;
        let response = self.send(self.inner.client.post(url).json(&args)).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), RemoteError> {
        let url = self.endpoint("revenue")?;
        self.send(
            self.inner
                .client
                .get(url)
                .query(&[("select", "month"), ("limit", "1")]),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/15"), Some(15));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_rest_url_is_joined_under_project() {
        let key = SecretString::from("anon-key-value");
        let client =
            SupabaseClient::new(&Url::parse("https://abc.supabase.co").unwrap(), &key, None)
                .unwrap();
        assert_eq!(
            client.endpoint("invoices").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/invoices"
        );
        assert_eq!(
            client.endpoint("rpc/invoiceamounttotals").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/rpc/invoiceamounttotals"
        );
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = SecretString::from("super-secret-anon-key");
        let client =
            SupabaseClient::new(&Url::parse("https://abc.supabase.co").unwrap(), &key, None)
                .unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }
}
