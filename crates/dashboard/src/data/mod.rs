//! Data-access layer.
//!
//! One function per read the pages need. Every call reads current remote
//! state; nothing is cached here. Remote failures are logged and rewrapped
//! into a [`FetchError`] variant naming the operation that failed.

mod types;

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, instrument};

use invoicer_core::{InvoiceId, Money};

use crate::supabase::{DataBackend, Direction, RemoteError, Select, decode_rows};

pub use types::{CardData, CustomerField, FilteredInvoice, InvoiceForm, LatestInvoice, Revenue};
use types::{AmountTotals, FilteredInvoiceRow, InvoiceRow, LatestInvoiceRow};

/// Rows per page of the invoice table.
pub const ITEMS_PER_PAGE: usize = 6;

/// Months of revenue shown on the chart.
const REVENUE_MONTHS: usize = 12;

/// Invoices shown in the "latest" panel.
const LATEST_INVOICES: usize = 5;

/// Errors from the data-access layer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch revenue data.")]
    Revenue(#[source] RemoteError),

    #[error("Failed to fetch the latest invoices.")]
    LatestInvoices(#[source] RemoteError),

    #[error("Failed to fetch card data.")]
    CardData(#[source] RemoteError),

    #[error("Failed to fetch invoices.")]
    FilteredInvoices(#[source] RemoteError),

    #[error("Failed to fetch total number of invoices.")]
    InvoicePages(#[source] RemoteError),

    #[error("Failed to fetch invoice.")]
    Invoice(#[source] RemoteError),

    #[error("Failed to fetch all customers.")]
    Customers(#[source] RemoteError),
}

/// Read access to invoices, customers and revenue.
#[derive(Clone)]
pub struct Data {
    backend: Arc<dyn DataBackend>,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data").finish_non_exhaustive()
    }
}

/// Log a remote failure and wrap it.
fn fail(wrap: fn(RemoteError) -> FetchError) -> impl FnOnce(RemoteError) -> FetchError {
    move |err| {
        error!(error = %err, "Database Error");
        wrap(err)
    }
}

/// Parse a count returned by a procedure as a number or numeric string.
fn count_value(value: &Value) -> Result<u64, RemoteError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0),
        _ => None,
    }
    .ok_or_else(|| RemoteError::Parse(format!("unexpected count: {value}")))
}

/// Pages needed for `count` rows.
const fn total_pages(count: u64) -> u64 {
    count.div_ceil(ITEMS_PER_PAGE as u64)
}

impl Data {
    #[must_use]
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }

    /// Up to twelve months of revenue.
    ///
    /// # Errors
    ///
    /// [`FetchError::Revenue`] if the remote read fails.
    #[instrument(skip(self))]
    pub async fn fetch_revenue(&self) -> Result<Vec<Revenue>, FetchError> {
        let rows = self
            .backend
            .select(&Select::new("revenue").limit(REVENUE_MONTHS))
            .await
            .and_then(decode_rows)
            .map_err(fail(FetchError::Revenue))?;
        Ok(rows)
    }

    /// The five most recent invoices with customer details.
    ///
    /// # Errors
    ///
    /// [`FetchError::LatestInvoices`] if the remote read fails.
    #[instrument(skip(self))]
    pub async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>, FetchError> {
        let query = Select::new("invoices")
            .columns("id,amount,customers(name,email,image_url)")
            .order("invoice_date", Direction::Desc)
            .limit(LATEST_INVOICES);

        let rows: Vec<LatestInvoiceRow> = self
            .backend
            .select(&query)
            .await
            .and_then(decode_rows)
            .map_err(fail(FetchError::LatestInvoices))?;

        Ok(rows.into_iter().map(LatestInvoice::from).collect())
    }

    /// Invoice and customer counts plus paid/pending totals.
    ///
    /// The three remote calls run concurrently and all must succeed.
    ///
    /// # Errors
    ///
    /// [`FetchError::CardData`] if any of the three calls fails.
    #[instrument(skip(self))]
    pub async fn fetch_card_data(&self) -> Result<CardData, FetchError> {
        let invoices = self.backend.count("invoices", &[]);
        let customers = self.backend.count("customers", &[]);
        let totals = self.backend.rpc("invoiceamounttotals", json!({}));

        let (number_of_invoices, number_of_customers, totals) =
            tokio::try_join!(invoices, customers, totals).map_err(fail(FetchError::CardData))?;

        let totals: AmountTotals = match totals {
            Value::Array(rows) => rows.into_iter().next(),
            Value::Null => None,
            row => Some(row),
        }
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| fail(FetchError::CardData)(RemoteError::Decode(e)))?
        .unwrap_or_default();

        Ok(CardData {
            number_of_invoices,
            number_of_customers,
            total_paid_invoices: totals
                .paid
                .map_or_else(Money::zero, Money::from_cents)
                .format_usd(),
            total_pending_invoices: totals
                .pending
                .map_or_else(Money::zero, Money::from_cents)
                .format_usd(),
        })
    }

    /// One page of invoices whose customer name, email, amount, date or
    /// status contains `query` (case-insensitive).
    ///
    /// Pages are 1-based; anything below 1 is treated as page 1.
    ///
    /// # Errors
    ///
    /// [`FetchError::FilteredInvoices`] if the remote call fails.
    #[instrument(skip(self))]
    pub async fn fetch_filtered_invoices(
        &self,
        query: &str,
        current_page: i64,
    ) -> Result<Vec<FilteredInvoice>, FetchError> {
        let page = usize::try_from(current_page.max(1)).unwrap_or(1);
        let offset = (page - 1).saturating_mul(ITEMS_PER_PAGE);
        let args = json!({
            "query": format!("%{query}%"),
            "items_per_page": ITEMS_PER_PAGE,
            "offset1": offset,
        });

        let rows: Vec<FilteredInvoiceRow> = self
            .backend
            .rpc("fetch_filtered_invoices5", args)
            .await
            .and_then(|value| match value {
                Value::Null => Ok(Vec::new()),
                Value::Array(rows) => decode_rows(rows),
                other => Err(RemoteError::Parse(format!("expected rows, got {other}"))),
            })
            .map_err(fail(FetchError::FilteredInvoices))?;

        Ok(rows.into_iter().map(FilteredInvoice::from).collect())
    }

    /// Number of pages of invoices matching `query`.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvoicePages`] if the remote call fails.
    #[instrument(skip(self))]
    pub async fn fetch_invoices_pages(&self, query: &str) -> Result<u64, FetchError> {
        let count = self
            .backend
            .rpc("fetch_filtered_invoices_count", json!({ "query": query }))
            .await
            .and_then(|value| count_value(&value))
            .map_err(fail(FetchError::InvoicePages))?;
        Ok(total_pages(count))
    }

    /// A single invoice for the edit form, or `None` if no invoice has this id.
    ///
    /// # Errors
    ///
    /// [`FetchError::Invoice`] if the remote read fails.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn fetch_invoice_by_id(
        &self,
        id: &InvoiceId,
    ) -> Result<Option<InvoiceForm>, FetchError> {
        let query = Select::new("invoices")
            .columns("id,customer_id,amount,status")
            .eq("id", id.as_str());

        let rows: Vec<InvoiceRow> = self
            .backend
            .select(&query)
            .await
            .and_then(decode_rows)
            .map_err(fail(FetchError::Invoice))?;

        Ok(rows.into_iter().next().map(InvoiceForm::from))
    }

    /// Every customer, ordered by name.
    ///
    /// # Errors
    ///
    /// [`FetchError::Customers`] if the remote read fails.
    #[instrument(skip(self))]
    pub async fn fetch_customers(&self) -> Result<Vec<CustomerField>, FetchError> {
        let query = Select::new("customers")
            .columns("id,name")
            .order("name", Direction::Asc);

        self.backend
            .select(&query)
            .await
            .and_then(decode_rows)
            .map_err(fail(FetchError::Customers))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::supabase::{Filter, MemoryBackend};

    fn seeded() -> Data {
        Data::new(Arc::new(MemoryBackend::seeded()))
    }

    /// Backend whose every call fails.
    struct FailingBackend;

    fn down() -> RemoteError {
        RemoteError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[async_trait]
    impl DataBackend for FailingBackend {
        async fn select(&self, _: &Select) -> Result<Vec<Value>, RemoteError> {
            Err(down())
        }
        async fn count(&self, _: &str, _: &[Filter]) -> Result<u64, RemoteError> {
            Err(down())
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
            Err(down())
        }
        async fn ping(&self) -> Result<(), RemoteError> {
            Err(down())
        }
    }

    /// Backend that records RPC arguments and answers with fixed values.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, Value)>>,
        count: u64,
    }

    #[async_trait]
    impl DataBackend for RecordingBackend {
        async fn select(&self, _: &Select) -> Result<Vec<Value>, RemoteError> {
            Ok(Vec::new())
        }
        async fn count(&self, _: &str, _: &[Filter]) -> Result<u64, RemoteError> {
            Ok(0)
        }
        async fn insert(&self, _: &str, _: Value) -> Result<(), RemoteError> {
            Ok(())
        }
        async fn update(&self, _: &str, _: Value, _: &[Filter]) -> Result<(), RemoteError> {
            Ok(())
        }
        async fn delete(&self, _: &str, _: &[Filter]) -> Result<(), RemoteError> {
            Ok(())
        }
        async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
            self.calls.lock().unwrap().push((function.to_string(), args));
            if function == "fetch_filtered_invoices_count" {
                Ok(json!(self.count))
            } else {
                Ok(json!([]))
            }
        }
        async fn ping(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(6), 1);
        assert_eq!(total_pages(7), 2);
        assert_eq!(total_pages(13), 3);
    }

    #[test]
    fn test_count_value_shapes() {
        assert_eq!(count_value(&json!(13)).unwrap(), 13);
        assert_eq!(count_value(&json!("7")).unwrap(), 7);
        assert_eq!(count_value(&Value::Null).unwrap(), 0);
        assert!(count_value(&json!({"count": 1})).is_err());
    }

    #[tokio::test]
    async fn test_fetch_revenue_returns_twelve_months() {
        let revenue = seeded().fetch_revenue().await.unwrap();
        assert_eq!(revenue.len(), 12);
        assert_eq!(revenue[0].month, "Jan");
    }

    #[tokio::test]
    async fn test_fetch_latest_invoices_newest_first_and_formatted() {
        let latest = seeded().fetch_latest_invoices().await.unwrap();
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].name, "Michael Novotny");
        assert_eq!(latest[0].amount, "$448.00");
    }

    #[tokio::test]
    async fn test_fetch_latest_invoices_empty_table() {
        let data = Data::new(Arc::new(MemoryBackend::with_tables([
            ("invoices", Vec::new()),
            ("customers", Vec::new()),
        ])));
        assert!(data.fetch_latest_invoices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_card_data_counts_and_totals() {
        let cards = seeded().fetch_card_data().await.unwrap();
        assert_eq!(cards.number_of_invoices, 13);
        assert_eq!(cards.number_of_customers, 6);
        assert_eq!(cards.total_paid_invoices, "$1,006.26");
        assert_eq!(cards.total_pending_invoices, "$1,256.32");
    }

    #[tokio::test]
    async fn test_fetch_card_data_with_no_invoices_is_zero() {
        let data = Data::new(Arc::new(MemoryBackend::with_tables([
            ("invoices", Vec::new()),
            ("customers", Vec::new()),
        ])));
        let cards = data.fetch_card_data().await.unwrap();
        assert_eq!(cards.number_of_invoices, 0);
        assert_eq!(cards.total_paid_invoices, "$0.00");
        assert_eq!(cards.total_pending_invoices, "$0.00");
    }

    #[tokio::test]
    async fn test_fetch_card_data_with_empty_aggregate_is_zero() {
        let data = Data::new(Arc::new(RecordingBackend::default()));
        let cards = data.fetch_card_data().await.unwrap();
        assert_eq!(cards.total_paid_invoices, "$0.00");
    }

    #[tokio::test]
    async fn test_fetch_filtered_invoices_page_offsets() {
        let backend = Arc::new(RecordingBackend::default());
        let data = Data::new(backend.clone());

        data.fetch_filtered_invoices("lee", 3).await.unwrap();
        data.fetch_filtered_invoices("", 0).await.unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, "fetch_filtered_invoices5");
        assert_eq!(
            calls[0].1,
            json!({"query": "%lee%", "items_per_page": 6, "offset1": 12})
        );
        assert_eq!(calls[1].1["offset1"], 0);
    }

    #[tokio::test]
    async fn test_fetch_filtered_invoices_at_most_one_page() {
        let data = seeded();
        let first = data.fetch_filtered_invoices("", 1).await.unwrap();
        let third = data.fetch_filtered_invoices("", 3).await.unwrap();
        assert_eq!(first.len(), ITEMS_PER_PAGE);
        assert_eq!(third.len(), 1);
        assert!(first.iter().all(|i| i.amount.starts_with('$')));
    }

    #[tokio::test]
    async fn test_fetch_invoices_pages() {
        let data = seeded();
        assert_eq!(data.fetch_invoices_pages("").await.unwrap(), 3);
        assert_eq!(data.fetch_invoices_pages("zzz-no-match").await.unwrap(), 0);

        let backend = Arc::new(RecordingBackend {
            count: 7,
            ..RecordingBackend::default()
        });
        let data = Data::new(backend.clone());
        assert_eq!(data.fetch_invoices_pages("x").await.unwrap(), 2);
        assert_eq!(backend.calls.lock().unwrap()[0].1, json!({"query": "x"}));
    }

    #[tokio::test]
    async fn test_fetch_invoice_by_id_missing_is_none() {
        let invoice = seeded()
            .fetch_invoice_by_id(&InvoiceId::new("missing-id"))
            .await
            .unwrap();
        assert!(invoice.is_none());
    }

    #[tokio::test]
    async fn test_fetch_invoice_by_id_converts_to_major_units() {
        let backend = MemoryBackend::with_tables([(
            "invoices",
            vec![json!({"id": "i1", "customer_id": "c1", "amount": 4999, "status": "paid", "invoice_date": "2024-01-01"})],
        )]);
        let invoice = Data::new(Arc::new(backend))
            .fetch_invoice_by_id(&InvoiceId::new("i1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.amount.to_string(), "49.99");
        assert_eq!(invoice.status, invoicer_core::InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_fetch_customers_sorted_by_name() {
        let customers = seeded().fetch_customers().await.unwrap();
        let names: Vec<&str> = customers.iter().map(|c| c.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 6);
    }

    #[tokio::test]
    async fn test_remote_failures_map_to_operation_errors() {
        let data = Data::new(Arc::new(FailingBackend));
        assert!(matches!(data.fetch_revenue().await, Err(FetchError::Revenue(_))));
        assert!(matches!(
            data.fetch_latest_invoices().await,
            Err(FetchError::LatestInvoices(_))
        ));
        assert!(matches!(data.fetch_card_data().await, Err(FetchError::CardData(_))));
        assert!(matches!(
            data.fetch_filtered_invoices("", 1).await,
            Err(FetchError::FilteredInvoices(_))
        ));
        assert!(matches!(
            data.fetch_invoices_pages("").await,
            Err(FetchError::InvoicePages(_))
        ));
        assert!(matches!(
            data.fetch_invoice_by_id(&InvoiceId::new("x")).await,
            Err(FetchError::Invoice(_))
        ));
        assert!(matches!(data.fetch_customers().await, Err(FetchError::Customers(_))));
    }
}
