//! Rows returned by the data-access layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoicer_core::{CustomerId, InvoiceId, InvoiceStatus, Money};

/// Revenue for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revenue {
    pub month: String,
    /// Whole dollars.
    pub revenue: i64,
}

/// A recent invoice with its customer, amount already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestInvoice {
    pub id: InvoiceId,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: String,
}

/// Summary figures for the overview cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardData {
    pub number_of_invoices: u64,
    pub number_of_customers: u64,
    pub total_paid_invoices: String,
    pub total_pending_invoices: String,
}

/// One row of the searchable invoice table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredInvoice {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub invoice_date: NaiveDate,
    pub amount: String,
    pub status: InvoiceStatus,
}

/// Invoice values used to pre-fill the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceForm {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    /// Major units, e.g. `49.99`.
    pub amount: Decimal,
    pub status: InvoiceStatus,
}

/// A customer option for the invoice form select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerField {
    pub id: CustomerId,
    pub name: String,
}

// -----------------------------------------------------------------------------
// Wire rows
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct LatestInvoiceRow {
    pub id: InvoiceId,
    pub amount: Money,
    pub customers: Option<EmbeddedCustomer>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct EmbeddedCustomer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: String,
}

impl From<LatestInvoiceRow> for LatestInvoice {
    fn from(row: LatestInvoiceRow) -> Self {
        let customer = row.customers.unwrap_or_default();
        Self {
            id: row.id,
            name: customer.name,
            email: customer.email,
            image_url: customer.image_url,
            amount: row.amount.format_usd(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FilteredInvoiceRow {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub invoice_date: NaiveDate,
    pub amount: Money,
    pub status: InvoiceStatus,
}

impl From<FilteredInvoiceRow> for FilteredInvoice {
    fn from(row: FilteredInvoiceRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            name: row.name,
            email: row.email,
            image_url: row.image_url,
            invoice_date: row.invoice_date,
            amount: row.amount.format_usd(),
            status: row.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InvoiceRow {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub status: InvoiceStatus,
}

impl From<InvoiceRow> for InvoiceForm {
    fn from(row: InvoiceRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            amount: row.amount.to_major(),
            status: row.status,
        }
    }
}

/// One row of the `invoiceamounttotals` procedure. Sums over an empty table are null.
#[derive(Debug, Default, Deserialize)]
pub(super) struct AmountTotals {
    #[serde(default, deserialize_with = "lenient_cents")]
    pub paid: Option<i64>,
    #[serde(default, deserialize_with = "lenient_cents")]
    pub pending: Option<i64>,
}

/// Aggregates over `bigint` columns may come back as JSON numbers or as numeric strings.
fn lenient_cents<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("amount out of range: {n}"))),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid amount: {s}"))),
        Some(other) => Err(D::Error::custom(format!("invalid amount: {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_invoice_formats_amount_and_flattens_customer() {
        let row: LatestInvoiceRow = serde_json::from_value(json!({
            "id": "i1",
            "amount": 15795,
            "customers": {"name": "Evil Rabbit", "email": "evil@rabbit.com", "image_url": "/customers/evil-rabbit.png"}
        }))
        .unwrap();
        let invoice = LatestInvoice::from(row);
        assert_eq!(invoice.amount, "$157.95");
        assert_eq!(invoice.name, "Evil Rabbit");
    }

    #[test]
    fn test_invoice_form_uses_major_units() {
        let row: InvoiceRow = serde_json::from_value(json!({
            "id": "i1", "customer_id": "c1", "amount": 4999, "status": "pending"
        }))
        .unwrap();
        assert_eq!(InvoiceForm::from(row).amount, "49.99".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_amount_totals_accept_nulls_numbers_and_strings() {
        let empty: AmountTotals =
            serde_json::from_value(json!({"paid": null, "pending": null})).unwrap();
        assert_eq!((empty.paid, empty.pending), (None, None));

        let mixed: AmountTotals =
            serde_json::from_value(json!({"paid": 3040, "pending": "36143"})).unwrap();
        assert_eq!((mixed.paid, mixed.pending), (Some(3040), Some(36143)));
    }
}
