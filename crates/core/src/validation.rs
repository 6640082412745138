//! Invoice form schema.
//!
//! Create and update share one schema: both accept a customer, an amount in
//! major units, and a status. Ids and dates are never taken from the form;
//! the id comes from the route and the date is stamped on creation.
//!
//! Validation collects every failing field before returning, so a form can
//! show all of its problems at once.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, InvoiceStatus, Money};

/// Field name for the customer select.
pub const FIELD_CUSTOMER_ID: &str = "customer_id";
/// Field name for the amount input.
pub const FIELD_AMOUNT: &str = "amount";
/// Field name for the status radio group.
pub const FIELD_STATUS: &str = "status";

const CUSTOMER_MESSAGE: &str = "Please select a customer.";
const AMOUNT_MESSAGE: &str = "Please enter an amount greater than $0.";
const STATUS_MESSAGE: &str = "Please select an invoice status.";

/// Field-level validation errors, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Messages for a field, empty if the field is valid.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Whether a field has at least one message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Whether no field has any message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, messages)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Raw invoice form input, exactly as submitted.
///
/// Every field is optional so that a missing field is reported as a field
/// error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInput {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Invoice fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidInvoice {
    pub customer_id: CustomerId,
    /// Amount already converted to minor units.
    pub amount: Money,
    pub status: InvoiceStatus,
}

/// The invoice schema.
///
/// - `customer_id`: non-empty string
/// - `amount`: coercible to a number, strictly greater than zero
/// - `status`: one of `pending`, `paid`
pub struct InvoiceSchema;

impl InvoiceSchema {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns every field that failed, with user-facing messages.
    pub fn validate(input: &InvoiceInput) -> Result<ValidInvoice, FieldErrors> {
        let mut errors = FieldErrors::new();

        let customer_id = match input.customer_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(CustomerId::new(id)),
            _ => {
                errors.add(FIELD_CUSTOMER_ID, CUSTOMER_MESSAGE);
                None
            }
        };

        let amount = match coerce_amount(input.amount.as_deref()) {
            Some(amount) => Some(amount),
            None => {
                errors.add(FIELD_AMOUNT, AMOUNT_MESSAGE);
                None
            }
        };

        let status = match input.status.as_deref().map(InvoiceStatus::from_str) {
            Some(Ok(status)) => Some(status),
            _ => {
                errors.add(FIELD_STATUS, STATUS_MESSAGE);
                None
            }
        };

        match (customer_id, amount, status) {
            (Some(customer_id), Some(amount), Some(status)) => Ok(ValidInvoice {
                customer_id,
                amount,
                status,
            }),
            _ => Err(errors),
        }
    }
}

/// Coerce the amount field to positive minor units.
///
/// Accepts plain decimals (`"49.99"`) and scientific notation (`"1e2"`).
/// Blank input coerces to zero and is therefore rejected, as is anything that
/// rounds to zero cents.
fn coerce_amount(raw: Option<&str>) -> Option<Money> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()?;
    if value <= Decimal::ZERO {
        return None;
    }
    Money::from_major(value).ok().filter(Money::is_positive)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(customer: Option<&str>, amount: Option<&str>, status: Option<&str>) -> InvoiceInput {
        InvoiceInput {
            customer_id: customer.map(str::to_owned),
            amount: amount.map(str::to_owned),
            status: status.map(str::to_owned),
        }
    }

    #[test]
    fn test_valid_input_converts_amount_to_cents() {
        let valid =
            InvoiceSchema::validate(&input(Some("c1"), Some("49.99"), Some("pending"))).unwrap();
        assert_eq!(valid.customer_id, CustomerId::new("c1"));
        assert_eq!(valid.amount.cents(), 4999);
        assert_eq!(valid.status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_amount_is_rounded_to_nearest_cent() {
        let valid =
            InvoiceSchema::validate(&input(Some("c1"), Some("10.125"), Some("paid"))).unwrap();
        assert_eq!(valid.amount.cents(), 1013);
    }

    #[test]
    fn test_amount_accepts_scientific_notation() {
        let valid = InvoiceSchema::validate(&input(Some("c1"), Some("1e2"), Some("paid"))).unwrap();
        assert_eq!(valid.amount.cents(), 10_000);
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let errors =
            InvoiceSchema::validate(&input(Some("c1"), Some("-5"), Some("pending"))).unwrap_err();
        assert_eq!(errors.get(FIELD_AMOUNT), [AMOUNT_MESSAGE.to_string()]);
        assert!(!errors.has(FIELD_CUSTOMER_ID));
        assert!(!errors.has(FIELD_STATUS));
    }

    #[test]
    fn test_zero_blank_and_garbage_amounts_are_rejected() {
        for amount in [Some("0"), Some(""), Some("  "), Some("abc"), Some("0.001"), None] {
            let errors =
                InvoiceSchema::validate(&input(Some("c1"), amount, Some("paid"))).unwrap_err();
            assert!(errors.has(FIELD_AMOUNT), "{amount:?}");
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let errors =
            InvoiceSchema::validate(&input(Some("c1"), Some("10"), Some("overdue"))).unwrap_err();
        assert_eq!(errors.get(FIELD_STATUS), [STATUS_MESSAGE.to_string()]);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = InvoiceSchema::validate(&InvoiceInput::default()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec![FIELD_AMOUNT, FIELD_CUSTOMER_ID, FIELD_STATUS]);
    }

    #[test]
    fn test_blank_customer_is_rejected() {
        let errors =
            InvoiceSchema::validate(&input(Some("  "), Some("10"), Some("paid"))).unwrap_err();
        assert_eq!(errors.get(FIELD_CUSTOMER_ID), [CUSTOMER_MESSAGE.to_string()]);
    }

    #[test]
    fn test_input_deserializes_with_missing_fields() {
        let parsed: InvoiceInput = serde_json::from_str(r#"{"amount":"12"}"#).unwrap();
        assert_eq!(parsed, input(None, Some("12"), None));
    }
}
