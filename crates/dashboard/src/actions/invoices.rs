//! Invoice create, update and delete.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use invoicer_core::{CustomerId, InvoiceId, InvoiceInput, InvoiceSchema, InvoiceStatus, Money};

use super::{ActionOutcome, Actions, DELETE_FAILED, DeleteOutcome, FormState, INVOICES_PATH};
use crate::cache::Scope;
use crate::supabase::Filter;

const TABLE: &str = "invoices";

#[derive(Debug, Serialize)]
struct NewInvoice {
    customer_id: CustomerId,
    amount: Money,
    status: InvoiceStatus,
    invoice_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct InvoiceChanges {
    customer_id: CustomerId,
    amount: Money,
    status: InvoiceStatus,
}

impl Actions {
    /// Validate and insert a new invoice dated today.
    #[instrument(skip(self, input))]
    pub async fn create_invoice(&self, input: &InvoiceInput) -> ActionOutcome {
        let valid = match InvoiceSchema::validate(input) {
            Ok(valid) => valid,
            Err(errors) => {
                return ActionOutcome::Rejected(FormState {
                    errors,
                    message: Some("Missing Fields. Failed to Create Invoice.".to_string()),
                });
            }
        };

        let row = NewInvoice {
            customer_id: valid.customer_id,
            amount: valid.amount,
            status: valid.status,
            invoice_date: Utc::now().date_naive(),
        };
        let row = match serde_json::to_value(&row) {
            Ok(row) => row,
            Err(e) => {
                error!(error = %e, "Failed to encode invoice");
                return ActionOutcome::Rejected(FormState::message(
                    "Database Error: Failed to Create Invoice.",
                ));
            }
        };

        if let Err(e) = self.backend.insert(TABLE, row).await {
            error!(error = %e, "Database Error: Failed to Create Invoice");
            return ActionOutcome::Rejected(FormState::message(
                "Database Error: Failed to Create Invoice.",
            ));
        }

        info!("Invoice created");
        self.cache.revalidate_path(INVOICES_PATH, Scope::Page).await;
        ActionOutcome::redirect(INVOICES_PATH)
    }

    /// Validate and apply new customer, amount and status to an invoice.
    ///
    /// The invoice date is never changed.
    #[instrument(skip(self, id, input), fields(id = %id))]
    pub async fn update_invoice(&self, id: &InvoiceId, input: &InvoiceInput) -> ActionOutcome {
        let valid = match InvoiceSchema::validate(input) {
            Ok(valid) => valid,
            Err(errors) => {
                return ActionOutcome::Rejected(FormState {
                    errors,
                    message: Some("Missing Fields. Failed to Update Invoice.".to_string()),
                });
            }
        };

        let changes = InvoiceChanges {
            customer_id: valid.customer_id,
            amount: valid.amount,
            status: valid.status,
        };
        let result = match serde_json::to_value(&changes) {
            Ok(changes) => {
                self.backend
                    .update(TABLE, changes, &[Filter::eq("id", id.as_str())])
                    .await
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            error!(error = %e, "Database Error: Failed to Update Invoice");
            return ActionOutcome::Rejected(FormState::message(
                "Database Error: Failed to Update Invoice.",
            ));
        }

        info!("Invoice updated");
        self.cache.revalidate_path(INVOICES_PATH, Scope::Page).await;
        ActionOutcome::redirect(INVOICES_PATH)
    }

    /// Delete an invoice by id. Deleting an id that does not exist succeeds.
    ///
    /// The invoice list is revalidated whether or not the delete succeeded.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn delete_invoice(&self, id: &InvoiceId) -> DeleteOutcome {
        let outcome = match self
            .backend
            .delete(TABLE, &[Filter::eq("id", id.as_str())])
            .await
        {
            Ok(()) => {
                info!("Invoice deleted");
                DeleteOutcome::default()
            }
            Err(e) => {
                error!(error = %e, "Database Error: Failed to Delete Invoice");
                DeleteOutcome {
                    message: Some(DELETE_FAILED.to_string()),
                }
            }
        };

        self.cache.revalidate_path(INVOICES_PATH, Scope::Page).await;
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use invoicer_core::validation::{FIELD_AMOUNT, FIELD_STATUS};

    use super::*;
    use crate::actions::doubles::{FailingWrites, RecordingCache};
    use crate::data::Data;
    use crate::supabase::{MemoryAuth, MemoryBackend};

    fn input(customer: &str, amount: &str, status: &str) -> InvoiceInput {
        InvoiceInput {
            customer_id: Some(customer.to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
        }
    }

    fn setup() -> (Actions, MemoryBackend, Arc<RecordingCache>) {
        let backend = MemoryBackend::with_tables([
            (
                "customers",
                vec![json!({"id": "c1", "name": "Lee Robinson", "email": "lee@robinson.com", "image_url": "/customers/lee-robinson.png"})],
            ),
            (
                "invoices",
                vec![
                    json!({"id": "i1", "customer_id": "c1", "amount": 1000, "status": "paid", "invoice_date": "2022-06-05"}),
                    json!({"id": "i2", "customer_id": "c1", "amount": 54246, "status": "pending", "invoice_date": "2023-07-16"}),
                ],
            ),
        ]);
        let cache = Arc::new(RecordingCache::default());
        let actions = Actions::new(
            Arc::new(backend.clone()),
            Arc::new(MemoryAuth::new()),
            cache.clone(),
        );
        (actions, backend, cache)
    }

    #[tokio::test]
    async fn test_create_stores_cents_and_today() {
        let (actions, backend, cache) = setup();

        let outcome = actions.create_invoice(&input("c1", "49.99", "pending")).await;
        assert_eq!(outcome, ActionOutcome::Redirect(INVOICES_PATH.to_string()));

        let stored = backend.rows("invoices").pop().unwrap();
        assert_eq!(stored["customer_id"], "c1");
        assert_eq!(stored["amount"], 4999);
        assert_eq!(stored["status"], "pending");
        assert_eq!(
            stored["invoice_date"],
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );
        assert_eq!(cache.calls(), vec![(INVOICES_PATH.to_string(), Scope::Page)]);

        let listed = Data::new(Arc::new(backend))
            .fetch_filtered_invoices("", 1)
            .await
            .unwrap();
        assert!(listed.iter().any(|i| i.amount == "$49.99"));
    }

    #[tokio::test]
    async fn test_create_with_negative_amount_inserts_nothing() {
        let (actions, backend, cache) = setup();

        let outcome = actions
            .create_invoice(&InvoiceInput {
                customer_id: None,
                amount: Some("-5".to_string()),
                status: Some("pending".to_string()),
            })
            .await;

        let ActionOutcome::Rejected(state) = outcome else {
            panic!("expected rejection");
        };
        assert!(state.errors.has(FIELD_AMOUNT));
        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to Create Invoice.")
        );
        assert_eq!(backend.rows("invoices").len(), 2);
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_unknown_status_is_rejected() {
        let (actions, backend, _) = setup();
        let outcome = actions.create_invoice(&input("c1", "10", "overdue")).await;
        let ActionOutcome::Rejected(state) = outcome else {
            panic!("expected rejection");
        };
        assert!(state.errors.has(FIELD_STATUS));
        assert_eq!(backend.rows("invoices").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_redirect_or_revalidate() {
        let cache = Arc::new(RecordingCache::default());
        let actions = Actions::new(
            Arc::new(FailingWrites),
            Arc::new(MemoryAuth::new()),
            cache.clone(),
        );

        let outcome = actions.create_invoice(&input("c1", "10", "paid")).await;
        assert_eq!(
            outcome,
            ActionOutcome::Rejected(FormState::message(
                "Database Error: Failed to Create Invoice."
            ))
        );
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_fields_but_not_date() {
        let (actions, backend, cache) = setup();

        let outcome = actions
            .update_invoice(&InvoiceId::new("i1"), &input("c1", "157.95", "pending"))
            .await;
        assert_eq!(outcome, ActionOutcome::Redirect(INVOICES_PATH.to_string()));

        let rows = backend.rows("invoices");
        assert_eq!(rows[0]["amount"], 15795);
        assert_eq!(rows[0]["status"], "pending");
        assert_eq!(rows[0]["invoice_date"], "2022-06-05");
        assert_eq!(rows[1]["amount"], 54246);
        assert_eq!(cache.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_validation_message() {
        let (actions, _, _) = setup();
        let outcome = actions
            .update_invoice(&InvoiceId::new("i1"), &InvoiceInput::default())
            .await;
        let ActionOutcome::Rejected(state) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to Update Invoice.")
        );
    }

    #[tokio::test]
    async fn test_failed_update_reports_database_error() {
        let cache = Arc::new(RecordingCache::default());
        let actions = Actions::new(
            Arc::new(FailingWrites),
            Arc::new(MemoryAuth::new()),
            cache.clone(),
        );
        let outcome = actions
            .update_invoice(&InvoiceId::new("i1"), &input("c1", "10", "paid"))
            .await;
        assert_eq!(
            outcome,
            ActionOutcome::Rejected(FormState::message(
                "Database Error: Failed to Update Invoice."
            ))
        );
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_twice_is_harmless() {
        let (actions, backend, cache) = setup();

        let first = actions.delete_invoice(&InvoiceId::new("i1")).await;
        let second = actions.delete_invoice(&InvoiceId::new("i1")).await;

        assert_eq!(first, DeleteOutcome::default());
        assert_eq!(second, DeleteOutcome::default());
        let rows = backend.rows("invoices");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "i2");
        assert_eq!(cache.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_still_revalidates() {
        let cache = Arc::new(RecordingCache::default());
        let actions = Actions::new(
            Arc::new(FailingWrites),
            Arc::new(MemoryAuth::new()),
            cache.clone(),
        );
        let outcome = actions.delete_invoice(&InvoiceId::new("i1")).await;
        assert_eq!(
            outcome.message.as_deref(),
            Some("Database Error: Failed to Delete Invoice.")
        );
        assert_eq!(cache.calls(), vec![(INVOICES_PATH.to_string(), Scope::Page)]);
    }
}
