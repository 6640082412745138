//! Invoice list and form routes.
//!
//! The list is the only page served from the render cache. Its entries are
//! keyed by path and query and dropped whenever an invoice action revalidates
//! [`INVOICES_PATH`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{OriginalUri, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use invoicer_core::{
    InvoiceId, InvoiceInput, InvoiceStatus,
    validation::{FIELD_AMOUNT, FIELD_CUSTOMER_ID, FIELD_STATUS},
};

use super::pagination::Pager;
use crate::{
    actions::{ActionOutcome, DELETE_FAILED, FormState, INVOICES_PATH},
    data::{CustomerField, FilteredInvoice, InvoiceForm},
    error::AppError,
    filters,
    middleware::RequireAuth,
    state::AppState,
};

/// Query string of the invoice list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<String>,
    pub error: Option<String>,
}

impl ListQuery {
    /// The requested page, 1 when absent or not a positive number.
    fn current_page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|&p| p >= 1)
            .unwrap_or(1)
    }

    fn notice(&self) -> Option<&'static str> {
        (self.error.as_deref() == Some("delete")).then_some(DELETE_FAILED)
    }
}

/// One row of the invoice table.
#[derive(Debug, Clone)]
pub struct InvoiceRowView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: String,
    pub date: String,
    pub status: InvoiceStatus,
}

impl From<FilteredInvoice> for InvoiceRowView {
    fn from(invoice: FilteredInvoice) -> Self {
        Self {
            id: invoice.id.into_inner(),
            name: invoice.name,
            email: invoice.email,
            image_url: invoice.image_url,
            amount: invoice.amount,
            date: filters::format_date(invoice.invoice_date),
            status: invoice.status,
        }
    }
}

/// Invoice list template.
#[derive(Template)]
#[template(path = "invoices/index.html")]
pub struct InvoicesTemplate {
    pub current_path: &'static str,
    pub query: String,
    pub invoices: Vec<InvoiceRowView>,
    pub pager: Pager,
    pub notice: Option<&'static str>,
}

/// Values shown in the invoice form inputs.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pub customer_id: String,
    pub amount: String,
    pub status: String,
}

impl From<&InvoiceInput> for FormValues {
    fn from(input: &InvoiceInput) -> Self {
        Self {
            customer_id: input.customer_id.clone().unwrap_or_default(),
            amount: input.amount.clone().unwrap_or_default(),
            status: input.status.clone().unwrap_or_default(),
        }
    }
}

impl From<&InvoiceForm> for FormValues {
    fn from(invoice: &InvoiceForm) -> Self {
        Self {
            customer_id: invoice.customer_id.as_str().to_string(),
            amount: invoice.amount.to_string(),
            status: invoice.status.as_str().to_string(),
        }
    }
}

/// An option of the customer select.
#[derive(Debug, Clone)]
pub struct CustomerOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// A status radio button.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Create and edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/form.html")]
pub struct InvoiceFormTemplate {
    pub current_path: &'static str,
    pub title: &'static str,
    pub action: String,
    pub customers: Vec<CustomerOption>,
    pub has_customer: bool,
    pub statuses: Vec<StatusOption>,
    pub amount: String,
    pub customer_errors: Vec<String>,
    pub amount_errors: Vec<String>,
    pub status_errors: Vec<String>,
    pub message: Option<String>,
}

impl InvoiceFormTemplate {
    fn create(customers: Vec<CustomerField>, values: FormValues, state: FormState) -> Self {
        Self::build("Create Invoice", INVOICES_PATH.to_string(), customers, values, state)
    }

    fn edit(
        id: &InvoiceId,
        customers: Vec<CustomerField>,
        values: FormValues,
        state: FormState,
    ) -> Self {
        Self::build(
            "Edit Invoice",
            format!("{INVOICES_PATH}/{}", id.as_str()),
            customers,
            values,
            state,
        )
    }

    fn build(
        title: &'static str,
        action: String,
        customers: Vec<CustomerField>,
        values: FormValues,
        state: FormState,
    ) -> Self {
        let customers: Vec<CustomerOption> = customers
            .into_iter()
            .map(|c| CustomerOption {
                selected: c.id.as_str() == values.customer_id,
                id: c.id.into_inner(),
                name: c.name,
            })
            .collect();
        let statuses = InvoiceStatus::ALL
            .iter()
            .map(|status| StatusOption {
                value: status.as_str(),
                label: status.label(),
                checked: status.as_str() == values.status,
            })
            .collect();

        Self {
            current_path: INVOICES_PATH,
            title,
            action,
            has_customer: customers.iter().any(|c| c.selected),
            customers,
            statuses,
            amount: values.amount,
            customer_errors: state.errors.get(FIELD_CUSTOMER_ID).to_vec(),
            amount_errors: state.errors.get(FIELD_AMOUNT).to_vec(),
            status_errors: state.errors.get(FIELD_STATUS).to_vec(),
            message: state.message,
        }
    }
}

// =============================================================================
// List
// =============================================================================

/// Searchable, paginated invoice list.
#[instrument(skip_all, fields(query = %params.query))]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let key = uri.to_string();
    let notice = params.notice();

    if notice.is_none()
        && let Some(html) = state.cache().get(&key).await
    {
        tracing::debug!(%key, "Render cache hit");
        return Ok(Html(html));
    }

    let generation = state.cache().generation();
    let current_page = params.current_page();
    let data = state.data();
    let (invoices, total_pages) = tokio::try_join!(
        data.fetch_filtered_invoices(&params.query, i64::try_from(current_page).unwrap_or(1)),
        data.fetch_invoices_pages(&params.query),
    )?;

    let template = InvoicesTemplate {
        current_path: INVOICES_PATH,
        pager: Pager::new(&params.query, current_page, total_pages),
        invoices: invoices.into_iter().map(InvoiceRowView::from).collect(),
        query: params.query,
        notice,
    };
    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("Template render error: {e}")))?;

    if notice.is_none() {
        state.cache().put(key, html.clone(), generation).await;
    }
    Ok(Html(html))
}

// =============================================================================
// Create
// =============================================================================

/// Empty create form.
#[instrument(skip_all)]
pub async fn create_page(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<InvoiceFormTemplate, AppError> {
    let customers = state.data().fetch_customers().await?;
    Ok(InvoiceFormTemplate::create(
        customers,
        FormValues::default(),
        FormState::default(),
    ))
}

/// Handle create form submission.
#[instrument(skip_all)]
pub async fn create(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Form(input): Form<InvoiceInput>,
) -> Result<Response, AppError> {
    match state.actions().create_invoice(&input).await {
        ActionOutcome::Redirect(to) => Ok(Redirect::to(&to).into_response()),
        ActionOutcome::Rejected(form_state) => {
            let customers = state.data().fetch_customers().await?;
            Ok(
                InvoiceFormTemplate::create(customers, FormValues::from(&input), form_state)
                    .into_response(),
            )
        }
    }
}

// =============================================================================
// Edit
// =============================================================================

/// Edit form pre-filled with the stored invoice.
#[instrument(skip_all, fields(id = %id))]
pub async fn edit_page(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<InvoiceFormTemplate, AppError> {
    let id = InvoiceId::new(id);
    let data = state.data();
    let (invoice, customers) =
        tokio::try_join!(data.fetch_invoice_by_id(&id), data.fetch_customers())?;

    let invoice = invoice.ok_or_else(|| AppError::NotFound(format!("invoice {id}")))?;
    Ok(InvoiceFormTemplate::edit(
        &id,
        customers,
        FormValues::from(&invoice),
        FormState::default(),
    ))
}

/// Handle edit form submission.
#[instrument(skip_all, fields(id = %id))]
pub async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<InvoiceInput>,
) -> Result<Response, AppError> {
    let id = InvoiceId::new(id);
    match state.actions().update_invoice(&id, &input).await {
        ActionOutcome::Redirect(to) => Ok(Redirect::to(&to).into_response()),
        ActionOutcome::Rejected(form_state) => {
            let customers = state.data().fetch_customers().await?;
            Ok(
                InvoiceFormTemplate::edit(&id, customers, FormValues::from(&input), form_state)
                    .into_response(),
            )
        }
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Delete an invoice and return to the list.
#[instrument(skip_all, fields(id = %id))]
pub async fn delete(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Redirect {
    let outcome = state.actions().delete_invoice(&InvoiceId::new(id)).await;
    if outcome.message.is_some() {
        Redirect::to(&format!("{INVOICES_PATH}?error=delete"))
    } else {
        Redirect::to(INVOICES_PATH)
    }
}
