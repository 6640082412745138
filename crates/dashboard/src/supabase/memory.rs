//! In-memory implementation of [`DataBackend`] for tests and local development.
//!
//! Tables are plain vectors of JSON objects. Reads understand the subset of
//! the REST select syntax the dashboard uses: column lists, one level of
//! embedded relations (`customers(name,email)` resolved through
//! `customer_id`), `eq` filters, ordering, limit and offset. The three
//! named procedures the dashboard calls are implemented over the same tables.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::{DataBackend, Direction, Filter, RemoteError, Select};

type Tables = HashMap<String, Vec<Value>>;

/// In-memory data backend.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryBackend {
    /// Create a backend with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding the given tables.
    #[must_use]
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(|(name, rows)| (name.into(), rows))
            .collect();
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Create a backend holding the placeholder customers, invoices and revenue.
    #[must_use]
    pub fn seeded() -> Self {
        Self::with_tables(crate::seed::placeholder().tables())
    }

    /// Snapshot of a table's rows, empty if the table does not exist.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

fn lock_error<T>(_: PoisonError<T>) -> RemoteError {
    RemoteError::Api {
        status: 500,
        message: "memory backend lock poisoned".to_string(),
    }
}

fn missing_table(table: &str) -> RemoteError {
    RemoteError::Api {
        status: 404,
        message: format!("relation \"public.{table}\" does not exist"),
    }
}

/// Text form of a scalar, matching how the REST API compares `eq` filters.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq { column, value } => row.get(column).is_some_and(|v| value_text(v) == *value),
    })
}

/// Postgres ordering: numbers numerically, text lexically, nulls greatest.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => value_text(a).cmp(&value_text(b)),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Column {
    All,
    Field(String),
    Embed { relation: String, columns: Vec<Self> },
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn parse_columns(list: &str) -> Vec<Column> {
    split_top_level(list)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match (part.find('('), part.rfind(')')) {
            (Some(open), Some(close)) if close > open => Column::Embed {
                relation: part[..open].trim().to_string(),
                columns: parse_columns(&part[open + 1..close]),
            },
            _ if part == "*" => Column::All,
            _ => Column::Field(part.to_string()),
        })
        .collect()
}

/// `customers` -> `customer`, `categories` -> `category`.
fn singular(relation: &str) -> String {
    if let Some(stem) = relation.strip_suffix("ies") {
        format!("{stem}y")
    } else {
        relation.strip_suffix('s').unwrap_or(relation).to_string()
    }
}

fn project(row: &Value, columns: &[Column], tables: &Tables) -> Value {
    let mut out = Map::new();
    for column in columns {
        match column {
            Column::All => {
                if let Some(object) = row.as_object() {
                    out.extend(object.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            Column::Field(name) => {
                out.insert(name.clone(), row.get(name).cloned().unwrap_or(Value::Null));
            }
            Column::Embed { relation, columns } => {
                let key = format!("{}_id", singular(relation));
                let related = row.get(&key).and_then(|fk| {
                    tables.get(relation).and_then(|rows| {
                        rows.iter().find(|candidate| {
                            candidate
                                .get("id")
                                .is_some_and(|id| value_text(id) == value_text(fk))
                        })
                    })
                });
                let value = related.map_or(Value::Null, |r| project(r, columns, tables));
                out.insert(relation.clone(), value);
            }
        }
    }
    Value::Object(out)
}

/// Case-insensitive SQL `LIKE` with `%` and `_` wildcards.
///
/// Greedy matching that only ever retries from the most recent `%`, so the
/// cost stays linear in `text.len() * pattern.len()` however many `%` the
/// pattern holds.
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut t, mut p) = (0, 0);
    // Last `%` seen and the text position it currently stretches to.
    let mut resume: Option<(usize, usize)> = None;

    while let Some(&ch) = text.get(t) {
        match pattern.get(p) {
            Some('%') => {
                resume = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == ch => {
                t += 1;
                p += 1;
            }
            _ => match resume {
                Some((wildcard, stretch)) => {
                    resume = Some((wildcard, stretch + 1));
                    p = wildcard + 1;
                    t = stretch + 1;
                }
                None => return false,
            },
        }
    }

    pattern.iter().skip(p).all(|&c| c == '%')
}

fn arg_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, RemoteError> {
    args.get(name).and_then(Value::as_str).ok_or_else(|| RemoteError::Api {
        status: 400,
        message: format!("missing argument {name}"),
    })
}

fn arg_usize(args: &Value, name: &str) -> Result<usize, RemoteError> {
    args.get(name)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| RemoteError::Api {
            status: 400,
            message: format!("missing argument {name}"),
        })
}

/// Invoices joined with their customer, flattened like the search procedure returns them.
fn joined_invoices(tables: &Tables) -> Vec<Value> {
    let customers = tables.get("customers").map(Vec::as_slice).unwrap_or_default();
    tables
        .get("invoices")
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|invoice| {
            let customer_id = invoice.get("customer_id")?;
            let customer = customers.iter().find(|c| {
                c.get("id")
                    .is_some_and(|id| value_text(id) == value_text(customer_id))
            })?;
            Some(json!({
                "id": invoice.get("id"),
                "customer_id": customer_id,
                "amount": invoice.get("amount"),
                "invoice_date": invoice.get("invoice_date"),
                "status": invoice.get("status"),
                "name": customer.get("name"),
                "email": customer.get("email"),
                "image_url": customer.get("image_url"),
            }))
        })
        .collect()
}

fn search_matches(row: &Value, pattern: &str) -> bool {
    ["name", "email", "amount", "invoice_date", "status"]
        .iter()
        .filter_map(|column| row.get(*column))
        .any(|value| ilike(&value_text(value), pattern))
}

fn invoice_amount_totals(tables: &Tables) -> Value {
    let invoices = tables.get("invoices").map(Vec::as_slice).unwrap_or_default();
    if invoices.is_empty() {
        return json!([{ "paid": null, "pending": null }]);
    }
    let total = |status: &str| -> i64 {
        invoices
            .iter()
            .filter(|i| i.get("status").and_then(Value::as_str) == Some(status))
            .filter_map(|i| i.get("amount").and_then(Value::as_i64))
            .sum()
    };
    json!([{ "paid": total("paid"), "pending": total("pending") }])
}

fn filtered_invoices(tables: &Tables, args: &Value) -> Result<Value, RemoteError> {
    let pattern = arg_str(args, "query")?;
    let limit = arg_usize(args, "items_per_page")?;
    let offset = arg_usize(args, "offset1")?;

    let mut rows: Vec<Value> = joined_invoices(tables)
        .into_iter()
        .filter(|row| search_matches(row, pattern))
        .collect();
    rows.sort_by(|a, b| {
        compare_values(
            a.get("invoice_date").unwrap_or(&Value::Null),
            b.get("invoice_date").unwrap_or(&Value::Null),
        )
        .reverse()
    });
    Ok(Value::Array(
        rows.into_iter().skip(offset).take(limit).collect(),
    ))
}

fn filtered_invoices_count(tables: &Tables, args: &Value) -> Result<Value, RemoteError> {
    let pattern = format!("%{}%", arg_str(args, "query")?);
    let count = joined_invoices(tables)
        .iter()
        .filter(|row| search_matches(row, &pattern))
        .count();
    Ok(json!(count))
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        let tables = self.tables.read().map_err(lock_error)?;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| missing_table(&query.table))?;

        let mut selected: Vec<&Value> = rows.iter().filter(|r| matches(r, &query.filters)).collect();

        if let Some((column, direction)) = &query.order {
            selected.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let columns = parse_columns(&query.columns);
        Ok(selected
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| project(row, &columns, &tables))
            .collect())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, RemoteError> {
        let tables = self.tables.read().map_err(lock_error)?;
        let rows = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows.iter().filter(|r| matches(r, filters)).count() as u64)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        let Value::Object(mut object) = row else {
            return Err(RemoteError::Api {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        let mut tables = self.tables.write().map_err(lock_error)?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(Value::Object(object));
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        changes: Value,
        filters: &[Filter],
    ) -> Result<(), RemoteError> {
        let Value::Object(changes) = changes else {
            return Err(RemoteError::Api {
                status: 400,
                message: "changes must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().map_err(lock_error)?;
        let rows = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        for row in rows.iter_mut().filter(|r| matches(r, filters)) {
            if let Some(object) = row.as_object_mut() {
                object.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError> {
        let mut tables = self.tables.write().map_err(lock_error)?;
        let rows = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        rows.retain(|r| !matches(r, filters));
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
        let tables = self.tables.read().map_err(lock_error)?;
        match function {
            "invoiceamounttotals" => Ok(invoice_amount_totals(&tables)),
            "fetch_filtered_invoices5" => filtered_invoices(&tables, &args),
            "fetch_filtered_invoices_count" => filtered_invoices_count(&tables, &args),
            _ => Err(RemoteError::Api {
                status: 404,
                message: format!("Could not find the function public.{function}"),
            }),
        }
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        self.tables.read().map(|_| ()).map_err(lock_error)
    }
}
