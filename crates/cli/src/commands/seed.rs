//! Seed the remote database with placeholder data.
//!
//! Rows are inserted one at a time so a row that already exists (a conflict
//! on its primary key) is skipped without aborting the rest. Customers keep
//! fixed ids across runs; invoices get fresh ids, so a second run adds a
//! second copy of each invoice.
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Project URL
//! - `SUPABASE_ANON_KEY` - Project anon key

use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use invoicer_core::{Email, EmailError};
use invoicer_dashboard::config::{ConfigError, SupabaseConfig};
use invoicer_dashboard::seed::{self, PLACEHOLDER_USER};
use invoicer_dashboard::supabase::{
    AuthError, AuthProvider, DataBackend, Registration, RemoteError, SupabaseAuth,
    SupabaseClient,
};

/// HTTP status the REST API uses for a duplicate key.
const CONFLICT: u16 = 409;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Configuration missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote data service failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Auth service failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Placeholder email failed validation.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Rows written and skipped for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert every placeholder row through `backend`.
///
/// # Errors
///
/// Returns the first remote error other than a duplicate-key conflict.
pub async fn seed_tables(backend: &dyn DataBackend) -> Result<Vec<TableReport>, RemoteError> {
    let mut reports = Vec::new();

    for (table, rows) in seed::placeholder().tables() {
        let mut report = TableReport {
            table,
            inserted: 0,
            skipped: 0,
        };
        for row in rows {
            if insert_row(backend, table, row).await? {
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }
        info!(
            table,
            inserted = report.inserted,
            skipped = report.skipped,
            "Seeded table"
        );
        reports.push(report);
    }

    Ok(reports)
}

/// Insert one row. Returns `false` when the row already exists.
async fn insert_row(
    backend: &dyn DataBackend,
    table: &str,
    row: Value,
) -> Result<bool, RemoteError> {
    match backend.insert(table, row).await {
        Ok(()) => Ok(true),
        Err(RemoteError::Api { status, message }) if status == CONFLICT => {
            warn!(table, %message, "Row already exists, skipping");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Register the placeholder account with the auth service.
///
/// An account that already exists is reported and left alone.
async fn seed_user(auth: &dyn AuthProvider) -> Result<(), SeedError> {
    let registration = Registration {
        name: PLACEHOLDER_USER.name.to_string(),
        email: Email::parse(PLACEHOLDER_USER.email)?,
        password: SecretString::from(PLACEHOLDER_USER.password),
    };

    match auth.sign_up(&registration).await {
        Ok(()) => {
            info!(email = PLACEHOLDER_USER.email, "Placeholder user registered");
            Ok(())
        }
        Err(AuthError::Rejected(reason)) => {
            warn!(%reason, "Placeholder user not registered");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Seed the configured Supabase project.
///
/// # Errors
///
/// Returns `SeedError` if configuration is missing or a remote call fails.
pub async fn placeholder(skip_user: bool) -> Result<(), SeedError> {
    let config = SupabaseConfig::from_env()?;

    info!(url = %config.url, "Seeding remote database...");
    let client = SupabaseClient::new(&config.url, &config.anon_key, config.timeout)?;
    let reports = seed_tables(&client).await?;

    if !skip_user {
        let auth = SupabaseAuth::new(&config.url, &config.anon_key, config.timeout)?;
        seed_user(&auth).await?;
    }

    let inserted: usize = reports.iter().map(|r| r.inserted).sum();
    info!(inserted, "Database seeded successfully");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use invoicer_dashboard::supabase::{Credentials, MemoryAuth, MemoryBackend};

    use super::*;

    #[tokio::test]
    async fn test_seed_tables_fills_empty_backend() {
        let backend = MemoryBackend::new();
        let reports = seed_tables(&backend).await.unwrap();

        let counts: Vec<_> = reports.iter().map(|r| (r.table, r.inserted)).collect();
        assert_eq!(
            counts,
            vec![("customers", 6), ("invoices", 13), ("revenue", 12)]
        );
        assert!(reports.iter().all(|r| r.skipped == 0));
        assert_eq!(backend.rows("invoices").len(), 13);
    }

    #[tokio::test]
    async fn test_seed_user_registers_once() {
        let auth = MemoryAuth::new();
        seed_user(&auth).await.unwrap();
        // Already registered: reported, not an error
        seed_user(&auth).await.unwrap();

        let session = auth
            .sign_in(&Credentials {
                email: Email::parse(PLACEHOLDER_USER.email).unwrap(),
                password: SecretString::from(PLACEHOLDER_USER.password),
            })
            .await
            .unwrap();
        assert_eq!(session.email.as_str(), PLACEHOLDER_USER.email);
    }
}
