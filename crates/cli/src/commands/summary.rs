//! Print the figures shown on the dashboard cards.

use std::sync::Arc;

use invoicer_dashboard::config::SupabaseConfig;
use invoicer_dashboard::data::{CardData, Data};
use invoicer_dashboard::supabase::{DataBackend, MemoryBackend, SupabaseClient};

/// Card figures plus, optionally, the page count for a search.
#[derive(Debug)]
pub struct Summary {
    pub cards: CardData,
    pub pages: Option<(String, u64)>,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Invoices:   {}", self.cards.number_of_invoices)?;
        writeln!(f, "Customers:  {}", self.cards.number_of_customers)?;
        writeln!(f, "Collected:  {}", self.cards.total_paid_invoices)?;
        write!(f, "Pending:    {}", self.cards.total_pending_invoices)?;
        if let Some((query, pages)) = &self.pages {
            write!(f, "\nPages for {query:?}: {pages}")?;
        }
        Ok(())
    }
}

/// Collect the summary through the data-access layer.
///
/// # Errors
///
/// Returns the data layer's error if any read fails.
pub async fn collect(
    backend: Arc<dyn DataBackend>,
    query: Option<&str>,
) -> Result<Summary, Box<dyn std::error::Error>> {
    let data = Data::new(backend);
    let cards = data.fetch_card_data().await?;
    let pages = match query {
        Some(q) => Some((q.to_string(), data.fetch_invoices_pages(q).await?)),
        None => None,
    };
    Ok(Summary { cards, pages })
}

/// Print the summary for the configured backend.
///
/// # Errors
///
/// Returns an error if configuration is missing or a remote read fails.
#[allow(clippy::print_stdout)]
pub async fn print(memory: bool, query: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let backend: Arc<dyn DataBackend> = if memory {
        Arc::new(MemoryBackend::seeded())
    } else {
        let config = SupabaseConfig::from_env()?;
        Arc::new(SupabaseClient::new(
            &config.url,
            &config.anon_key,
            config.timeout,
        )?)
    };

    let summary = collect(backend, query).await?;
    println!("{summary}");
    Ok(())
}
