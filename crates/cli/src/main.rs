//! Invoicer CLI - Seeding and inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Load the placeholder customers, invoices, revenue and user
//! inv-cli seed
//!
//! # Seed data only, without creating the placeholder account
//! inv-cli seed --skip-user
//!
//! # Print the dashboard card figures
//! inv-cli summary
//!
//! # Same, against the seeded in-memory backend
//! inv-cli summary --memory
//! ```
//!
//! # Commands
//!
//! - `seed` - Insert placeholder data into the remote database
//! - `summary` - Print invoice/customer counts and paid/pending totals

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "inv-cli")]
#[command(author, version, about = "Invoicer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the remote database with placeholder data
    Seed {
        /// Don't register the placeholder user
        #[arg(long)]
        skip_user: bool,
    },
    /// Print the dashboard summary figures
    Summary {
        /// Use the seeded in-memory backend instead of Supabase
        #[arg(long)]
        memory: bool,

        /// Also count invoice pages matching this search
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { skip_user } => {
            commands::seed::placeholder(skip_user).await?;
        }
        Commands::Summary { memory, query } => {
            commands::summary::print(memory, query.as_deref()).await?;
        }
    }
    Ok(())
}
