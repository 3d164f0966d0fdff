//! Bramble CLI - Database migrations and catalog management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bramble migrate store
//!
//! # Run product catalog migrations
//! bramble migrate catalog
//!
//! # Run all database migrations
//! bramble migrate all
//!
//! # Load products into the catalog
//! bramble seed catalog crates/cli/seed/products.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bramble")]
#[command(author, version, about = "Bramble CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations (users, carts, orders, sessions)
    Store,
    /// Run product catalog migrations
    Catalog,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert products from a YAML file into the catalog
    Catalog {
        /// Path to the YAML product list
        file: String,

        /// Delete every existing product first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Store => commands::migrate::store().await?,
            MigrateTarget::Catalog => commands::migrate::catalog().await?,
            MigrateTarget::All => {
                commands::migrate::store().await?;
                commands::migrate::catalog().await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, clear } => commands::seed::catalog(&file, clear).await?,
        },
    }
    Ok(())
}
