//! Swag CLI - Database migrations and campaign seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! swag-cli migrate
//!
//! # Create a one-hour, 1200-cent campaign starting now
//! swag-cli seed campaign --price 1200 --duration-minutes 60
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed campaign` - Create a campaign

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "swag-cli")]
#[command(author, version, about = "Swag CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Debug, Subcommand)]
enum SeedTarget {
    /// Create a campaign
    Campaign {
        /// Price in cents
        #[arg(long, default_value_t = 1200)]
        price: i64,

        /// How long the campaign runs, in minutes
        #[arg(long, default_value_t = 60)]
        duration_minutes: i64,

        /// Minutes from now until the campaign starts (negative for the past)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        starts_in_minutes: i64,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "swag_cli=info,swag_storefront=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Campaign {
                price,
                duration_minutes,
                starts_in_minutes,
            } => commands::seed::campaign(price, duration_minutes, starts_in_minutes).await?,
        },
    }
    Ok(())
}
