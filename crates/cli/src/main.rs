//! Loomi CLI - database migrations, catalog seeding and maintenance jobs.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! loomi-cli migrate
//!
//! # Upsert the catalog from YAML
//! loomi-cli seed --file data/seed.yaml
//!
//! # Create an admin account
//! loomi-cli user create -e admin@loomi.fr -f Ada -l Lovelace -p 'a long password' -r admin
//!
//! # Record due subscription deliveries (or only report them)
//! loomi-cli process-deliveries --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `LOOMI_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loomi-cli")]
#[command(author, version, about = "Loomi CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert the catalog from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "data/seed.yaml")]
        file: PathBuf,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Record due subscription deliveries
    ProcessDeliveries {
        /// Only report what would be recorded
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Password (min 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`user`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                first_name,
                last_name,
                password,
                role,
            } => {
                commands::user::create(&email, &first_name, &last_name, password, &role).await?;
            }
        },
        Commands::ProcessDeliveries { dry_run } => commands::deliveries::run(dry_run).await?,
    }
    Ok(())
}
