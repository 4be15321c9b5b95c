//! Subcommand implementations.

pub mod deliveries;
pub mod migrate;
pub mod seed;
pub mod user;

use sqlx::PgPool;
use thiserror::Error;

use loomi_api::config::{ConfigError, get_database_url};
use loomi_api::db::RepositoryError;
use loomi_api::services::auth::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Cannot read seed file {path}: {source}")]
    SeedFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    SeedFormat(#[from] serde_yaml::Error),

    #[error("Seed file has dangling references:\n  {}", .0.join("\n  "))]
    DanglingReferences(Vec<String>),

    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    #[error("Cannot create user: {0}")]
    User(#[from] AuthError),
}

/// Connect to the database named by `LOOMI_DATABASE_URL` (or `DATABASE_URL`).
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("LOOMI_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(loomi_api::db::create_pool(&database_url).await?)
}
