//! Database operations for the Loomi `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts with Argon2 password hashes and a role
//! - `box_categories`, `boxes`, `items`, `box_items`, `box_images` - Box catalog
//! - `subscription_types`, `gift_card_types`, `payment_method_types` - Other catalog entries
//! - `orders`, `box_orders`, `payment_methods` - Placed orders
//! - `subscriptions`, `subscription_deliveries` - Recurring boxes
//! - `gift_cards` - Purchased and redeemed gift cards
//! - `reviews` - Ratings of boxes and subscription types
//! - `articles` - Editorial content
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p loomi-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` rows), so
//! the workspace builds without a live database.

pub mod articles;
pub mod boxes;
pub mod deliveries;
pub mod gift_cards;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod subscriptions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use articles::ArticleRepository;
pub use boxes::BoxRepository;
pub use deliveries::DeliveryRepository;
pub use gift_cards::GiftCardRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;
pub use reviews::ReviewRepository;
pub use subscriptions::{SubscriptionRepository, SubscriptionTypeRepository};
pub use users::UserRepository;

/// Embedded schema migrations, applied by `loomi-cli migrate`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool that connects on first use and keeps no idle connections.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .min_connections(0)
        .connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}
