//! State handed to every handler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::JwtKeys;

/// Configuration, database pool and token keys.
///
/// `PgPool` is already reference counted; the rest sits behind `Arc` so a
/// clone per request costs three pointer copies.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ApiConfig>,
    pool: PgPool,
    jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Derive the token keys from `config.jwt` and bundle them with the pool.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            config: Arc::new(config),
            pool,
            jwt,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Keys for issuing and checking access tokens.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.jwt
    }
}
