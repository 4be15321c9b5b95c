//! Payment method type repository.

use std::collections::HashMap;

use sqlx::PgPool;

use loomi_core::PaymentMethodTypeId;

use super::RepositoryError;

/// Repository for the payment method type catalog.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Names of every payment method type, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn type_names(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT name FROM payment_method_types ORDER BY id")
                .fetch_all(self.pool)
                .await?,
        )
    }

    /// IDs of the named payment method types that exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn type_ids(
        &self,
        names: &[&str],
    ) -> Result<HashMap<String, PaymentMethodTypeId>, RepositoryError> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (PaymentMethodTypeId, String)>(
            "SELECT id, name FROM payment_method_types WHERE name = ANY($1)",
        )
        .bind(names)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id, name)| (name, id)).collect())
    }
}
