//! Subscription delivery repository and delivery history queries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use loomi_core::{
    BoxId, BoxOrderId, OrderId, OrderStatus, SubscriptionDeliveryId, SubscriptionId, UserId,
};

use super::RepositoryError;
use crate::models::SubscriptionDelivery;

const DELIVERY_COLUMNS: &str = "id, subscription_id, box_id, delivered_at, created_at, updated_at";

/// A box line of one of the user's orders, with what the history needs of
/// the order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderDeliveryRow {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub line_id: BoxOrderId,
    pub box_id: BoxId,
    pub box_name: String,
    pub quantity: i32,
}

/// A delivered subscription box of the user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionDeliveryRow {
    pub id: SubscriptionDeliveryId,
    pub box_id: BoxId,
    pub box_name: String,
    pub subscription_name: String,
    pub delivered_at: DateTime<Utc>,
}

/// Repository for subscription deliveries.
pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a delivery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        subscription_id: SubscriptionId,
        box_id: BoxId,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<SubscriptionDelivery, RepositoryError> {
        let sql = format!(
            "INSERT INTO subscription_deliveries (subscription_id, box_id, delivered_at) \
             VALUES ($1, $2, $3) RETURNING {DELIVERY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, SubscriptionDelivery>(&sql)
            .bind(subscription_id)
            .bind(box_id)
            .bind(delivered_at)
            .fetch_one(self.pool)
            .await?)
    }

    /// Get a delivery by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: SubscriptionDeliveryId,
    ) -> Result<Option<SubscriptionDelivery>, RepositoryError> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM subscription_deliveries WHERE id = $1");
        Ok(sqlx::query_as::<_, SubscriptionDelivery>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Set `delivered_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the delivery doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_delivered(
        &self,
        id: SubscriptionDeliveryId,
        at: DateTime<Utc>,
    ) -> Result<SubscriptionDelivery, RepositoryError> {
        let sql = format!(
            "UPDATE subscription_deliveries SET delivered_at = $2, updated_at = now() \
             WHERE id = $1 RETURNING {DELIVERY_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionDelivery>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// When the subscription last received a box.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn last_delivered_at(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT MAX(delivered_at) FROM subscription_deliveries WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_one(self.pool)
        .await?)
    }

    /// Boxes the subscription has already received.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delivered_box_ids(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<BoxId>, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT box_id FROM subscription_deliveries \
             WHERE subscription_id = $1 AND delivered_at IS NOT NULL",
        )
        .bind(subscription_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Box lines of every order the user placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_lines(&self, user_id: UserId) -> Result<Vec<OrderDeliveryRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, OrderDeliveryRow>(
            "SELECT o.id AS order_id, o.order_number, o.status, o.tracking_number, \
                    o.delivery_date, o.delivery_address, o.created_at, \
                    bo.id AS line_id, b.id AS box_id, b.name AS box_name, bo.quantity \
             FROM orders o \
             JOIN box_orders bo ON bo.order_id = o.id \
             JOIN boxes b ON b.id = bo.box_id \
             WHERE o.user_id = $1 \
             ORDER BY o.id, bo.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Delivered boxes of the subscriptions the user bought.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscription_deliveries_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubscriptionDeliveryRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SubscriptionDeliveryRow>(
            "SELECT sd.id, b.id AS box_id, b.name AS box_name, \
                    st.label AS subscription_name, sd.delivered_at \
             FROM subscription_deliveries sd \
             JOIN subscriptions s ON s.id = sd.subscription_id \
             JOIN subscription_types st ON st.id = s.subscription_type_id \
             JOIN boxes b ON b.id = sd.box_id \
             WHERE sd.delivered_at IS NOT NULL \
               AND EXISTS (SELECT 1 FROM orders o \
                           WHERE o.subscription_id = s.id AND o.user_id = $1) \
             ORDER BY sd.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }
}
