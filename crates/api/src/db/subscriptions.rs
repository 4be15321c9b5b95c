//! Subscription type and subscription repositories.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgPool;

use loomi_core::cart::SubscriptionPrice;
use loomi_core::{
    OrderId, SubscriptionId, SubscriptionStatus, SubscriptionTypeId, UserId,
};
use rust_decimal::Decimal;

use super::RepositoryError;
use crate::models::{GiftCardExtension, Subscription, SubscriptionType, SubscriptionWithType};

const TYPE_COLUMNS: &str =
    "id, label, description, price, recurrence, delivery, return_policy, created_at, updated_at";

pub(crate) const SUBSCRIPTION_COLUMNS: &str = "id, subscription_type_id, status, frequency, \
     start_date, end_date, auto_renew, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PriceRow {
    id: SubscriptionTypeId,
    price: Decimal,
    recurrence: loomi_core::Recurrence,
}

/// Repository for the subscription type catalog.
pub struct SubscriptionTypeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionTypeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every subscription type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SubscriptionType>, RepositoryError> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM subscription_types ORDER BY price, id");
        Ok(sqlx::query_as::<_, SubscriptionType>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Get a subscription type by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: SubscriptionTypeId,
    ) -> Result<Option<SubscriptionType>, RepositoryError> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM subscription_types WHERE id = $1");
        Ok(sqlx::query_as::<_, SubscriptionType>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Whether a subscription type exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: SubscriptionTypeId) -> Result<bool, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subscription_types WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Price and recurrence of the given types.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn prices(
        &self,
        ids: &[SubscriptionTypeId],
    ) -> Result<HashMap<SubscriptionTypeId, SubscriptionPrice>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT id, price, recurrence FROM subscription_types WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    SubscriptionPrice {
                        price: r.price,
                        recurrence: r.recurrence,
                    },
                )
            })
            .collect())
    }
}

/// Repository for customers' subscriptions.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a subscription by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, RepositoryError> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1");
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Get a subscription with its type embedded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the type row is missing.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_type(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionWithType>, RepositoryError> {
        let Some(subscription) = self.get(id).await? else {
            return Ok(None);
        };
        let subscription_type = SubscriptionTypeRepository::new(self.pool)
            .get(subscription.subscription_type_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "subscription {id} has no subscription type"
                ))
            })?;
        Ok(Some(SubscriptionWithType {
            subscription,
            subscription_type,
        }))
    }

    /// The user's latest active order that carries a subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current_order(
        &self,
        user_id: UserId,
    ) -> Result<Option<(OrderId, SubscriptionId)>, RepositoryError> {
        Ok(sqlx::query_as::<_, (OrderId, SubscriptionId)>(
            "SELECT id, subscription_id FROM orders \
             WHERE user_id = $1 AND active AND subscription_id IS NOT NULL \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Cancel a subscription and deactivate the order that bought it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subscription doesn't exist.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn cancel(
        &self,
        order_id: OrderId,
        id: SubscriptionId,
    ) -> Result<Subscription, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE subscriptions SET status = $2, auto_renew = FALSE, updated_at = now() \
             WHERE id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let subscription = sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .bind(SubscriptionStatus::Cancelled)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE orders SET active = FALSE, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(subscription)
    }

    /// Gift cards redeemed by the user's orders of this subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn gift_card_extensions(
        &self,
        user_id: UserId,
        id: SubscriptionId,
    ) -> Result<Vec<GiftCardExtension>, RepositoryError> {
        Ok(sqlx::query_as::<_, GiftCardExtension>(
            "SELECT gc.code, gct.name AS type_name, gc.used_at, o.created_at AS order_date \
             FROM orders o \
             JOIN payment_methods pm ON pm.order_id = o.id \
             JOIN payment_method_types pmt ON pmt.id = pm.payment_method_type_id \
             JOIN gift_cards gc ON gc.id = pm.gift_card_id \
             JOIN gift_card_types gct ON gct.id = gc.gift_card_type_id \
             WHERE o.user_id = $1 AND o.subscription_id = $2 AND pmt.name = $3 \
             ORDER BY o.created_at, pm.id",
        )
        .bind(user_id)
        .bind(id)
        .bind(loomi_core::payment::GIFT_CARD_PAYMENT)
        .fetch_all(self.pool)
        .await?)
    }

    /// Whether one of the user's orders bought this subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_owned_by(
        &self,
        id: SubscriptionId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE subscription_id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?)
    }

    /// Whether the user holds a subscription of this type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_holds_type(
        &self,
        user_id: UserId,
        type_id: SubscriptionTypeId,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders o \
             JOIN subscriptions s ON s.id = o.subscription_id \
             WHERE o.user_id = $1 AND s.subscription_type_id = $2)",
        )
        .bind(user_id)
        .bind(type_id)
        .fetch_one(self.pool)
        .await?)
    }

    /// Active subscriptions running on `today`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn running_on(&self, today: NaiveDate) -> Result<Vec<Subscription>, RepositoryError> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE status = $1 AND start_date <= $2 AND (end_date IS NULL OR end_date >= $2) \
             ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(SubscriptionStatus::Active)
            .bind(today)
            .fetch_all(self.pool)
            .await?)
    }
}
