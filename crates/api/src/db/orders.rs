//! Order repository.
//!
//! Placing an order writes the order, its box lines, the subscription it buys,
//! the gift cards it buys, the redeemed gift card and its payments in a single
//! transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use loomi_core::{
    BoxId, DeliveryFrequency, GiftCardId, GiftCardTypeId, OrderId, OrderStatus,
    PaymentMethodTypeId, SubscriptionId, SubscriptionStatus, SubscriptionTypeId, UserId,
};

use super::RepositoryError;
use super::subscriptions::SubscriptionRepository;
use crate::models::{Order, OrderBoxLine, OrderGiftCard, OrderPayment, OrderView};

pub(crate) const ORDER_COLUMNS: &str = "id, user_id, order_number, total_amount, status, active, \
     subscription_id, delivery_date, tracking_number, delivery_address, created_at, updated_at";

/// Subscription bought by an order.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub subscription_type_id: SubscriptionTypeId,
    pub frequency: DeliveryFrequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Gift card bought by an order.
#[derive(Debug, Clone)]
pub struct NewGiftCard {
    pub gift_card_type_id: GiftCardTypeId,
    pub code: String,
    pub expiration_date: DateTime<Utc>,
}

/// Payment recorded against an order.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_method_type_id: PaymentMethodTypeId,
    pub amount: Decimal,
    pub gift_card_id: Option<GiftCardId>,
}

/// Everything an order writes, priced and checked beforehand.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub total_amount: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: Option<String>,
    pub boxes: Vec<(BoxId, i32)>,
    pub subscription: Option<NewSubscription>,
    pub gift_cards: Vec<NewGiftCard>,
    /// Gift card redeemed by this order, marked used by the buyer.
    pub redeem: Option<GiftCardId>,
    pub payments: Vec<NewPayment>,
    pub status: OrderStatus,
    pub now: DateTime<Utc>,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order and everything it implies.
    ///
    /// Returns `None`, writing nothing, when the gift card to redeem was used
    /// by someone else after it was checked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number or a gift card
    /// code is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn place(&self, new: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let subscription_id = match &new.subscription {
            Some(sub) => Some(insert_subscription(&mut tx, sub).await?),
            None => None,
        };

        let sql = format!(
            "INSERT INTO orders \
                (user_id, order_number, total_amount, status, active, subscription_id, \
                 delivery_date, delivery_address) \
             VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7) \
             RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(new.user_id)
            .bind(&new.order_number)
            .bind(new.total_amount)
            .bind(OrderStatus::Pending)
            .bind(subscription_id)
            .bind(new.delivery_date)
            .bind(new.delivery_address.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "order number"))?;

        for (box_id, quantity) in &new.boxes {
            sqlx::query("INSERT INTO box_orders (order_id, box_id, quantity) VALUES ($1, $2, $3)")
                .bind(order.id)
                .bind(box_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        }

        for card in &new.gift_cards {
            sqlx::query(
                "INSERT INTO gift_cards (code, gift_card_type_id, order_id, expiration_date) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&card.code)
            .bind(card.gift_card_type_id)
            .bind(order.id)
            .bind(card.expiration_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "gift card code"))?;
        }

        if let Some(gift_card_id) = new.redeem {
            let redeemed = sqlx::query(
                "UPDATE gift_cards SET used_at = $2, activated_by = $3, updated_at = now() \
                 WHERE id = $1 AND used_at IS NULL",
            )
            .bind(gift_card_id)
            .bind(new.now)
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;
            if redeemed.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(None);
            }
        }

        for payment in &new.payments {
            sqlx::query(
                "INSERT INTO payment_methods \
                    (order_id, payment_method_type_id, gift_card_id, amount) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id)
            .bind(payment.payment_method_type_id)
            .bind(payment.gift_card_id)
            .bind(payment.amount)
            .execute(&mut *tx)
            .await?;
        }

        let order = if new.status == order.status {
            order
        } else {
            let sql = format!(
                "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 \
                 RETURNING {ORDER_COLUMNS}"
            );
            sqlx::query_as::<_, Order>(&sql)
                .bind(order.id)
                .bind(new.status)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Whether an order number is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn number_exists(&self, order_number: &str) -> Result<bool, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
                .bind(order_number)
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?)
    }

    /// A user's orders with payments, box lines, purchased gift cards and
    /// subscription, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<OrderView>, RepositoryError> {
        let orders = self.list_for_user(user_id).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();

        let mut payments = group_by_order(
            sqlx::query_as::<_, OrderPayment>(
                "SELECT pm.order_id, pmt.name AS type_name, pm.amount, pm.gift_card_id \
                 FROM payment_methods pm \
                 JOIN payment_method_types pmt ON pmt.id = pm.payment_method_type_id \
                 WHERE pm.order_id = ANY($1) ORDER BY pm.id",
            )
            .bind(&ids)
            .fetch_all(self.pool)
            .await?,
            |p| p.order_id,
        );

        let mut boxes = group_by_order(self.box_lines(&ids).await?, |b| b.order_id);

        let mut gift_cards = group_by_order(
            sqlx::query_as::<_, OrderGiftCard>(
                "SELECT gc.order_id, gc.code, gct.name AS type_name \
                 FROM gift_cards gc \
                 JOIN gift_card_types gct ON gct.id = gc.gift_card_type_id \
                 WHERE gc.order_id = ANY($1) ORDER BY gc.id",
            )
            .bind(&ids)
            .fetch_all(self.pool)
            .await?,
            |g| g.order_id,
        );

        let subscriptions = SubscriptionRepository::new(self.pool);
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let subscription = match order.subscription_id {
                Some(id) => subscriptions.get_with_type(id).await?,
                None => None,
            };
            views.push(OrderView {
                payment_methods: payments.remove(&order.id).unwrap_or_default(),
                boxes: boxes.remove(&order.id).unwrap_or_default(),
                created_gift_cards: gift_cards.remove(&order.id).unwrap_or_default(),
                subscription,
                order,
            });
        }
        Ok(views)
    }

    /// Box lines of the given orders, each with the box name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn box_lines(&self, order_ids: &[i32]) -> Result<Vec<OrderBoxLine>, RepositoryError> {
        Ok(sqlx::query_as::<_, OrderBoxLine>(
            "SELECT bo.order_id, b.id, b.name, bo.quantity \
             FROM box_orders bo JOIN boxes b ON b.id = bo.box_id \
             WHERE bo.order_id = ANY($1) ORDER BY bo.id",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?)
    }
}

async fn insert_subscription(
    tx: &mut Transaction<'_, Postgres>,
    sub: &NewSubscription,
) -> Result<SubscriptionId, RepositoryError> {
    Ok(sqlx::query_scalar(
        "INSERT INTO subscriptions \
            (subscription_type_id, status, frequency, start_date, end_date, auto_renew) \
         VALUES ($1, $2, $3, $4, $5, FALSE) RETURNING id",
    )
    .bind(sub.subscription_type_id)
    .bind(SubscriptionStatus::Active)
    .bind(sub.frequency)
    .bind(sub.start_date)
    .bind(sub.end_date)
    .fetch_one(&mut **tx)
    .await?)
}

fn group_by_order<T>(rows: Vec<T>, key: impl Fn(&T) -> OrderId) -> HashMap<OrderId, Vec<T>> {
    let mut grouped: HashMap<OrderId, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}
