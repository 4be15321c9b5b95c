//! Orders and what hangs off them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use loomi_core::{BoxId, GiftCardId, OrderId, OrderStatus, SubscriptionId, UserId};

use super::SubscriptionWithType;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub active: bool,
    pub subscription_id: Option<SubscriptionId>,
    pub delivery_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One payment of an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderPayment {
    #[serde(skip)]
    pub order_id: OrderId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub amount: Decimal,
    pub gift_card_id: Option<GiftCardId>,
}

/// One box line of an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderBoxLine {
    #[serde(skip)]
    pub order_id: OrderId,
    pub id: BoxId,
    pub name: String,
    pub quantity: i32,
}

/// A gift card purchased by an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderGiftCard {
    #[serde(skip)]
    pub order_id: OrderId,
    pub code: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An order as shown in the customer's order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub payment_methods: Vec<OrderPayment>,
    pub boxes: Vec<OrderBoxLine>,
    pub created_gift_cards: Vec<OrderGiftCard>,
    pub subscription: Option<SubscriptionWithType>,
}
