//! Deliveries: subscription boxes and the merged delivery history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use loomi_core::{BoxId, DeliveryStatus, SubscriptionDeliveryId, SubscriptionId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriptionDelivery {
    pub id: SubscriptionDeliveryId,
    pub subscription_id: SubscriptionId,
    pub box_id: BoxId,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a delivered box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Order,
    Subscription,
}

/// One line of the customer's delivery history.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryEntry {
    /// `order_{order}_{line}` or `subscription_{delivery}`.
    pub id: String,
    pub delivery_type: DeliveryType,
    pub box_id: BoxId,
    pub box_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Label of the subscription type, for subscription deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
    pub quantity: Option<i32>,
    pub order_date: Option<DateTime<Utc>>,
    pub delivery_date: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub tracking_number: Option<String>,
    pub delivery_address: Option<String>,
    pub can_review: bool,
    pub is_delivered: bool,
}

impl DeliveryEntry {
    /// Sort key of the history, newest delivery first.
    #[must_use]
    pub const fn sort_key(&self) -> DateTime<Utc> {
        self.delivery_date
    }
}

/// Midnight UTC of a calendar date.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
