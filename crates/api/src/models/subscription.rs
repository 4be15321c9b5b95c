//! Subscriptions held by customers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use loomi_core::{DeliveryFrequency, SubscriptionId, SubscriptionStatus, SubscriptionTypeId};

use super::SubscriptionType;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub subscription_type_id: SubscriptionTypeId,
    pub status: SubscriptionStatus,
    pub frequency: DeliveryFrequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription with its type embedded.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionWithType {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub subscription_type: SubscriptionType,
}

/// A gift card that paid for part of a subscription.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GiftCardExtension {
    pub code: String,
    pub type_name: String,
    #[sqlx(skip)]
    pub months: u32,
    pub used_at: Option<DateTime<Utc>>,
    pub order_date: DateTime<Utc>,
}

/// Months of a subscription offered through gift cards.
#[derive(Debug, Clone, Serialize)]
pub struct GiftCardExtensions {
    pub total_months_offered: u32,
    pub details: Vec<GiftCardExtension>,
}

impl GiftCardExtensions {
    /// Sum the months each card's type name offers.
    #[must_use]
    pub fn from_cards(mut details: Vec<GiftCardExtension>) -> Self {
        for card in &mut details {
            card.months = loomi_core::gift_card::months_offered(&card.type_name);
        }
        Self {
            total_months_offered: details.iter().map(|d| d.months).sum(),
            details,
        }
    }
}
