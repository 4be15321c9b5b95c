//! Gift cards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use loomi_core::{GiftCardId, GiftCardTypeId, OrderId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GiftCard {
    pub id: GiftCardId,
    pub code: String,
    pub gift_card_type_id: GiftCardTypeId,
    pub order_id: Option<OrderId>,
    pub activated_by: Option<UserId>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Name and price of a card's type, embedded in [`GiftCardView`].
#[derive(Debug, Clone, Serialize)]
pub struct GiftCardTypeSummary {
    pub name: String,
    pub base_price: Decimal,
}

/// A gift card as returned to its holder.
#[derive(Debug, Clone, Serialize)]
pub struct GiftCardView {
    pub id: GiftCardId,
    pub code: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub gift_card_type: GiftCardTypeSummary,
}
