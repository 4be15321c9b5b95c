//! Catalog types: boxes and their contents, subscription types, gift card
//! types and articles.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use loomi_core::{
    ArticleId, BoxCategoryId, BoxId, BoxImageId, GiftCardTypeId, ItemId, Recurrence,
    SubscriptionTypeId, rating::RatingSummary,
};

/// A box as listed in the catalog.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoxProduct {
    pub id: BoxId,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub active: bool,
    pub quantity: i32,
    pub available_from: Option<NaiveDate>,
    pub box_category_id: Option<BoxCategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoxCategory {
    pub id: BoxCategoryId,
    pub short_name: String,
    pub description: Option<String>,
}

/// An item of a box, with how many of it the box holds.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoxItem {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoxImage {
    pub id: BoxImageId,
    pub link: String,
    pub alt: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

/// A box with everything its detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct BoxDetail {
    #[serde(flatten)]
    pub product: BoxProduct,
    pub category: Option<BoxCategory>,
    pub items: Vec<BoxItem>,
    pub images: Vec<BoxImage>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub average_rating: Option<Decimal>,
    pub total_reviews: usize,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriptionType {
    pub id: SubscriptionTypeId,
    pub label: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub recurrence: Recurrence,
    pub delivery: Option<String>,
    pub return_policy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription type with its review aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionTypeDetail {
    #[serde(flatten)]
    pub subscription_type: SubscriptionType,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub average_rating: Option<Decimal>,
    pub total_reviews: usize,
}

impl SubscriptionTypeDetail {
    #[must_use]
    pub const fn new(subscription_type: SubscriptionType, summary: &RatingSummary) -> Self {
        Self {
            subscription_type,
            average_rating: summary.average_rating,
            total_reviews: summary.total_reviews,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GiftCardType {
    pub id: GiftCardTypeId,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
