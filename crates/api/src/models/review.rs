//! Reviews of boxes and subscription types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use loomi_core::{BoxId, ReviewId, SubscriptionTypeId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub box_id: Option<BoxId>,
    pub subscription_type_id: Option<SubscriptionTypeId>,
    pub rating: Decimal,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public face of a reviewer.
#[derive(Debug, Clone, Serialize)]
pub struct Reviewer {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: Reviewer,
}
