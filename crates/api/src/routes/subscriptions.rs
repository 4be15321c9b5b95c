//! Subscription type catalog and the customer's own subscription.

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use loomi_core::SubscriptionTypeId;

use super::PathParam;
use crate::db::SubscriptionTypeRepository;
use crate::db::reviews::ReviewTarget;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{
    GiftCardExtensions, SubscriptionType, SubscriptionTypeDetail, SubscriptionWithType, User,
};
use crate::services::auth::AuthService;
use crate::services::reviews::{ReviewPage, ReviewService};
use crate::services::subscriptions::SubscriptionService;
use crate::state::AppState;

/// Body of `GET /api/my-subscription`.
#[derive(Debug, Serialize)]
pub struct MySubscription {
    pub subscription: Option<SubscriptionWithType>,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_card_extensions: Option<GiftCardExtensions>,
}

/// `GET /api/subscriptions`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<SubscriptionType>>> {
    Ok(Json(SubscriptionTypeRepository::new(state.pool()).list().await?))
}

/// `GET /api/subscriptions/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<SubscriptionTypeDetail>> {
    let id = SubscriptionTypeId::new(id);
    let subscription_type = SubscriptionTypeRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription type not found".to_string()))?;
    let summary = ReviewService::new(state.pool())
        .summary(ReviewTarget::SubscriptionType(id))
        .await?;
    Ok(Json(SubscriptionTypeDetail::new(subscription_type, &summary)))
}

/// `GET /api/subscriptions/{id}/reviews`
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<ReviewPage>> {
    let page = ReviewService::new(state.pool())
        .page(ReviewTarget::SubscriptionType(SubscriptionTypeId::new(id)))
        .await?;
    Ok(Json(page))
}

/// `GET /api/my-subscription`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MySubscription>> {
    let account = AuthService::new(state.pool(), state.jwt())
        .get_user(user.id)
        .await?;
    let current = SubscriptionService::new(state.pool()).current(user.id).await?;

    let (subscription, gift_card_extensions) = match current {
        Some(c) => (Some(c.subscription), Some(c.gift_card_extensions)),
        None => (None, None),
    };
    Ok(Json(MySubscription {
        subscription,
        user: account,
        gift_card_extensions,
    }))
}

/// `POST /api/cancel-subscription`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let subscription = SubscriptionService::new(state.pool()).cancel(user.id).await?;
    Ok(Json(json!({
        "message": "Subscription cancelled successfully",
        "subscription": subscription,
    })))
}
