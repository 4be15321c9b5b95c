//! Delivery history and subscription delivery records.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use loomi_core::SubscriptionDeliveryId;

use super::{JsonBody, PathParam};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::DeliveryEntry;
use crate::services::deliveries::{self, NewDeliveryInput};
use crate::state::AppState;

/// `GET /api/profile/deliveries`: newest delivery first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<DeliveryEntry>>> {
    Ok(Json(deliveries::history(state.pool(), user.id).await?))
}

/// `POST /api/subscription-deliveries` (admin)
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(input): JsonBody<NewDeliveryInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let delivery = deliveries::record_delivery(state.pool(), &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Subscription delivery added successfully",
            "delivery": delivery,
        })),
    ))
}

/// `PATCH /api/subscription-deliveries/{id}/delivered`
#[instrument(skip_all, fields(user_id = %user.id, delivery_id = id))]
pub async fn mark_delivered(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(id): PathParam<i32>,
) -> Result<Json<Value>> {
    let delivery =
        deliveries::mark_delivered(state.pool(), &user, SubscriptionDeliveryId::new(id))
            .await?
            .ok_or_else(|| AppError::NotFound("Delivery not found".to_string()))?;
    Ok(Json(json!({
        "message": "Delivery marked as delivered",
        "delivery": delivery,
    })))
}
