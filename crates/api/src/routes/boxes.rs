//! Box catalog routes.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::instrument;

use loomi_core::BoxId;

use super::{JsonBody, PathParam};
use crate::db::BoxRepository;
use crate::db::reviews::ReviewTarget;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{BoxDetail, BoxProduct};
use crate::services::catalog::{self, BoxUpdateInput};
use crate::services::reviews::{ReviewPage, ReviewService};
use crate::state::AppState;

fn box_not_found() -> AppError {
    AppError::NotFound("Box not found".to_string())
}

/// `GET /api/boxes`: active boxes only.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<BoxProduct>>> {
    Ok(Json(BoxRepository::new(state.pool()).list_active().await?))
}

/// `GET /api/boxes/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> Result<Json<BoxDetail>> {
    catalog::box_detail(state.pool(), BoxId::new(id))
        .await?
        .map(Json)
        .ok_or_else(box_not_found)
}

/// `GET /api/boxes/{id}/reviews`
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<ReviewPage>> {
    let page = ReviewService::new(state.pool())
        .page(ReviewTarget::Box(BoxId::new(id)))
        .await?;
    Ok(Json(page))
}

/// `GET /api/admin/boxes`: every box, inactive ones included.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<BoxProduct>>> {
    Ok(Json(BoxRepository::new(state.pool()).list_all().await?))
}

/// `PUT /api/admin/boxes/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, box_id = id))]
pub async fn admin_update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<BoxUpdateInput>,
) -> Result<Json<Value>> {
    let detail = catalog::update_box(state.pool(), BoxId::new(id), &input)
        .await?
        .ok_or_else(box_not_found)?;

    tracing::info!(box_id = id, "Box updated");
    Ok(Json(json!({
        "message": "Box updated successfully",
        "box": detail,
    })))
}
