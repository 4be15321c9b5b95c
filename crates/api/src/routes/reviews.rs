//! Review writes and the user's review of a box.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use loomi_core::{BoxId, ReviewId};

use super::{JsonBody, PathParam};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::reviews::{CreateReviewInput, ReviewService, UpdateReviewInput};
use crate::state::AppState;

/// `POST /api/reviews`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(input): JsonBody<CreateReviewInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let review = ReviewService::new(state.pool()).create(user.id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review created successfully", "review": review })),
    ))
}

/// `GET /api/reviews/user/{box_id}`: `{"review": null}` when none.
#[instrument(skip_all, fields(user_id = %user.id, box_id = box_id))]
pub async fn user_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(box_id): PathParam<i32>,
) -> Result<Json<Value>> {
    let review = ReviewService::new(state.pool())
        .user_review_of_box(user.id, BoxId::new(box_id))
        .await?;
    Ok(Json(json!({ "review": review })))
}

/// `PUT /api/reviews/{id}`
#[instrument(skip_all, fields(user_id = %user.id, review_id = id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<UpdateReviewInput>,
) -> Result<Json<Value>> {
    let review = ReviewService::new(state.pool())
        .update(user.id, ReviewId::new(id), &input)
        .await?;
    Ok(Json(json!({ "message": "Review updated successfully", "review": review })))
}

/// `DELETE /api/reviews/{id}`
#[instrument(skip_all, fields(user_id = %user.id, review_id = id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(id): PathParam<i32>,
) -> Result<Json<Value>> {
    ReviewService::new(state.pool())
        .delete(user.id, user.is_admin(), ReviewId::new(id))
        .await?;
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}
