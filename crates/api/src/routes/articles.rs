//! Editorial articles: public reads, admin writes.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use loomi_core::ArticleId;

use super::{JsonBody, PathParam};
use crate::db::{ArticleRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Article;
use crate::services::articles::{ArticleInput, validate_article_update, validate_new_article};
use crate::state::AppState;

fn article_not_found() -> AppError {
    AppError::NotFound("Article not found".to_string())
}

fn not_found_or(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => article_not_found(),
        other => other.into(),
    }
}

/// `GET /api/articles`: published, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Article>>> {
    Ok(Json(ArticleRepository::new(state.pool()).list_published().await?))
}

/// `GET /api/articles/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> Result<Json<Article>> {
    ArticleRepository::new(state.pool())
        .get_published(ArticleId::new(id))
        .await?
        .map(Json)
        .ok_or_else(article_not_found)
}

/// `POST /api/admin/articles`
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(input): JsonBody<ArticleInput>,
) -> Result<(StatusCode, Json<Article>)> {
    let fields = validate_new_article(&input)?;
    let article = ArticleRepository::new(state.pool()).create(&fields).await?;
    tracing::info!(article_id = %article.id, "Article created");
    Ok((StatusCode::CREATED, Json(article)))
}

/// `PUT /api/admin/articles/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, article_id = id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<ArticleInput>,
) -> Result<Json<Article>> {
    let fields = validate_article_update(&input)?;
    let article = ArticleRepository::new(state.pool())
        .update(ArticleId::new(id), &fields)
        .await
        .map_err(not_found_or)?;
    Ok(Json(article))
}

/// `DELETE /api/admin/articles/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, article_id = id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<i32>,
) -> Result<StatusCode> {
    ArticleRepository::new(state.pool())
        .delete(ArticleId::new(id))
        .await
        .map_err(not_found_or)?;
    tracing::info!(article_id = id, "Article deleted");
    Ok(StatusCode::NO_CONTENT)
}
