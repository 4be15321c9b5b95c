//! Account routes: register, login, profile and token refresh.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::JsonBody;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::{AuthService, IssuedToken, ProfileInput, RegisterInput};
use crate::state::AppState;

/// A signed token, with the account on registration.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// `POST /api/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let (user, token) = AuthService::new(state.pool(), state.jwt())
        .register(&input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            user: Some(user),
        }),
    ))
}

/// `POST /api/login`
///
/// Fields are read leniently; anything unusable is an invalid credential.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<TokenResponse>> {
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);

    let (user, token) = AuthService::new(state.pool(), state.jwt())
        .login(email, password)
        .await?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "User logged in", Some(&[("user_id", &user_id)]));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse { token, user: None }))
}

/// `GET /api/profile` and `GET /api/user`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.jwt())
        .get_user(user.id)
        .await?;
    Ok(Json(user))
}

/// `POST /api/profile`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(input): JsonBody<ProfileInput>,
) -> Result<Json<Value>> {
    let user = AuthService::new(state.pool(), state.jwt())
        .update_profile(user.id, &input)
        .await?;
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

/// `POST /api/refresh`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn refresh(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<TokenResponse>> {
    let token = AuthService::new(state.pool(), state.jwt())
        .refresh(user.id)
        .await?;
    Ok(Json(TokenResponse { token, user: None }))
}
