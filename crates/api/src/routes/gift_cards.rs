//! Gift card types and activation.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::instrument;

use super::JsonBody;
use crate::db::GiftCardRepository;
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{GiftCardType, GiftCardView};
use crate::services::gift_cards::{GiftCardError, GiftCardService};
use crate::state::AppState;

/// `GET /api/gift-cards`: active gift card types.
#[instrument(skip(state))]
pub async fn types(State(state): State<AppState>) -> Result<Json<Vec<GiftCardType>>> {
    Ok(Json(GiftCardRepository::new(state.pool()).list_active_types().await?))
}

/// `POST /api/gift-cards/activate`
///
/// Authentication is checked here rather than by the extractor so the
/// refusal keeps the `{success, message}` shape of this endpoint.
#[instrument(skip_all)]
pub async fn activate(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>> {
    let user = user.ok_or(GiftCardError::NotLoggedIn)?;
    let code = body.get("code").and_then(Value::as_str);

    let gift_card = GiftCardService::new(state.pool())
        .activate(user.id, code)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Gift card activated successfully",
        "gift_card": gift_card,
    })))
}

/// `GET /api/my-gift-cards`: cards the user activated, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<GiftCardView>>> {
    Ok(Json(
        GiftCardService::new(state.pool())
            .activated_by(user.id)
            .await?,
    ))
}
