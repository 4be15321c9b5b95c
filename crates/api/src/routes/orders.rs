//! Order history, checkout choices and order placement.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use loomi_core::payment::{self, PaymentChoice};

use super::JsonBody;
use crate::db::{OrderRepository, PaymentRepository};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{OrderView, User};
use crate::services::auth::AuthService;
use crate::services::orders::{OrderService, PlaceOrderInput};
use crate::state::AppState;

/// Body of `GET /api/orders`.
#[derive(Debug, Serialize)]
pub struct OrderHistory {
    pub user: User,
    pub orders: Vec<OrderView>,
}

/// `GET /api/orders`: the user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderHistory>> {
    let account = AuthService::new(state.pool(), state.jwt())
        .get_user(user.id)
        .await?;
    let orders = OrderRepository::new(state.pool()).history(user.id).await?;
    Ok(Json(OrderHistory {
        user: account,
        orders,
    }))
}

/// `GET /api/payment-methods`
///
/// Never fails: a fixed list is served when the payment types can't be read.
#[instrument(skip(state))]
pub async fn payment_methods(State(state): State<AppState>) -> Json<Value> {
    let choices: Vec<PaymentChoice> = match PaymentRepository::new(state.pool()).type_names().await
    {
        Ok(names) => payment::payment_choices(names.iter().map(String::as_str)),
        Err(e) => {
            tracing::warn!(error = %e, "Serving default payment methods");
            payment::fallback_payment_choices()
        }
    };
    Json(json!({ "success": true, "payment_methods": choices }))
}

/// `POST /api/order`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(input): JsonBody<PlaceOrderInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let buyer = AuthService::new(state.pool(), state.jwt())
        .get_user(user.id)
        .await?;
    let order = OrderService::new(state.pool()).place(&buyer, &input).await?;

    let order_id = order.id.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_id", &order_id)]));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order placed successfully",
            "order": order,
        })),
    ))
}
