//! Business rules that depend on stored state: who may review, what the
//! catalog lists, and when a gift card can be used.
//!
//! Run with: cargo test -p loomi-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use loomi_integration_tests::{
    app_with_pool, prepared_pool, register_customer, request, send, unique,
};

async fn active_box_id(pool: &PgPool) -> i32 {
    sqlx::query_scalar("SELECT id FROM boxes WHERE active ORDER BY id LIMIT 1")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A completed order of `box_id` for `user_id`, as if it had been received.
async fn completed_order_of(pool: &PgPool, user_id: i32, box_id: i32) {
    let order_id: i32 = sqlx::query_scalar(
        "INSERT INTO orders (user_id, order_number, total_amount, status) \
         VALUES ($1, $2, 29.99, 'completed') RETURNING id",
    )
    .bind(user_id)
    .bind(unique("ORD").chars().take(32).collect::<String>())
    .fetch_one(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO box_orders (order_id, box_id, quantity) VALUES ($1, $2, 1)")
        .bind(order_id)
        .bind(box_id)
        .execute(pool)
        .await
        .unwrap();
}

/// An unused gift card expiring at `expiration`; returns its ID and code.
async fn gift_card(pool: &PgPool, expiration: chrono::DateTime<Utc>) -> (i32, String) {
    let raw = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    let code = format!("GIFT-{}-{}", &raw[..4], &raw[4..8]);
    let id = sqlx::query_scalar(
        "INSERT INTO gift_cards (code, gift_card_type_id, expiration_date) \
         VALUES ($1, (SELECT id FROM gift_card_types ORDER BY id LIMIT 1), $2) RETURNING id",
    )
    .bind(&code)
    .bind(expiration)
    .fetch_one(pool)
    .await
    .unwrap();
    (id, code)
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_review_requires_received_box_and_is_unique() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let (user_id, token) = register_customer(&app).await;
    let box_id = active_box_id(&pool).await;
    let review = json!({ "box_id": box_id, "rating": 4.5, "comment": "Lovely yarn" });

    let (status, body) = send(&app, request("POST", "/api/reviews", Some(&review), Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only review boxes you have received");

    completed_order_of(&pool, user_id, box_id).await;

    let (status, body) = send(&app, request("POST", "/api/reviews", Some(&review), Some(&token))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(&app, request("POST", "/api/reviews", Some(&review), Some(&token))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already reviewed this item");

    let (_, body) = send(&app, request("GET", &format!("/api/boxes/{box_id}/reviews"), None, None)).await;
    assert!(body["average_rating"].is_number(), "{body}");
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_box_listing_hides_inactive_boxes() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let hidden: i32 = sqlx::query_scalar(
        "INSERT INTO boxes (name, base_price, active, quantity) VALUES ($1, 19.90, FALSE, 5) RETURNING id",
    )
    .bind(unique("Retired box"))
    .fetch_one(&pool)
    .await
    .unwrap();

    let (status, boxes) = send(&app, request("GET", "/api/boxes", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = boxes.as_array().unwrap();
    assert!(!listed.is_empty());
    assert!(listed.iter().all(|b| b["active"] == true));
    assert!(listed.iter().all(|b| b["id"] != hidden));
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_gift_card_activates_once() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let (_, token) = register_customer(&app).await;
    let (_, code) = gift_card(&pool, Utc::now() + Duration::days(30)).await;
    // Codes are matched case-insensitively
    let body = json!({ "code": code.to_lowercase() });

    let (status, first) = send(&app, request("POST", "/api/gift-cards/activate", Some(&body), Some(&token))).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["success"], true);

    let (status, second) = send(&app, request("POST", "/api/gift-cards/activate", Some(&body), Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        second,
        json!({ "success": false, "message": "This gift card has already been used" })
    );

    let (_, mine) = send(&app, request("GET", "/api/my-gift-cards", None, Some(&token))).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_expired_or_unknown_gift_card_is_refused() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let (_, token) = register_customer(&app).await;
    let (id, code) = gift_card(&pool, Utc::now() - Duration::days(1)).await;

    let body = json!({ "code": code });
    let (status, refused) = send(&app, request("POST", "/api/gift-cards/activate", Some(&body), Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(refused["message"], "This gift card has expired");

    let used_at: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT used_at FROM gift_cards WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(used_at.is_none());

    let unknown = json!({ "code": "GIFT-NONE-0000" });
    let (status, refused) = send(&app, request("POST", "/api/gift-cards/activate", Some(&unknown), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(refused["message"], "Invalid gift card code");
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_gift_card_id_without_gift_card_items_is_not_redeemed() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let (_, token) = register_customer(&app).await;
    let (card_id, _) = gift_card(&pool, Utc::now() + Duration::days(30)).await;
    let box_id = active_box_id(&pool).await;

    let order = json!({
        "items": [{ "type": "box", "id": box_id }],
        "payment_method": "visa",
        "gift_card_id": card_id,
    });
    let (status, body) = send(&app, request("POST", "/api/order", Some(&order), Some(&token))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["order"]["id"].as_i64().unwrap();

    let used_at: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT used_at FROM gift_cards WHERE id = $1")
            .bind(card_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(used_at.is_none());

    let payments: Vec<Option<i32>> =
        sqlx::query_scalar("SELECT gift_card_id FROM payment_methods WHERE order_id = $1")
            .bind(i32::try_from(order_id).unwrap())
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(payments, [None]);
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_oversized_cart_quantity_is_a_validation_error() {
    let pool = prepared_pool().await;
    let app = app_with_pool(pool.clone());
    let (_, token) = register_customer(&app).await;
    let box_id = active_box_id(&pool).await;

    let order = json!({
        "items": [{ "type": "box", "id": box_id, "quantity": 3_000_000_000_i64 }],
        "payment_method": "visa",
    });
    let (status, body) = send(&app, request("POST", "/api/order", Some(&order), Some(&token))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["items.0.quantity"].is_array(), "{body}");
}
