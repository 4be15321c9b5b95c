//! Subscription delivery processor against a real database.
//!
//! The processor walks every running subscription, so the test only looks
//! at the rows of the subscriptions it created. A single test keeps two
//! runs from racing over them.
//!
//! Run with: cargo test -p loomi-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use loomi_api::services::deliveries::DeliveryProcessor;
use loomi_integration_tests::prepared_pool;

/// A running monthly subscription that started on `start_date`.
async fn monthly_subscription(pool: &PgPool, start_date: NaiveDate) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO subscriptions (subscription_type_id, frequency, start_date) \
         VALUES ((SELECT id FROM subscription_types ORDER BY id LIMIT 1), 'monthly', $1) \
         RETURNING id",
    )
    .bind(start_date)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn deliver(pool: &PgPool, subscription_id: i32, box_id: i32, at: DateTime<Utc>) {
    sqlx::query(
        "INSERT INTO subscription_deliveries (subscription_id, box_id, delivered_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(subscription_id)
    .bind(box_id)
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
}

async fn delivered_boxes(pool: &PgPool, subscription_id: i32) -> Vec<i32> {
    sqlx::query_scalar("SELECT box_id FROM subscription_deliveries WHERE subscription_id = $1 ORDER BY id")
        .bind(subscription_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires LOOMI_TEST_DATABASE_URL"]
async fn test_processor_waits_for_due_date_and_prefers_new_boxes() {
    let pool = prepared_pool().await;
    let now = Utc::now();
    let active: Vec<i32> = sqlx::query_scalar("SELECT id FROM boxes WHERE active ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert!(active.len() >= 2, "seed must provide several active boxes");
    let (&remaining, received) = active.split_last().unwrap();

    // First box is due a month after the start
    let fresh = monthly_subscription(&pool, now.date_naive()).await;

    // Delivered yesterday, next box due in about a month
    let recent = monthly_subscription(&pool, (now - Duration::days(90)).date_naive()).await;
    deliver(&pool, recent, active[0], now - Duration::days(1)).await;

    // Every box but one received, the last one 40 days ago
    let due = monthly_subscription(&pool, (now - Duration::days(120)).date_naive()).await;
    for &box_id in received {
        deliver(&pool, due, box_id, now - Duration::days(40)).await;
    }

    // Dry runs only report
    let dry = DeliveryProcessor::new(&pool, true).run(now).await.unwrap();
    assert!(dry.active >= 3);
    assert_eq!(delivered_boxes(&pool, due).await.len(), received.len());

    let report = DeliveryProcessor::new(&pool, false).run(now).await.unwrap();
    assert!(report.created >= 1);
    assert!(report.not_due >= 2);

    assert!(delivered_boxes(&pool, fresh).await.is_empty());
    assert_eq!(delivered_boxes(&pool, recent).await, [active[0]]);

    let boxes = delivered_boxes(&pool, due).await;
    assert_eq!(boxes.len(), active.len());
    assert_eq!(boxes.last(), Some(&remaining));

    // Recorded at the due date, a month after the last delivery
    let delivered_at: DateTime<Utc> = sqlx::query_scalar(
        "SELECT delivered_at FROM subscription_deliveries \
         WHERE subscription_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(due)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(delivered_at <= now);
    assert!(delivered_at > now - Duration::days(40));
}
