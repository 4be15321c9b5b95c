//! Checkout and delivery rules, driven the way the API drives them.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use loomi_core::cart::{CartAnalysis, CartItem, CatalogPrice, PriceBook, SubscriptionPrice, parse_cart};
use loomi_core::rating::RatingSummary;
use loomi_core::schedule::{is_running_on, next_delivery_due, order_delivery_date};
use loomi_core::{BoxId, DeliveryFrequency, GiftCardTypeId, OrderStatus, Recurrence, SubscriptionTypeId};

fn price_book() -> PriceBook {
    PriceBook {
        boxes: HashMap::from([
            (BoxId::new(1), CatalogPrice { price: Decimal::new(2990, 2), active: true }),
            (BoxId::new(2), CatalogPrice { price: Decimal::new(3490, 2), active: false }),
        ]),
        subscription_types: HashMap::from([(
            SubscriptionTypeId::new(1),
            SubscriptionPrice { price: Decimal::new(2490, 2), recurrence: Recurrence::Monthly },
        )]),
        gift_card_types: HashMap::from([(
            GiftCardTypeId::new(1),
            CatalogPrice { price: Decimal::new(7470, 2), active: true },
        )]),
    }
}

fn cart(items: &serde_json::Value) -> Vec<CartItem> {
    serde_json::from_value(items.clone()).unwrap()
}

#[test]
fn test_mixed_cart_is_priced_from_the_catalog() {
    let items = cart(&json!([
        { "type": "box", "id": 1, "quantity": 2 },
        { "type": "gift_card", "id": 1 },
        { "type": "subscription", "id": 1, "paidWithGiftCard": true, "giftCardCode": "GIFT-AB12-CD34" },
    ]));
    let lines = parse_cart(&items).unwrap();

    let total = price_book().total(&lines).unwrap();
    assert_eq!(total, Decimal::new(13450, 2));

    let analysis = CartAnalysis::of(&lines);
    assert!(analysis.has_boxes && analysis.has_gift_cards && analysis.has_subscriptions);
    assert_eq!(analysis.gift_card_code.as_deref(), Some("GIFT-AB12-CD34"));
    assert_eq!((analysis.paid_items, analysis.free_items), (2, 1));
    assert_eq!(analysis.final_status(total), OrderStatus::Pending);
}

#[test]
fn test_fully_covered_cart_completes_at_zero() {
    let items = cart(&json!([
        { "type": "box", "id": 1, "paidWithGiftCard": true },
        { "type": "giftcard_usage", "giftCardCode": "GIFT-AB12-CD34" },
    ]));
    let lines = parse_cart(&items).unwrap();

    let total = price_book().total(&lines).unwrap();
    assert_eq!(total, Decimal::ZERO);
    assert_eq!(CartAnalysis::of(&lines).final_status(total), OrderStatus::Completed);
}

#[test]
fn test_inactive_and_unknown_entries_are_rejected() {
    let items = cart(&json!([
        { "type": "box", "id": 2 },
        { "type": "box", "id": 99 },
    ]));
    let lines = parse_cart(&items).unwrap();

    let errors = price_book().total(&lines).unwrap_err();
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_subscription_deliveries_follow_their_frequency() {
    let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

    let first = next_delivery_due(start, DeliveryFrequency::Monthly, None);
    assert_eq!(first, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());

    let second = next_delivery_due(start, DeliveryFrequency::Monthly, Some(first));
    assert_eq!(second, Utc.with_ymd_and_hms(2025, 3, 28, 0, 0, 0).unwrap());

    let weekly = next_delivery_due(start, DeliveryFrequency::Weekly, Some(first));
    assert_eq!(weekly, Utc.with_ymd_and_hms(2025, 3, 7, 0, 0, 0).unwrap());

    assert!(is_running_on(start, None, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    assert!(!is_running_on(start, Some(start), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
}

#[test]
fn test_box_orders_ship_after_seven_business_days() {
    // Friday
    let ordered = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    assert_eq!(order_delivery_date(ordered), NaiveDate::from_ymd_opt(2025, 3, 18).unwrap());
}

#[test]
fn test_rating_summary_serializes_every_bucket() {
    let summary = RatingSummary::from_ratings([Decimal::new(5, 0), Decimal::new(45, 1), Decimal::new(4, 0)]);
    assert_eq!(summary.average_rating, Some(Decimal::new(45, 1)));

    let distribution = serde_json::to_value(&summary.rating_distribution).unwrap();
    assert_eq!(distribution.as_object().map(serde_json::Map::len), Some(10));
    assert_eq!(distribution["4.5"], 1);
    assert_eq!(distribution["0.5"], 0);
}
