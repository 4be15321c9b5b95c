//! Domain models for the API.
//!
//! Rows are decoded straight into these types (`sqlx::FromRow`) and serialized
//! as JSON response bodies, so field names follow the wire format.

pub mod catalog;
pub mod delivery;
pub mod gift_card;
pub mod order;
pub mod review;
pub mod subscription;
pub mod user;

pub use catalog::{
    Article, BoxCategory, BoxDetail, BoxImage, BoxItem, BoxProduct, GiftCardType,
    SubscriptionType, SubscriptionTypeDetail,
};
pub use delivery::{DeliveryEntry, DeliveryType, SubscriptionDelivery};
pub use gift_card::{GiftCard, GiftCardTypeSummary, GiftCardView};
pub use order::{Order, OrderBoxLine, OrderGiftCard, OrderPayment, OrderView};
pub use review::{Review, ReviewWithAuthor, Reviewer};
pub use subscription::{
    GiftCardExtension, GiftCardExtensions, Subscription, SubscriptionWithType,
};
pub use user::User;
