//! Business logic services for the API.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens, profile
//! - `catalog` - Box detail pages and admin box updates
//! - `orders` - Mixed-cart order placement
//! - `gift_cards` - Gift card activation
//! - `reviews` - Reviews of received boxes and held subscriptions
//! - `subscriptions` - The customer's current subscription
//! - `deliveries` - Delivery history, admin delivery records, the scheduled processor
//! - `articles` - Article write validation

pub mod articles;
pub mod auth;
pub mod catalog;
pub mod deliveries;
pub mod gift_cards;
pub mod orders;
pub mod reviews;
pub mod subscriptions;
