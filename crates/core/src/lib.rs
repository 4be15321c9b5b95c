//! Loomi Core - Shared domain library.
//!
//! This crate provides the types and rules shared by the Loomi components:
//! - `loomi-api` - REST backend of the subscription box shop
//! - `loomi-cli` - Command-line tools for migrations, seeding and jobs
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access. Database mappings are compiled in with the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails and status enums
//! - [`cart`] - Mixed-cart validation, analysis and catalog pricing
//! - [`schedule`] - Business days, subscription terms, delivery due dates
//! - [`rating`] - Review ratings and their distribution
//! - [`payment`] - Checkout keys vs. stored payment type names
//! - [`gift_card`] - Gift card codes and redeemability

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod gift_card;
pub mod payment;
pub mod rating;
pub mod schedule;
pub mod types;

pub use types::*;
