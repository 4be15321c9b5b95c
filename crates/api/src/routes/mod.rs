//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                 - Liveness
//! GET    /health/ready                           - Database readiness
//!
//! # Auth (register/login rate limited per IP)
//! POST   /api/register                           - Create account, returns token
//! POST   /api/login                              - Returns token
//! GET    /api/profile, /api/user                 - Current user
//! POST   /api/profile                            - Update profile
//! POST   /api/refresh                            - New token
//!
//! # Catalog
//! GET    /api/boxes                              - Active boxes
//! GET    /api/boxes/{id}                         - Box detail
//! GET    /api/boxes/{id}/reviews                 - Box reviews
//! GET    /api/subscriptions                      - Subscription types
//! GET    /api/subscriptions/{id}                 - Subscription type with rating
//! GET    /api/subscriptions/{id}/reviews         - Subscription type reviews
//! GET    /api/gift-cards                         - Active gift card types
//! GET    /api/payment-methods                    - Checkout payment choices
//! GET    /api/articles, /api/articles/{id}       - Published articles
//!
//! # Customer (bearer token)
//! GET    /api/my-subscription                    - Current subscription
//! POST   /api/cancel-subscription                - Cancel it
//! GET    /api/orders                             - Order history
//! POST   /api/order                              - Place an order
//! POST   /api/gift-cards/activate                - Activate a gift card
//! GET    /api/my-gift-cards                      - Activated gift cards
//! POST   /api/reviews                            - Review a box or subscription type
//! GET    /api/reviews/user/{box_id}              - Own review of a box
//! PUT    /api/reviews/{id}                       - Edit own review
//! DELETE /api/reviews/{id}                       - Delete own review (or admin)
//! GET    /api/profile/deliveries                 - Delivery history
//! PATCH  /api/subscription-deliveries/{id}/delivered - Mark delivered (owner or admin)
//!
//! # Admin
//! GET    /api/admin/boxes                        - All boxes
//! PUT    /api/admin/boxes/{id}                   - Update a box
//! POST   /api/subscription-deliveries            - Record a delivery
//! POST   /api/admin/articles                     - Create an article
//! PUT    /api/admin/articles/{id}                - Update an article
//! DELETE /api/admin/articles/{id}                - Delete an article
//! ```

pub mod articles;
pub mod auth;
pub mod boxes;
pub mod deliveries;
mod extract;
pub mod gift_cards;
pub mod health;
pub mod orders;
pub mod reviews;
pub mod subscriptions;

pub use extract::{JsonBody, PathParam};

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Register and login, rate limited when `rate_limited` is set.
pub fn credential_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    if rate_limited {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Account routes behind a bearer token.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(auth::profile).post(auth::update_profile))
        .route("/user", get(auth::profile))
        .route("/refresh", post(auth::refresh))
        .route("/profile/deliveries", get(deliveries::history))
        .route("/my-subscription", get(subscriptions::mine))
        .route("/cancel-subscription", post(subscriptions::cancel))
        .route("/orders", get(orders::index))
        .route("/order", post(orders::place))
        .route("/my-gift-cards", get(gift_cards::mine))
        .route("/gift-cards/activate", post(gift_cards::activate))
}

/// Public catalog routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/boxes", get(boxes::index))
        .route("/boxes/{id}", get(boxes::show))
        .route("/boxes/{id}/reviews", get(boxes::reviews))
        .route("/subscriptions", get(subscriptions::index))
        .route("/subscriptions/{id}", get(subscriptions::show))
        .route("/subscriptions/{id}/reviews", get(subscriptions::reviews))
        .route("/gift-cards", get(gift_cards::types))
        .route("/payment-methods", get(orders::payment_methods))
        .route("/articles", get(articles::index))
        .route("/articles/{id}", get(articles::show))
}

/// Review routes.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/user/{box_id}", get(reviews::user_review))
        .route("/{id}", put(reviews::update).delete(reviews::delete))
}

/// Subscription delivery records.
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(deliveries::create))
        .route("/{id}/delivered", patch(deliveries::mark_delivered))
}

/// Admin-only routes; every handler takes `RequireAdmin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/boxes", get(boxes::admin_index))
        .route("/boxes/{id}", put(boxes::admin_update))
        .route("/articles", post(articles::create))
        .route(
            "/articles/{id}",
            put(articles::update).delete(articles::delete),
        )
}

/// Create all routes for the API.
pub fn routes(rate_limited: bool) -> Router<AppState> {
    let api = Router::new()
        .merge(credential_routes(rate_limited))
        .merge(account_routes())
        .merge(catalog_routes())
        .nest("/reviews", review_routes())
        .nest("/subscription-deliveries", delivery_routes())
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api)
}
