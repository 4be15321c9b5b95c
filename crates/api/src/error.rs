//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! # Response bodies
//!
//! - validation: 422 `{"message": "The given data was invalid.", "errors": {...}}`
//! - missing or bad bearer token: 401 `{"message": "Unauthenticated."}`
//! - gift card endpoints: `{"success": false, "message": "..."}`
//! - unreadable JSON body or path segment: `{"message": "..."}`
//! - everything else: `{"error": "..."}`

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::gift_cards::GiftCardError;
use crate::services::orders::OrderError;
use crate::services::reviews::ReviewError;
use crate::services::subscriptions::SubscriptionError;
use crate::validation::ValidationErrors;

/// Message of every 422 body.
pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Gift card activation failed.
    #[error("Gift card error: {0}")]
    GiftCard(#[from] GiftCardError),

    /// Review operation failed.
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Subscription cancellation failed.
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Request body failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Request body could not be read as JSON.
    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    /// A path segment could not be parsed.
    #[error("Invalid path: {0}")]
    Path(#[from] PathRejection),

    /// No valid bearer token.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AppError {
    /// Whether this error is a fault of the server rather than the request.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Auth(e) => e.is_server_error(),
            Self::Order(e) => e.is_server_error(),
            Self::GiftCard(e) => e.is_server_error(),
            Self::Review(e) => e.is_server_error(),
            Self::Subscription(e) => e.is_server_error(),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Auth(e) => e.status(),
            Self::Order(e) => e.status(),
            Self::GiftCard(e) => e.status(),
            Self::Review(e) => e.status(),
            Self::Subscription(e) => e.status(),
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Json(rejection) => rejection.status(),
            Self::Path(rejection) => rejection.status(),
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return match self {
                Self::GiftCard(_) => json!({
                    "success": false,
                    "message": "An error occurred while activating the gift card",
                }),
                _ => json!({ "error": "Internal server error" }),
            };
        }

        match self {
            Self::Validation(errors) => validation_body(errors),
            Self::Auth(AuthError::Validation(errors))
            | Self::Order(OrderError::Validation(errors))
            | Self::Review(ReviewError::Validation(errors)) => validation_body(errors),
            Self::GiftCard(GiftCardError::Validation(errors)) => validation_body(errors),
            Self::GiftCard(e) => json!({ "success": false, "message": e.to_string() }),
            Self::Auth(AuthError::InvalidToken) | Self::Unauthenticated => {
                json!({ "message": "Unauthenticated." })
            }
            Self::Auth(e) => json!({ "error": e.to_string() }),
            Self::Order(e) => json!({ "error": e.to_string() }),
            Self::Review(e) => json!({ "error": e.to_string() }),
            Self::Subscription(e) => json!({ "error": e.to_string() }),
            Self::Json(rejection) => json!({ "message": rejection.body_text() }),
            Self::Path(rejection) => json!({ "message": rejection.body_text() }),
            Self::Forbidden(msg) | Self::NotFound(msg) | Self::BadRequest(msg) => {
                json!({ "error": msg })
            }
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }
}

fn validation_body(errors: &ValidationErrors) -> Value {
    json!({ "message": VALIDATION_MESSAGE, "errors": errors })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("box 12".to_string());
        assert_eq!(err.to_string(), "Not found: box 12");

        let err = AppError::BadRequest("Cart is empty".to_string());
        assert_eq!(err.to_string(), "Bad request: Cart is empty");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(AppError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationErrors::single("name", "bad"))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_shape() {
        let err = AppError::Validation(ValidationErrors::single(
            "email",
            "The email has already been taken.",
        ));
        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], VALIDATION_MESSAGE);
        assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
    }

    #[tokio::test]
    async fn test_unauthenticated_body() {
        let body = body_json(AppError::Unauthenticated.into_response()).await;
        assert_eq!(body, json!({ "message": "Unauthenticated." }));
    }

    #[tokio::test]
    async fn test_gift_card_body_shape() {
        let response = AppError::GiftCard(GiftCardError::AlreadyUsed).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({ "success": false, "message": "This gift card has already been used" })
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = body_json(AppError::Internal("pool exhausted".to_string()).into_response()).await;
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }
}
