//! Gift card activation.

use axum::http::StatusCode;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use loomi_core::UserId;
use loomi_core::gift_card::{self, RedeemError};

use crate::db::{GiftCardRepository, RepositoryError};
use crate::models::GiftCardView;
use crate::validation::ValidationErrors;

/// Errors of the gift card endpoints, reported as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum GiftCardError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("You must be logged in to activate a gift card")]
    NotLoggedIn,

    #[error("Invalid gift card code")]
    InvalidCode,

    #[error("This gift card has already been used")]
    AlreadyUsed,

    #[error("This gift card has expired")]
    Expired,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RedeemError> for GiftCardError {
    fn from(e: RedeemError) -> Self {
        match e {
            RedeemError::AlreadyUsed => Self::AlreadyUsed,
            RedeemError::Expired => Self::Expired,
        }
    }
}

impl GiftCardError {
    pub(crate) const fn is_server_error(&self) -> bool {
        matches!(self, Self::Repository(_))
    }

    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Self::InvalidCode => StatusCode::NOT_FOUND,
            Self::AlreadyUsed | Self::Expired => StatusCode::BAD_REQUEST,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Check the submitted code: required and at most 20 characters.
///
/// # Errors
///
/// Returns `GiftCardError::Validation` describing the problem.
pub fn validate_code(code: Option<&str>) -> Result<String, GiftCardError> {
    let mut errors = ValidationErrors::new();
    let code = errors.required("code", code, gift_card::MAX_CODE_LENGTH);
    match code {
        Some(code) if errors.is_empty() => Ok(gift_card::normalize_code(code)),
        _ => Err(GiftCardError::Validation(errors)),
    }
}

/// Gift card service.
pub struct GiftCardService<'a> {
    cards: GiftCardRepository<'a>,
}

impl<'a> GiftCardService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cards: GiftCardRepository::new(pool),
        }
    }

    /// Activate a gift card for `user_id`, marking it used.
    ///
    /// # Errors
    ///
    /// - `GiftCardError::Validation` for a missing or over-long code
    /// - `GiftCardError::InvalidCode` when no card has this code
    /// - `GiftCardError::AlreadyUsed` / `GiftCardError::Expired`
    pub async fn activate(
        &self,
        user_id: UserId,
        code: Option<&str>,
    ) -> Result<GiftCardView, GiftCardError> {
        let code = validate_code(code)?;
        let card = self
            .cards
            .find_by_code(&code)
            .await?
            .ok_or(GiftCardError::InvalidCode)?;

        let now = Utc::now();
        gift_card::check_redeemable(card.used_at, card.expiration_date, now)?;

        let view = self
            .cards
            .activate(card.id, user_id, now)
            .await?
            .ok_or(GiftCardError::AlreadyUsed)?;

        tracing::info!(gift_card_id = %view.id, user_id = %user_id, "Gift card activated");
        Ok(view)
    }

    /// Cards the user activated, newest first.
    ///
    /// # Errors
    ///
    /// Returns `GiftCardError::Repository` if the query fails.
    pub async fn activated_by(&self, user_id: UserId) -> Result<Vec<GiftCardView>, GiftCardError> {
        Ok(self.cards.list_activated_by(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code(Some(" gift-ab12-cd34 ")).unwrap(), "GIFT-AB12-CD34");

        let Err(GiftCardError::Validation(errors)) = validate_code(None) else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.get("code").unwrap(), ["The code field is required."]);

        let Err(GiftCardError::Validation(errors)) = validate_code(Some(&"X".repeat(21))) else {
            panic!("expected a validation error");
        };
        assert_eq!(
            errors.get("code").unwrap(),
            ["The code field must not be greater than 20 characters."]
        );
    }

    #[test]
    fn test_redeem_errors_map() {
        assert!(matches!(
            GiftCardError::from(RedeemError::Expired),
            GiftCardError::Expired
        ));
        assert_eq!(GiftCardError::AlreadyUsed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(GiftCardError::InvalidCode.status(), StatusCode::NOT_FOUND);
        assert_eq!(GiftCardError::NotLoggedIn.status(), StatusCode::UNAUTHORIZED);
    }
}
