//! The customer's current subscription.

use axum::http::StatusCode;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use loomi_core::{SubscriptionStatus, UserId};

use crate::db::{RepositoryError, SubscriptionRepository};
use crate::models::{GiftCardExtensions, SubscriptionWithType};

/// Errors of the subscription endpoints.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("No active subscription found")]
    NoActiveSubscription,

    #[error("This subscription is already cancelled")]
    AlreadyCancelled,

    #[error("This subscription has already expired")]
    AlreadyExpired,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SubscriptionError {
    pub(crate) const fn is_server_error(&self) -> bool {
        matches!(self, Self::Repository(_))
    }

    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::NoActiveSubscription => StatusCode::NOT_FOUND,
            Self::AlreadyCancelled | Self::AlreadyExpired => StatusCode::BAD_REQUEST,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The user's current subscription and what gift cards added to it.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubscription {
    pub subscription: SubscriptionWithType,
    pub gift_card_extensions: GiftCardExtensions,
}

/// Subscription service.
pub struct SubscriptionService<'a> {
    subscriptions: SubscriptionRepository<'a>,
}

impl<'a> SubscriptionService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            subscriptions: SubscriptionRepository::new(pool),
        }
    }

    /// The subscription of the user's latest active order carrying one.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Repository` if a query fails.
    pub async fn current(
        &self,
        user_id: UserId,
    ) -> Result<Option<CurrentSubscription>, SubscriptionError> {
        let Some((_, subscription_id)) = self.subscriptions.current_order(user_id).await? else {
            return Ok(None);
        };
        let Some(subscription) = self.subscriptions.get_with_type(subscription_id).await? else {
            return Ok(None);
        };
        let cards = self
            .subscriptions
            .gift_card_extensions(user_id, subscription_id)
            .await?;
        Ok(Some(CurrentSubscription {
            subscription,
            gift_card_extensions: GiftCardExtensions::from_cards(cards),
        }))
    }

    /// Cancel the current subscription and deactivate its order.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::NoActiveSubscription` when there is none
    /// - `SubscriptionError::AlreadyCancelled` / `SubscriptionError::AlreadyExpired`
    pub async fn cancel(&self, user_id: UserId) -> Result<SubscriptionWithType, SubscriptionError> {
        let (order_id, subscription_id) = self
            .subscriptions
            .current_order(user_id)
            .await?
            .ok_or(SubscriptionError::NoActiveSubscription)?;
        let current = self
            .subscriptions
            .get(subscription_id)
            .await?
            .ok_or(SubscriptionError::NoActiveSubscription)?;

        match current.status {
            SubscriptionStatus::Cancelled => return Err(SubscriptionError::AlreadyCancelled),
            SubscriptionStatus::Expired => return Err(SubscriptionError::AlreadyExpired),
            SubscriptionStatus::Active => {}
        }

        self.subscriptions.cancel(order_id, subscription_id).await?;
        tracing::info!(subscription_id = %subscription_id, user_id = %user_id, "Subscription cancelled");

        self.subscriptions
            .get_with_type(subscription_id)
            .await?
            .ok_or(SubscriptionError::NoActiveSubscription)
    }
}
