//! Reviews of boxes and subscription types.

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use loomi_core::rating::{Rating, RatingSummary};
use loomi_core::{BoxId, ReviewId, SubscriptionTypeId, UserId};

use crate::db::reviews::ReviewTarget;
use crate::db::{
    BoxRepository, RepositoryError, ReviewRepository, SubscriptionRepository,
    SubscriptionTypeRepository,
};
use crate::models::{Review, ReviewWithAuthor};
use crate::validation::ValidationErrors;

/// Longest accepted comment.
const MAX_COMMENT_LENGTH: usize = 1000;

/// Errors that can occur during review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("You can only review boxes you have received")]
    NotReceived,

    #[error("You can only review subscriptions you have held")]
    NotSubscribed,

    #[error("You have already reviewed this item")]
    Duplicate,

    #[error("Review not found")]
    NotFound,

    #[error("{0} not found")]
    TargetNotFound(&'static str),

    #[error("Not allowed to {0} this review")]
    NotAuthor(&'static str),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for ReviewError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl ReviewError {
    pub(crate) const fn is_server_error(&self) -> bool {
        matches!(self, Self::Repository(_))
    }

    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotReceived | Self::NotSubscribed | Self::NotAuthor(_) => StatusCode::FORBIDDEN,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::NotFound | Self::TargetNotFound(_) => StatusCode::NOT_FOUND,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReviewInput {
    pub box_id: Option<i32>,
    pub subscription_type_id: Option<i32>,
    pub rating: Option<Decimal>,
    pub comment: Option<String>,
}

/// Body of `PUT /api/reviews/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewInput {
    pub rating: Option<Decimal>,
    pub comment: Option<String>,
}

/// Reviews of one target with their aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<ReviewWithAuthor>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

/// Review service.
pub struct ReviewService<'a> {
    pool: &'a PgPool,
    reviews: ReviewRepository<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            reviews: ReviewRepository::new(pool),
        }
    }

    /// Create a review by `user_id`.
    ///
    /// # Errors
    ///
    /// - `ReviewError::Validation` for bad fields or an unknown target
    /// - `ReviewError::NotReceived` / `ReviewError::NotSubscribed` when the
    ///   user never got what they rate
    /// - `ReviewError::Duplicate` when they already reviewed it
    pub async fn create(
        &self,
        user_id: UserId,
        input: &CreateReviewInput,
    ) -> Result<Review, ReviewError> {
        let (target, rating, comment) = validate_create(input)?;
        self.ensure_target_exists(target).await?;

        let allowed = match target {
            ReviewTarget::Box(box_id) => self.reviews.has_received_box(user_id, box_id).await?,
            ReviewTarget::SubscriptionType(type_id) => {
                SubscriptionRepository::new(self.pool)
                    .user_holds_type(user_id, type_id)
                    .await?
            }
        };
        if !allowed {
            return Err(match target {
                ReviewTarget::Box(_) => ReviewError::NotReceived,
                ReviewTarget::SubscriptionType(_) => ReviewError::NotSubscribed,
            });
        }

        if self.reviews.by_user_for(user_id, target).await?.is_some() {
            return Err(ReviewError::Duplicate);
        }

        let review = self
            .reviews
            .create(user_id, target, rating.value(), comment)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ReviewError::Duplicate,
                other => ReviewError::Repository(other),
            })?;
        tracing::info!(review_id = %review.id, user_id = %user_id, "Review created");
        Ok(review)
    }

    /// Update the author's own review.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` when the review doesn't exist
    /// - `ReviewError::NotAuthor` when `user_id` didn't write it
    /// - `ReviewError::Validation` for bad fields
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReviewId,
        input: &UpdateReviewInput,
    ) -> Result<Review, ReviewError> {
        let review = self.reviews.get(id).await?.ok_or(ReviewError::NotFound)?;
        if review.user_id != user_id {
            return Err(ReviewError::NotAuthor("modify"));
        }

        let mut errors = ValidationErrors::new();
        let rating = validate_rating(&mut errors, input.rating);
        let comment = errors.optional("comment", input.comment.as_deref(), MAX_COMMENT_LENGTH);
        let Some(rating) = rating.filter(|_| errors.is_empty()) else {
            return Err(errors.into());
        };

        self.reviews
            .update(id, rating.value(), comment)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ReviewError::NotFound,
                other => ReviewError::Repository(other),
            })
    }

    /// Delete a review; its author or an admin may.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` when the review doesn't exist
    /// - `ReviewError::NotAuthor` for anyone else
    pub async fn delete(&self, user_id: UserId, is_admin: bool, id: ReviewId) -> Result<(), ReviewError> {
        let review = self.reviews.get(id).await?.ok_or(ReviewError::NotFound)?;
        if review.user_id != user_id && !is_admin {
            return Err(ReviewError::NotAuthor("delete"));
        }
        self.reviews.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ReviewError::NotFound,
            other => ReviewError::Repository(other),
        })?;
        tracing::info!(review_id = %id, user_id = %user_id, "Review deleted");
        Ok(())
    }

    /// The user's review of a box, if any.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the query fails.
    pub async fn user_review_of_box(
        &self,
        user_id: UserId,
        box_id: BoxId,
    ) -> Result<Option<Review>, ReviewError> {
        Ok(self
            .reviews
            .by_user_for(user_id, ReviewTarget::Box(box_id))
            .await?)
    }

    /// Reviews of a box or subscription type with their aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::TargetNotFound` when the target doesn't exist.
    pub async fn page(&self, target: ReviewTarget) -> Result<ReviewPage, ReviewError> {
        if !self.target_exists(target).await? {
            return Err(ReviewError::TargetNotFound(target_label(target)));
        }
        let reviews = self.reviews.list_for(target).await?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.review.rating));
        Ok(ReviewPage { reviews, summary })
    }

    /// Rating aggregate of a target.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the query fails.
    pub async fn summary(&self, target: ReviewTarget) -> Result<RatingSummary, ReviewError> {
        Ok(RatingSummary::from_ratings(
            self.reviews.ratings_for(target).await?,
        ))
    }

    async fn target_exists(&self, target: ReviewTarget) -> Result<bool, RepositoryError> {
        match target {
            ReviewTarget::Box(id) => BoxRepository::new(self.pool).exists(id).await,
            ReviewTarget::SubscriptionType(id) => {
                SubscriptionTypeRepository::new(self.pool).exists(id).await
            }
        }
    }

    async fn ensure_target_exists(&self, target: ReviewTarget) -> Result<(), ReviewError> {
        if self.target_exists(target).await? {
            return Ok(());
        }
        let field = match target {
            ReviewTarget::Box(_) => "box_id",
            ReviewTarget::SubscriptionType(_) => "subscription_type_id",
        };
        Err(ValidationErrors::single(
            field,
            format!("The selected {} is invalid.", field.replace('_', " ")),
        )
        .into())
    }
}

const fn target_label(target: ReviewTarget) -> &'static str {
    match target {
        ReviewTarget::Box(_) => "Box",
        ReviewTarget::SubscriptionType(_) => "Subscription type",
    }
}

fn validate_rating(errors: &mut ValidationErrors, rating: Option<Decimal>) -> Option<Rating> {
    let Some(rating) = rating else {
        errors.add("rating", "The rating field is required.");
        return None;
    };
    match Rating::new(rating) {
        Ok(rating) => Some(rating),
        Err(e) => {
            errors.add("rating", e.to_string());
            None
        }
    }
}

fn validate_create(
    input: &CreateReviewInput,
) -> Result<(ReviewTarget, Rating, Option<&str>), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let target = match (input.box_id, input.subscription_type_id) {
        (Some(id), None) => Some(ReviewTarget::Box(BoxId::new(id))),
        (None, Some(id)) => Some(ReviewTarget::SubscriptionType(SubscriptionTypeId::new(id))),
        (None, None) => {
            errors.add(
                "box_id",
                "The box id field is required when subscription type id is not present.",
            );
            None
        }
        (Some(_), Some(_)) => {
            errors.add(
                "subscription_type_id",
                "The subscription type id field is prohibited when box id is present.",
            );
            None
        }
    };
    let rating = validate_rating(&mut errors, input.rating);
    let comment = errors.optional("comment", input.comment.as_deref(), MAX_COMMENT_LENGTH);

    match (target, rating) {
        (Some(target), Some(rating)) if errors.is_empty() => Ok((target, rating, comment)),
        _ => Err(errors),
    }
}
