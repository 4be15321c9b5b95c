//! Review repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use loomi_core::{BoxId, ReviewId, SubscriptionTypeId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewWithAuthor, Reviewer};

const REVIEW_COLUMNS: &str =
    "id, user_id, box_id, subscription_type_id, rating, comment, created_at, updated_at";

/// What a review rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTarget {
    Box(BoxId),
    SubscriptionType(SubscriptionTypeId),
}

impl ReviewTarget {
    const fn column(self) -> &'static str {
        match self {
            Self::Box(_) => "box_id",
            Self::SubscriptionType(_) => "subscription_type_id",
        }
    }

    const fn id(self) -> i32 {
        match self {
            Self::Box(id) => id.as_i32(),
            Self::SubscriptionType(id) => id.as_i32(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthoredRow {
    id: ReviewId,
    user_id: UserId,
    box_id: Option<BoxId>,
    subscription_type_id: Option<SubscriptionTypeId>,
    rating: Decimal,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    first_name: String,
    last_name: String,
}

impl From<AuthoredRow> for ReviewWithAuthor {
    fn from(row: AuthoredRow) -> Self {
        Self {
            user: Reviewer {
                id: row.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            review: Review {
                id: row.id,
                user_id: row.user_id,
                box_id: row.box_id,
                subscription_type_id: row.subscription_type_id,
                rating: row.rating,
                comment: row.comment,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the target.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user_id: UserId,
        target: ReviewTarget,
        rating: Decimal,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let sql = format!(
            "INSERT INTO reviews (user_id, {}, rating, comment) VALUES ($1, $2, $3, $4) \
             RETURNING {REVIEW_COLUMNS}",
            target.column()
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .bind(target.id())
            .bind(rating)
            .bind(comment)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "review"))
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Replace rating and comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ReviewId,
        rating: Decimal,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let sql = format!(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = now() \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(rating)
            .bind(comment)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Reviews of a target with their authors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(
        &self,
        target: ReviewTarget,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let sql = format!(
            "SELECT r.id, r.user_id, r.box_id, r.subscription_type_id, r.rating, r.comment, \
                    r.created_at, r.updated_at, u.first_name, u.last_name \
             FROM reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.{} = $1 ORDER BY r.created_at DESC, r.id DESC",
            target.column()
        );
        let rows = sqlx::query_as::<_, AuthoredRow>(&sql)
            .bind(target.id())
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(ReviewWithAuthor::from).collect())
    }

    /// Ratings given to a target.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings_for(&self, target: ReviewTarget) -> Result<Vec<Decimal>, RepositoryError> {
        let sql = format!("SELECT rating FROM reviews WHERE {} = $1", target.column());
        Ok(sqlx::query_scalar(&sql)
            .bind(target.id())
            .fetch_all(self.pool)
            .await?)
    }

    /// The user's review of a target, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_user_for(
        &self,
        user_id: UserId,
        target: ReviewTarget,
    ) -> Result<Option<Review>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND {} = $2",
            target.column()
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .bind(target.id())
            .fetch_optional(self.pool)
            .await?)
    }

    /// Boxes the user has reviewed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reviewed_box_ids(&self, user_id: UserId) -> Result<Vec<BoxId>, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT box_id FROM reviews WHERE user_id = $1 AND box_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Whether the user received the box, through a delivered order or a
    /// delivered subscription box.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_received_box(
        &self,
        user_id: UserId,
        box_id: BoxId,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM orders o JOIN box_orders bo ON bo.order_id = o.id \
                WHERE o.user_id = $1 AND bo.box_id = $2 \
                  AND o.status IN ('delivered', 'completed') \
             ) OR EXISTS( \
                SELECT 1 FROM subscription_deliveries sd \
                JOIN orders o ON o.subscription_id = sd.subscription_id \
                WHERE o.user_id = $1 AND sd.box_id = $2 AND sd.delivered_at IS NOT NULL \
             )",
        )
        .bind(user_id)
        .bind(box_id)
        .fetch_one(self.pool)
        .await?)
    }
}
