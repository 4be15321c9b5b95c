//! Gift card type and gift card repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use loomi_core::cart::CatalogPrice;
use loomi_core::{GiftCardId, GiftCardTypeId, UserId};

use super::RepositoryError;
use crate::models::{GiftCard, GiftCardType, GiftCardTypeSummary, GiftCardView};

const CARD_COLUMNS: &str = "id, code, gift_card_type_id, order_id, activated_by, \
     expiration_date, used_at, created_at";

#[derive(sqlx::FromRow)]
struct PriceRow {
    id: GiftCardTypeId,
    base_price: Decimal,
    active: bool,
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    id: GiftCardId,
    code: String,
    expiration_date: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    type_name: String,
    type_base_price: Decimal,
}

impl From<ViewRow> for GiftCardView {
    fn from(row: ViewRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            expiration_date: row.expiration_date,
            used_at: row.used_at,
            gift_card_type: GiftCardTypeSummary {
                name: row.type_name,
                base_price: row.type_base_price,
            },
        }
    }
}

const VIEW_SELECT: &str = "SELECT gc.id, gc.code, gc.expiration_date, gc.used_at, \
     gct.name AS type_name, gct.base_price AS type_base_price \
     FROM gift_cards gc JOIN gift_card_types gct ON gct.id = gc.gift_card_type_id";

/// Repository for gift card types and issued gift cards.
pub struct GiftCardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GiftCardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Gift card types on sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_types(&self) -> Result<Vec<GiftCardType>, RepositoryError> {
        Ok(sqlx::query_as::<_, GiftCardType>(
            "SELECT id, name, description, base_price, active FROM gift_card_types \
             WHERE active ORDER BY base_price, id",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Price and availability of the given gift card types.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn type_prices(
        &self,
        ids: &[GiftCardTypeId],
    ) -> Result<HashMap<GiftCardTypeId, CatalogPrice>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT id, base_price, active FROM gift_card_types WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    CatalogPrice {
                        price: r.base_price,
                        active: r.active,
                    },
                )
            })
            .collect())
    }

    /// Get a gift card by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: GiftCardId) -> Result<Option<GiftCard>, RepositoryError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM gift_cards WHERE id = $1");
        Ok(sqlx::query_as::<_, GiftCard>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Find a gift card by code, ignoring case. `code` must be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<GiftCard>, RepositoryError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM gift_cards WHERE upper(code) = $1");
        Ok(sqlx::query_as::<_, GiftCard>(&sql)
            .bind(code)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Whether a code is already issued.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM gift_cards WHERE upper(code) = $1)")
                .bind(code)
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Mark an unused card as used by `user_id`.
    ///
    /// Returns `None` when the card was used in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn activate(
        &self,
        id: GiftCardId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<GiftCardView>, RepositoryError> {
        let updated: Option<GiftCardId> = sqlx::query_scalar(
            "UPDATE gift_cards SET activated_by = $2, used_at = $3, updated_at = now() \
             WHERE id = $1 AND used_at IS NULL RETURNING id",
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(id) => self.view(id).await,
            None => Ok(None),
        }
    }

    /// A card with its type summary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, id: GiftCardId) -> Result<Option<GiftCardView>, RepositoryError> {
        let sql = format!("{VIEW_SELECT} WHERE gc.id = $1");
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(GiftCardView::from))
    }

    /// Cards activated by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_activated_by(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GiftCardView>, RepositoryError> {
        let sql = format!(
            "{VIEW_SELECT} WHERE gc.activated_by = $1 ORDER BY gc.used_at DESC NULLS LAST, gc.id DESC"
        );
        let rows = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(GiftCardView::from).collect())
    }
}
