//! Box catalog repository.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use loomi_core::BoxCategoryId;
use loomi_core::BoxId;
use loomi_core::cart::CatalogPrice;

use super::RepositoryError;
use crate::models::{BoxCategory, BoxImage, BoxItem, BoxProduct};

const BOX_COLUMNS: &str = "id, name, description, base_price, active, quantity, available_from, \
     box_category_id, created_at, updated_at";

/// Admin changes to a box; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BoxUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub active: Option<bool>,
    pub quantity: Option<i32>,
    pub box_category_id: Option<BoxCategoryId>,
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    id: BoxId,
    base_price: Decimal,
    active: bool,
}

/// Repository for boxes, their items, images and categories.
pub struct BoxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BoxRepository<'a> {
    /// Create a new box repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Boxes on sale, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<BoxProduct>, RepositoryError> {
        let sql = format!("SELECT {BOX_COLUMNS} FROM boxes WHERE active ORDER BY name, id");
        Ok(sqlx::query_as::<_, BoxProduct>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Every box, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<BoxProduct>, RepositoryError> {
        let sql = format!("SELECT {BOX_COLUMNS} FROM boxes ORDER BY id");
        Ok(sqlx::query_as::<_, BoxProduct>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Get a box by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BoxId) -> Result<Option<BoxProduct>, RepositoryError> {
        let sql = format!("SELECT {BOX_COLUMNS} FROM boxes WHERE id = $1");
        Ok(sqlx::query_as::<_, BoxProduct>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Whether a box exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: BoxId) -> Result<bool, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boxes WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category(
        &self,
        id: BoxCategoryId,
    ) -> Result<Option<BoxCategory>, RepositoryError> {
        Ok(sqlx::query_as::<_, BoxCategory>(
            "SELECT id, short_name, description FROM box_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Items of a box with their quantities.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, box_id: BoxId) -> Result<Vec<BoxItem>, RepositoryError> {
        Ok(sqlx::query_as::<_, BoxItem>(
            "SELECT i.id, i.name, i.description, bi.quantity \
             FROM box_items bi JOIN items i ON i.id = bi.item_id \
             WHERE bi.box_id = $1 ORDER BY i.name",
        )
        .bind(box_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Images of a box.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, box_id: BoxId) -> Result<Vec<BoxImage>, RepositoryError> {
        Ok(sqlx::query_as::<_, BoxImage>(
            "SELECT id, link, alt, publication_date FROM box_images \
             WHERE box_id = $1 ORDER BY id",
        )
        .bind(box_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Apply an admin update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the box doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: BoxId, update: &BoxUpdate) -> Result<BoxProduct, RepositoryError> {
        let sql = format!(
            "UPDATE boxes SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                base_price = COALESCE($4, base_price), \
                active = COALESCE($5, active), \
                quantity = COALESCE($6, quantity), \
                box_category_id = COALESCE($7, box_category_id), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {BOX_COLUMNS}"
        );
        sqlx::query_as::<_, BoxProduct>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.description.as_deref())
            .bind(update.base_price)
            .bind(update.active)
            .bind(update.quantity)
            .bind(update.box_category_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Catalog price and availability of the given boxes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn prices(
        &self,
        ids: &[BoxId],
    ) -> Result<HashMap<BoxId, CatalogPrice>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT id, base_price, active FROM boxes WHERE id = ANY($1)",
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

    /// IDs of every box on sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_ids(&self) -> Result<Vec<BoxId>, RepositoryError> {
        Ok(
            sqlx::query_scalar::<_, BoxId>("SELECT id FROM boxes WHERE active ORDER BY id")
                .fetch_all(self.pool)
                .await?,
        )
    }
}
