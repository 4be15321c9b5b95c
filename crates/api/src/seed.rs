//! Catalog seeding.
//!
//! The catalog is described in YAML (see `data/seed.yaml`) and upserted by
//! natural key, so seeding twice leaves the database unchanged.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};

use loomi_core::Recurrence;

use crate::db::RepositoryError;

/// Everything the seeder writes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub payment_method_types: Vec<String>,
    pub box_categories: Vec<SeedCategory>,
    pub items: Vec<SeedItem>,
    pub boxes: Vec<SeedBox>,
    pub subscription_types: Vec<SeedSubscriptionType>,
    pub gift_card_types: Vec<SeedGiftCardType>,
    pub articles: Vec<SeedArticle>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub short_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedItem {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBox {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default = "active")]
    pub active: bool,
    #[serde(default)]
    pub quantity: i32,
    /// `short_name` of the category.
    pub category: Option<String>,
    #[serde(default)]
    pub items: Vec<SeedBoxItem>,
    #[serde(default)]
    pub images: Vec<SeedImage>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBoxItem {
    /// `name` of the item.
    pub name: String,
    #[serde(default = "one")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SeedImage {
    pub link: String,
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSubscriptionType {
    pub label: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub delivery: Option<String>,
    pub return_policy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedGiftCardType {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default = "active")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedArticle {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    #[serde(default = "active")]
    pub published: bool,
}

const fn active() -> bool {
    true
}

const fn one() -> i32 {
    1
}

/// Rows written per table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedReport {
    pub payment_method_types: usize,
    pub box_categories: usize,
    pub items: usize,
    pub boxes: usize,
    pub subscription_types: usize,
    pub gift_card_types: usize,
    pub articles: usize,
}

impl SeedData {
    /// References that point nowhere: unknown categories or items.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for product in &self.boxes {
            if let Some(category) = &product.category
                && !self.box_categories.iter().any(|c| &c.short_name == category)
            {
                problems.push(format!("box '{}': unknown category '{category}'", product.name));
            }
            for item in &product.items {
                if !self.items.iter().any(|i| i.name == item.name) {
                    problems.push(format!("box '{}': unknown item '{}'", product.name, item.name));
                }
            }
        }
        problems
    }
}

/// Upsert the whole catalog in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails; nothing is
/// written in that case.
pub async fn seed(pool: &PgPool, data: &SeedData) -> Result<SeedReport, RepositoryError> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for name in &data.payment_method_types {
        sqlx::query("INSERT INTO payment_method_types (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        report.payment_method_types += 1;
    }

    let mut categories: HashMap<&str, i32> = HashMap::new();
    for category in &data.box_categories {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO box_categories (short_name, description) VALUES ($1, $2) \
             ON CONFLICT (short_name) DO UPDATE SET description = EXCLUDED.description \
             RETURNING id",
        )
        .bind(&category.short_name)
        .bind(&category.description)
        .fetch_one(&mut *tx)
        .await?;
        categories.insert(&category.short_name, id);
        report.box_categories += 1;
    }

    let mut items: HashMap<&str, i32> = HashMap::new();
    for item in &data.items {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO items (name, description) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description, updated_at = now() \
             RETURNING id",
        )
        .bind(&item.name)
        .bind(&item.description)
        .fetch_one(&mut *tx)
        .await?;
        items.insert(&item.name, id);
        report.items += 1;
    }

    for product in &data.boxes {
        let category_id = product
            .category
            .as_deref()
            .and_then(|c| categories.get(c).copied());
        seed_box(&mut tx, product, category_id, &items).await?;
        report.boxes += 1;
    }

    for subscription_type in &data.subscription_types {
        sqlx::query(
            "INSERT INTO subscription_types \
                (label, description, price, recurrence, delivery, return_policy) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (label) DO UPDATE SET \
                description = EXCLUDED.description, price = EXCLUDED.price, \
                recurrence = EXCLUDED.recurrence, delivery = EXCLUDED.delivery, \
                return_policy = EXCLUDED.return_policy, updated_at = now()",
        )
        .bind(&subscription_type.label)
        .bind(&subscription_type.description)
        .bind(subscription_type.price)
        .bind(subscription_type.recurrence)
        .bind(&subscription_type.delivery)
        .bind(&subscription_type.return_policy)
        .execute(&mut *tx)
        .await?;
        report.subscription_types += 1;
    }

    for gift_card_type in &data.gift_card_types {
        sqlx::query(
            "INSERT INTO gift_card_types (name, description, base_price, active) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO UPDATE SET \
                description = EXCLUDED.description, base_price = EXCLUDED.base_price, \
                active = EXCLUDED.active, updated_at = now()",
        )
        .bind(&gift_card_type.name)
        .bind(&gift_card_type.description)
        .bind(gift_card_type.base_price)
        .bind(gift_card_type.active)
        .execute(&mut *tx)
        .await?;
        report.gift_card_types += 1;
    }

    for article in &data.articles {
        sqlx::query(
            "INSERT INTO articles (title, excerpt, content, image_url, published) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (title) DO UPDATE SET \
                excerpt = EXCLUDED.excerpt, content = EXCLUDED.content, \
                image_url = EXCLUDED.image_url, published = EXCLUDED.published, \
                updated_at = now()",
        )
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.image_url)
        .bind(article.published)
        .execute(&mut *tx)
        .await?;
        report.articles += 1;
    }

    tx.commit().await?;
    Ok(report)
}

/// Upsert a box, its contents and its images (images are replaced).
async fn seed_box(
    tx: &mut Transaction<'_, Postgres>,
    product: &SeedBox,
    category_id: Option<i32>,
    items: &HashMap<&str, i32>,
) -> Result<(), RepositoryError> {
    let box_id: i32 = sqlx::query_scalar(
        "INSERT INTO boxes (name, description, base_price, active, quantity, box_category_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (name) DO UPDATE SET \
            description = EXCLUDED.description, base_price = EXCLUDED.base_price, \
            active = EXCLUDED.active, quantity = EXCLUDED.quantity, \
            box_category_id = EXCLUDED.box_category_id, updated_at = now() \
         RETURNING id",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.base_price)
    .bind(product.active)
    .bind(product.quantity)
    .bind(category_id)
    .fetch_one(&mut **tx)
    .await?;

    for line in &product.items {
        let Some(item_id) = items.get(line.name.as_str()) else {
            tracing::warn!(box_name = %product.name, item = %line.name, "Skipping unknown item");
            continue;
        };
        sqlx::query(
            "INSERT INTO box_items (box_id, item_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (box_id, item_id) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(box_id)
        .bind(item_id)
        .bind(line.quantity)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("DELETE FROM box_images WHERE box_id = $1")
        .bind(box_id)
        .execute(&mut **tx)
        .await?;
    for image in &product.images {
        sqlx::query("INSERT INTO box_images (box_id, link, alt) VALUES ($1, $2, $3)")
            .bind(box_id)
            .bind(&image.link)
            .bind(&image.alt)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_references() {
        let data = SeedData {
            box_categories: vec![SeedCategory {
                short_name: "wellness".to_owned(),
                description: None,
            }],
            items: vec![SeedItem {
                name: "Tea".to_owned(),
                description: None,
            }],
            boxes: vec![SeedBox {
                name: "Calm".to_owned(),
                description: None,
                base_price: Decimal::new(2990, 2),
                active: true,
                quantity: 10,
                category: Some("garden".to_owned()),
                items: vec![
                    SeedBoxItem {
                        name: "Tea".to_owned(),
                        quantity: 2,
                    },
                    SeedBoxItem {
                        name: "Candle".to_owned(),
                        quantity: 1,
                    },
                ],
                images: Vec::new(),
            }],
            ..SeedData::default()
        };

        assert_eq!(
            data.dangling_references(),
            [
                "box 'Calm': unknown category 'garden'",
                "box 'Calm': unknown item 'Candle'"
            ]
        );
    }
}
