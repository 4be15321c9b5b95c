//! Box detail assembly and admin box updates.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use loomi_core::rating::RatingSummary;
use loomi_core::{BoxCategoryId, BoxId};

use crate::db::boxes::BoxUpdate;
use crate::db::reviews::ReviewTarget;
use crate::db::{BoxRepository, RepositoryError, ReviewRepository};
use crate::error::AppError;
use crate::models::BoxDetail;
use crate::validation::ValidationErrors;

/// Body of `PUT /api/admin/boxes/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoxUpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub active: Option<bool>,
    pub quantity: Option<i64>,
    pub box_category_id: Option<i32>,
}

/// A box with category, items, images and rating.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn box_detail(pool: &PgPool, id: BoxId) -> Result<Option<BoxDetail>, RepositoryError> {
    let boxes = BoxRepository::new(pool);
    let Some(product) = boxes.get(id).await? else {
        return Ok(None);
    };

    let category = match product.box_category_id {
        Some(category_id) => boxes.category(category_id).await?,
        None => None,
    };
    let items = boxes.items(id).await?;
    let images = boxes.images(id).await?;
    let summary = RatingSummary::from_ratings(
        ReviewRepository::new(pool)
            .ratings_for(ReviewTarget::Box(id))
            .await?,
    );

    Ok(Some(BoxDetail {
        product,
        category,
        items,
        images,
        average_rating: summary.average_rating,
        total_reviews: summary.total_reviews,
    }))
}

/// Check an admin box update.
///
/// The category's existence is checked separately against the database.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_box_update(input: &BoxUpdateInput) -> Result<BoxUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match input.name.as_deref() {
        Some(name) => errors.required("name", Some(name), 255).map(str::to_owned),
        None => None,
    };

    if input.base_price.is_some_and(|p| p < Decimal::ZERO) {
        errors.add("base_price", "The base price field must be at least 0.");
    }

    let quantity = match input.quantity {
        Some(q) => match i32::try_from(q) {
            Ok(q) if q >= 0 => Some(q),
            _ => {
                errors.add("quantity", "The quantity field must be at least 0.");
                None
            }
        },
        None => None,
    };

    errors.into_result()?;
    Ok(BoxUpdate {
        name,
        description: input.description.clone(),
        base_price: input.base_price,
        active: input.active,
        quantity,
        box_category_id: input.box_category_id.map(BoxCategoryId::new),
    })
}

/// Validate and apply an admin update; `None` when the box doesn't exist.
///
/// # Errors
///
/// Returns `AppError::Validation` for bad fields or an unknown category.
pub async fn update_box(
    pool: &PgPool,
    id: BoxId,
    input: &BoxUpdateInput,
) -> Result<Option<BoxDetail>, AppError> {
    let boxes = BoxRepository::new(pool);
    if !boxes.exists(id).await? {
        return Ok(None);
    }

    let update = validate_box_update(input)?;
    if let Some(category_id) = update.box_category_id
        && boxes.category(category_id).await?.is_none()
    {
        return Err(ValidationErrors::single(
            "box_category_id",
            "The selected box category id is invalid.",
        )
        .into());
    }

    match boxes.update(id, &update).await {
        Ok(_) => Ok(box_detail(pool, id).await?),
        Err(RepositoryError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_box_update() {
        let update = validate_box_update(&BoxUpdateInput {
            name: Some(" Spring box ".to_owned()),
            base_price: Some(Decimal::new(3490, 2)),
            quantity: Some(12),
            active: Some(false),
            ..BoxUpdateInput::default()
        })
        .unwrap();
        assert_eq!(update.name.as_deref(), Some("Spring box"));
        assert_eq!(update.quantity, Some(12));
        assert_eq!(update.active, Some(false));

        let errors = validate_box_update(&BoxUpdateInput {
            name: Some(String::new()),
            base_price: Some(Decimal::new(-1, 0)),
            quantity: Some(-3),
            ..BoxUpdateInput::default()
        })
        .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("base_price").is_some());
        assert!(errors.get("quantity").is_some());
    }
}
