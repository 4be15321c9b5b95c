//! `loomi-cli seed`: upsert the catalog described by a YAML file.
//!
//! Seeding is idempotent: rows are matched by name (label for
//! subscription types, title for articles) and updated in place.

use std::path::Path;

use loomi_api::seed::{SeedData, seed};

use super::{CommandError, connect};

/// Parse, check and apply a seed file.
pub async fn run(file: &Path) -> Result<(), CommandError> {
    let data = load(file)?;

    let pool = connect().await?;
    tracing::info!(file = %file.display(), "Seeding catalog...");
    let report = seed(&pool, &data).await?;

    tracing::info!(
        payment_method_types = report.payment_method_types,
        box_categories = report.box_categories,
        items = report.items,
        boxes = report.boxes,
        subscription_types = report.subscription_types,
        gift_card_types = report.gift_card_types,
        articles = report.articles,
        "Seed complete!"
    );
    Ok(())
}

fn load(file: &Path) -> Result<SeedData, CommandError> {
    let raw = std::fs::read_to_string(file).map_err(|source| CommandError::SeedFile {
        path: file.display().to_string(),
        source,
    })?;
    parse(&raw)
}

fn parse(raw: &str) -> Result<SeedData, CommandError> {
    let data: SeedData = serde_yaml::from_str(raw)?;
    let problems = data.dangling_references();
    if !problems.is_empty() {
        return Err(CommandError::DanglingReferences(problems));
    }
    Ok(data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_file_is_consistent() {
        let raw = include_str!("../../../../data/seed.yaml");
        let data = parse(raw).unwrap();
        assert!(!data.boxes.is_empty());
        assert!(data.payment_method_types.iter().any(|p| p == "Gift Card"));
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let raw = r"
items:
  - name: Tea
boxes:
  - name: Calm
    base_price: '29.90'
    category: garden
    items:
      - name: Tea
";
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, CommandError::DanglingReferences(ref p) if p.len() == 1));
    }
}
