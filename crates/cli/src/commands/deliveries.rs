//! `loomi-cli process-deliveries`: one run of the delivery processor.

use chrono::Utc;

use loomi_api::services::deliveries::DeliveryProcessor;

use super::{CommandError, connect};

/// Record every due subscription delivery, or only log them with `dry_run`.
pub async fn run(dry_run: bool) -> Result<(), CommandError> {
    let pool = connect().await?;

    if dry_run {
        tracing::info!("Dry run: no delivery will be recorded");
    }
    let report = DeliveryProcessor::new(&pool, dry_run).run(Utc::now()).await?;

    tracing::info!(
        active = report.active,
        created = report.created,
        not_due = report.not_due,
        errors = report.errors,
        "Delivery processing complete!"
    );
    Ok(())
}
