//! Delivery history and the subscription delivery processor.
//!
//! The processor walks every running subscription, decides whether its next
//! box is due and, if so, records a delivery of a box the subscription has
//! not received yet.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use loomi_core::{BoxId, DeliveryStatus, SubscriptionDeliveryId, SubscriptionId, UserId, schedule};

use crate::db::deliveries::{OrderDeliveryRow, SubscriptionDeliveryRow};
use crate::db::{BoxRepository, DeliveryRepository, RepositoryError, ReviewRepository, SubscriptionRepository};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::delivery::start_of_day;
use crate::models::{DeliveryEntry, DeliveryType, Subscription, SubscriptionDelivery};
use crate::validation::ValidationErrors;

/// Outcome of one processor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Running subscriptions examined.
    pub active: usize,
    /// Deliveries recorded (or that would be, in a dry run).
    pub created: usize,
    pub not_due: usize,
    pub errors: usize,
}

/// Merged delivery history of a user, newest delivery first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn history(pool: &PgPool, user_id: UserId) -> Result<Vec<DeliveryEntry>, RepositoryError> {
    let deliveries = DeliveryRepository::new(pool);
    let order_lines = deliveries.order_lines(user_id).await?;
    let subscription_rows = deliveries.subscription_deliveries_for(user_id).await?;
    let reviewed: HashSet<BoxId> = ReviewRepository::new(pool)
        .reviewed_box_ids(user_id)
        .await?
        .into_iter()
        .collect();

    Ok(merge_history(order_lines, subscription_rows, &reviewed))
}

/// Build the history from order lines and delivered subscription boxes.
///
/// Only order lines whose derived status is delivered appear.
#[must_use]
pub fn merge_history(
    order_lines: Vec<OrderDeliveryRow>,
    subscription_rows: Vec<SubscriptionDeliveryRow>,
    reviewed: &HashSet<BoxId>,
) -> Vec<DeliveryEntry> {
    let mut entries: Vec<DeliveryEntry> = order_lines
        .into_iter()
        .filter_map(|row| {
            let status = DeliveryStatus::for_order(row.status, row.tracking_number.is_some());
            status.is_delivered().then(|| DeliveryEntry {
                id: format!("order_{}_{}", row.order_id, row.line_id),
                delivery_type: DeliveryType::Order,
                box_id: row.box_id,
                box_name: row.box_name,
                order_number: Some(row.order_number),
                subscription_name: None,
                quantity: Some(row.quantity),
                order_date: Some(row.created_at),
                delivery_date: row.delivery_date.map_or(row.created_at, start_of_day),
                status,
                tracking_number: row.tracking_number,
                delivery_address: row.delivery_address,
                can_review: !reviewed.contains(&row.box_id),
                is_delivered: true,
            })
        })
        .collect();

    entries.extend(subscription_rows.into_iter().map(|row| DeliveryEntry {
        id: format!("subscription_{}", row.id),
        delivery_type: DeliveryType::Subscription,
        box_id: row.box_id,
        box_name: row.box_name,
        order_number: None,
        subscription_name: Some(row.subscription_name),
        quantity: None,
        order_date: None,
        delivery_date: row.delivered_at,
        status: DeliveryStatus::Delivered,
        tracking_number: None,
        delivery_address: None,
        can_review: !reviewed.contains(&row.box_id),
        is_delivered: true,
    }));

    entries.sort_by_key(|e| std::cmp::Reverse(e.sort_key()));
    entries
}

/// Body of `POST /api/subscription-deliveries`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDeliveryInput {
    pub subscription_id: Option<i32>,
    pub box_id: Option<i32>,
    /// Defaults to now.
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Record a delivery by hand.
///
/// # Errors
///
/// Returns `AppError::Validation` when an ID is missing or unknown.
pub async fn record_delivery(
    pool: &PgPool,
    input: &NewDeliveryInput,
) -> Result<SubscriptionDelivery, AppError> {
    let mut errors = ValidationErrors::new();

    let subscription_id = match input.subscription_id.map(SubscriptionId::new) {
        Some(id) if SubscriptionRepository::new(pool).get(id).await?.is_some() => Some(id),
        Some(_) => {
            errors.add("subscription_id", "The selected subscription id is invalid.");
            None
        }
        None => {
            errors.add("subscription_id", "The subscription id field is required.");
            None
        }
    };
    let box_id = match input.box_id.map(BoxId::new) {
        Some(id) if BoxRepository::new(pool).exists(id).await? => Some(id),
        Some(_) => {
            errors.add("box_id", "The selected box id is invalid.");
            None
        }
        None => {
            errors.add("box_id", "The box id field is required.");
            None
        }
    };

    let (Some(subscription_id), Some(box_id)) = (subscription_id, box_id) else {
        return Err(errors.into());
    };

    let delivered_at = input.delivered_at.unwrap_or_else(Utc::now);
    let delivery = DeliveryRepository::new(pool)
        .create(subscription_id, box_id, Some(delivered_at))
        .await?;
    tracing::info!(delivery_id = %delivery.id, subscription_id = %subscription_id, "Delivery added");
    Ok(delivery)
}

/// Stamp a delivery as delivered now; `None` when it doesn't exist.
///
/// # Errors
///
/// Returns `AppError::Forbidden` unless `user` bought the subscription or is an admin.
pub async fn mark_delivered(
    pool: &PgPool,
    user: &AuthUser,
    id: SubscriptionDeliveryId,
) -> Result<Option<SubscriptionDelivery>, AppError> {
    let deliveries = DeliveryRepository::new(pool);
    let Some(delivery) = deliveries.get(id).await? else {
        return Ok(None);
    };

    if !user.is_admin()
        && !SubscriptionRepository::new(pool)
            .is_owned_by(delivery.subscription_id, user.id)
            .await?
    {
        return Err(AppError::Forbidden("Not allowed to update this delivery".to_string()));
    }

    match deliveries.mark_delivered(id, Utc::now()).await {
        Ok(delivery) => Ok(Some(delivery)),
        Err(RepositoryError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pick the box of the next delivery: a random active box the subscription
/// never received, else any random active box.
#[must_use]
pub fn pick_box(active: &[BoxId], delivered: &HashSet<BoxId>) -> Option<BoxId> {
    let fresh: Vec<BoxId> = active
        .iter()
        .copied()
        .filter(|id| !delivered.contains(id))
        .collect();
    let mut rng = rand::rng();
    if fresh.is_empty() {
        active.choose(&mut rng).copied()
    } else {
        fresh.choose(&mut rng).copied()
    }
}

/// Why one subscription could not be processed.
#[derive(Debug, thiserror::Error)]
enum ProcessError {
    #[error("no active box to deliver")]
    NoActiveBox,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Advances subscription deliveries.
pub struct DeliveryProcessor<'a> {
    pool: &'a PgPool,
    dry_run: bool,
}

impl<'a> DeliveryProcessor<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    /// Process every subscription running at `now`.
    ///
    /// Per-subscription failures are logged and counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the running subscriptions can't be listed.
    #[tracing::instrument(skip(self), fields(dry_run = self.dry_run))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ProcessReport, RepositoryError> {
        let today = now.date_naive();
        let subscriptions = SubscriptionRepository::new(self.pool)
            .running_on(today)
            .await?;
        let active_boxes = BoxRepository::new(self.pool).active_ids().await?;

        let mut report = ProcessReport {
            active: subscriptions.len(),
            ..ProcessReport::default()
        };

        for subscription in &subscriptions {
            match self.process_one(subscription, today, now, &active_boxes).await {
                Ok(true) => report.created += 1,
                Ok(false) => report.not_due += 1,
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to process subscription delivery"
                    );
                }
            }
        }

        tracing::info!(
            active = report.active,
            created = report.created,
            not_due = report.not_due,
            errors = report.errors,
            "Subscription deliveries processed"
        );
        Ok(report)
    }

    /// Returns whether a delivery was due.
    async fn process_one(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
        now: DateTime<Utc>,
        active_boxes: &[BoxId],
    ) -> Result<bool, ProcessError> {
        if !schedule::is_running_on(subscription.start_date, subscription.end_date, today) {
            return Ok(false);
        }

        let deliveries = DeliveryRepository::new(self.pool);
        let last = deliveries.last_delivered_at(subscription.id).await?;
        let due = schedule::next_delivery_due(subscription.start_date, subscription.frequency, last);
        if due > now {
            tracing::debug!(subscription_id = %subscription.id, %due, "Delivery not due");
            return Ok(false);
        }

        let delivered: HashSet<BoxId> = deliveries
            .delivered_box_ids(subscription.id)
            .await?
            .into_iter()
            .collect();
        let box_id = pick_box(active_boxes, &delivered).ok_or(ProcessError::NoActiveBox)?;

        if self.dry_run {
            tracing::info!(subscription_id = %subscription.id, box_id = %box_id, %due, "Would deliver box");
        } else {
            let delivery = deliveries.create(subscription.id, box_id, Some(due)).await?;
            tracing::info!(
                subscription_id = %subscription.id,
                delivery_id = %delivery.id,
                box_id = %box_id,
                "Delivery recorded"
            );
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loomi_core::{BoxOrderId, OrderId, OrderStatus, SubscriptionDeliveryId};

    fn order_row(order: i32, line: i32, status: OrderStatus, tracking: Option<&str>) -> OrderDeliveryRow {
        OrderDeliveryRow {
            order_id: OrderId::new(order),
            order_number: format!("ORD-{order}"),
            status,
            tracking_number: tracking.map(str::to_owned),
            delivery_date: NaiveDate::from_ymd_opt(2025, 2, u32::try_from(order).unwrap()),
            delivery_address: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            line_id: BoxOrderId::new(line),
            box_id: BoxId::new(line),
            box_name: format!("Box {line}"),
            quantity: 1,
        }
    }

    #[test]
    fn test_merge_history_filters_and_sorts() {
        let orders = vec![
            order_row(1, 10, OrderStatus::Completed, None),
            order_row(2, 20, OrderStatus::Pending, None),
            order_row(3, 30, OrderStatus::Delivered, Some("TRACK")),
            order_row(4, 40, OrderStatus::Delivered, None),
        ];
        let subs = vec![SubscriptionDeliveryRow {
            id: SubscriptionDeliveryId::new(7),
            box_id: BoxId::new(10),
            box_name: "Box 10".to_owned(),
            subscription_name: "Monthly".to_owned(),
            delivered_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        }];
        let reviewed: HashSet<BoxId> = [BoxId::new(10)].into_iter().collect();

        let entries = merge_history(orders, subs, &reviewed);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        // pending and shipped (tracking number) orders are left out
        assert_eq!(ids, ["subscription_7", "order_4_40", "order_1_10"]);

        assert_eq!(entries[0].delivery_type, DeliveryType::Subscription);
        assert_eq!(entries[0].subscription_name.as_deref(), Some("Monthly"));
        assert!(!entries[0].can_review);
        assert!(entries[1].can_review);
        assert_eq!(entries[1].status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_pick_box_prefers_undelivered() {
        let active = [BoxId::new(1), BoxId::new(2), BoxId::new(3)];
        let delivered: HashSet<BoxId> = [BoxId::new(1), BoxId::new(3)].into_iter().collect();
        for _ in 0..20 {
            assert_eq!(pick_box(&active, &delivered), Some(BoxId::new(2)));
        }

        let all: HashSet<BoxId> = active.iter().copied().collect();
        assert!(active.contains(&pick_box(&active, &all).unwrap()));
        assert_eq!(pick_box(&[], &HashSet::new()), None);
    }
}
