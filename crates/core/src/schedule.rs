//! Calendar arithmetic for orders and subscription deliveries.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};

use crate::types::{DeliveryFrequency, Recurrence};

/// Business days between an order and its estimated box delivery.
pub const ORDER_DELIVERY_BUSINESS_DAYS: u32 = 7;

/// Add `months` calendar months, clamping to the end of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Same as [`add_months`] for a timestamp; the time of day is kept.
#[must_use]
pub fn add_months_at(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Add `days` business days (Monday to Friday) to `date`.
#[must_use]
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            return current;
        };
        current = next;
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}

/// Estimated delivery date of boxes ordered on `ordered_on`.
#[must_use]
pub fn order_delivery_date(ordered_on: NaiveDate) -> NaiveDate {
    add_business_days(ordered_on, ORDER_DELIVERY_BUSINESS_DAYS)
}

/// Last day of a subscription started on `start` with `recurrence`.
#[must_use]
pub fn subscription_end_date(start: NaiveDate, recurrence: Recurrence) -> NaiveDate {
    add_months(start, recurrence.duration_months())
}

impl DeliveryFrequency {
    /// Timestamp of the delivery following one made at `at`.
    #[must_use]
    pub fn advance(self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Weekly => at + chrono::Duration::days(7),
            Self::Biweekly => at + chrono::Duration::days(14),
            Self::Monthly => add_months_at(at, 1),
            Self::Quarterly => add_months_at(at, 3),
        }
    }
}

/// When the next box of a subscription is due.
///
/// The first box is due one month after the start date, at midnight UTC.
/// After that each box is due one `frequency` step after the previous one.
#[must_use]
pub fn next_delivery_due(
    start_date: NaiveDate,
    frequency: DeliveryFrequency,
    last_delivered_at: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match last_delivered_at {
        Some(last) => frequency.advance(last),
        None => add_months(start_date, 1)
            .and_hms_opt(0, 0, 0)
            .map_or(DateTime::<Utc>::MAX_UTC, |dt| dt.and_utc()),
    }
}

/// Whether a subscription is within its active window on `today`.
#[must_use]
pub fn is_running_on(start_date: NaiveDate, end_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    start_date <= today && end_date.is_none_or(|end| end >= today)
}
