//! Review ratings and their aggregates.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer, ser::SerializeMap};

/// Errors from constructing a [`Rating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("The rating must be between 0.5 and 5.")]
    OutOfRange,
}

/// A review rating between 0.5 and 5, kept at one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(Decimal);

impl Rating {
    pub const MIN: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
    pub const MAX: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

    /// Validate a rating and round it to one decimal.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] outside `[0.5, 5]`.
    pub fn new(value: Decimal) -> Result<Self, RatingError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(RatingError::OutOfRange);
        }
        Ok(Self(
            value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
        ))
    }

    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

/// Half-star buckets, highest first.
const BUCKETS: [&str; 10] = ["5", "4.5", "4", "3.5", "3", "2.5", "2", "1.5", "1", "0.5"];

/// Review count per half-star bucket.
///
/// Serializes as a JSON object keyed `"5"`, `"4.5"`, ... `"0.5"` in that
/// order. Ratings that fall between two buckets are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingDistribution([u32; 10]);

impl RatingDistribution {
    fn bucket(rating: Decimal) -> Option<usize> {
        let doubled = (rating * Decimal::TWO).normalize();
        if !doubled.fract().is_zero() {
            return None;
        }
        let halves = u32::try_from(doubled.mantissa()).ok()?;
        // 10 halves is "5" at index 0, 1 half is "0.5" at index 9
        (1..=10)
            .contains(&halves)
            .then(|| 10 - halves as usize)
    }

    fn add(&mut self, rating: Decimal) {
        if let Some(slot) = Self::bucket(rating).and_then(|i| self.0.get_mut(i)) {
            *slot += 1;
        }
    }

    /// Count for one bucket label such as `"4.5"`.
    #[must_use]
    pub fn count(&self, label: &str) -> u32 {
        BUCKETS
            .iter()
            .position(|b| *b == label)
            .and_then(|i| self.0.get(i))
            .copied()
            .unwrap_or(0)
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BUCKETS.len()))?;
        for (label, count) in BUCKETS.iter().zip(self.0.iter()) {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Aggregate of the reviews of one box or subscription type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    /// Mean rating at one decimal, `None` without reviews. A JSON number.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub average_rating: Option<Decimal>,
    pub total_reviews: usize,
    pub rating_distribution: RatingDistribution,
}

impl RatingSummary {
    /// Summarize a set of ratings.
    #[must_use]
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let mut summary = Self::default();
        let mut sum = Decimal::ZERO;
        for rating in ratings {
            summary.total_reviews += 1;
            sum += rating;
            summary.rating_distribution.add(rating);
        }
        if summary.total_reviews > 0 {
            let average = sum / Decimal::from(summary.total_reviews);
            summary.average_rating =
                Some(average.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero));
        }
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(dec("0.5")).is_ok());
        assert!(Rating::new(dec("5")).is_ok());
        assert_eq!(Rating::new(dec("0.4")), Err(RatingError::OutOfRange));
        assert_eq!(Rating::new(dec("5.1")), Err(RatingError::OutOfRange));
        assert_eq!(Rating::new(dec("3.75")).unwrap().value(), dec("3.8"));
    }

    #[test]
    fn test_summary_average_and_distribution() {
        let summary =
            RatingSummary::from_ratings([dec("5.0"), dec("4.5"), dec("4.0"), dec("4.0"), dec("3.7")]);
        assert_eq!(summary.total_reviews, 5);
        assert_eq!(summary.average_rating, Some(dec("4.2")));
        assert_eq!(summary.rating_distribution.count("5"), 1);
        assert_eq!(summary.rating_distribution.count("4.5"), 1);
        assert_eq!(summary.rating_distribution.count("4"), 2);
        assert_eq!(summary.rating_distribution.count("3.5"), 0);
    }

    #[test]
    fn test_summary_without_reviews() {
        let summary = RatingSummary::from_ratings(std::iter::empty());
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.average_rating, None);
    }

    #[test]
    fn test_summary_serializes_average_as_number() {
        let summary = RatingSummary::from_ratings([dec("4.5"), dec("4.0")]);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["average_rating"], serde_json::json!(4.3));
        assert_eq!(json["total_reviews"], 2);

        let empty = serde_json::to_value(RatingSummary::default()).unwrap();
        assert!(empty["average_rating"].is_null());
    }

    #[test]
    fn test_distribution_serializes_in_bucket_order() {
        let summary = RatingSummary::from_ratings([dec("0.5")]);
        let json = serde_json::to_string(&summary.rating_distribution).unwrap();
        assert!(json.starts_with(r#"{"5":0,"4.5":0,"4":0"#));
        assert!(json.ends_with(r#""0.5":1}"#));
    }
}
