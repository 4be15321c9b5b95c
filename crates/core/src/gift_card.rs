//! Gift card codes, validity and the subscription months they offer.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Months a purchased gift card stays redeemable.
pub const VALIDITY_MONTHS: u32 = 12;

/// Longest code accepted on activation.
pub const MAX_CODE_LENGTH: usize = 20;

/// Prefix of generated codes (`GIFT-XXXX-XXXX`).
pub const CODE_PREFIX: &str = "GIFT";

static MONTHS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:mois|months?)\b").ok());

/// Subscription months offered by a gift card type, read from its name
/// (`"3 mois"`, `"6 months"`). Names without a count offer one month.
#[must_use]
pub fn months_offered(type_name: &str) -> u32 {
    MONTHS_RE
        .as_ref()
        .and_then(|re| re.captures(type_name))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

/// Build a code from two four-character groups.
#[must_use]
pub fn format_code(first: &str, second: &str) -> String {
    format!(
        "{CODE_PREFIX}-{}-{}",
        first.to_uppercase(),
        second.to_uppercase()
    )
}

/// Canonical form of a user-typed code for lookups.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a gift card cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    #[error("This gift card has already been used")]
    AlreadyUsed,
    #[error("This gift card has expired")]
    Expired,
}

/// Check that a card with these dates can still be redeemed at `now`.
///
/// # Errors
///
/// Returns [`RedeemError::AlreadyUsed`] before checking expiry.
pub fn check_redeemable(
    used_at: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), RedeemError> {
    if used_at.is_some() {
        return Err(RedeemError::AlreadyUsed);
    }
    if expiration_date.is_some_and(|exp| exp < now) {
        return Err(RedeemError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_months_offered() {
        assert_eq!(months_offered("Carte 3 mois"), 3);
        assert_eq!(months_offered("12 Months of boxes"), 12);
        assert_eq!(months_offered("1 month"), 1);
        assert_eq!(months_offered("Gift Card 50"), 1);
    }

    #[test]
    fn test_code_format_and_normalization() {
        assert_eq!(format_code("ab1c", "9xyz"), "GIFT-AB1C-9XYZ");
        assert_eq!(normalize_code("  gift-ab1c-9xyz "), "GIFT-AB1C-9XYZ");
    }

    #[test]
    fn test_check_redeemable() {
        let now = Utc::now();
        assert_eq!(check_redeemable(None, None, now), Ok(()));
        assert_eq!(
            check_redeemable(None, Some(now + Duration::days(1)), now),
            Ok(())
        );
        assert_eq!(
            check_redeemable(None, Some(now - Duration::days(1)), now),
            Err(RedeemError::Expired)
        );
        assert_eq!(
            check_redeemable(Some(now), Some(now - Duration::days(1)), now),
            Err(RedeemError::AlreadyUsed)
        );
    }
}
