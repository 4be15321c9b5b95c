//! Status and cadence enums for the Loomi entities.
//!
//! Each enum maps to a native `PostgreSQL` enum type when the `postgres`
//! feature is enabled, and to its lowercase (or kebab-case) name in JSON.

use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular customer.
    #[default]
    User,
    /// Back-office access to catalog, deliveries and any review.
    Admin,
}

impl UserRole {
    /// Whether this role grants admin endpoints.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Stored order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Delivery status shown to the customer, derived from an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// Derive the customer-facing status of an order.
    ///
    /// A tracking number wins over the stored status: the parcel is on its
    /// way even if the order row was never moved past `pending`.
    #[must_use]
    pub const fn for_order(status: OrderStatus, has_tracking_number: bool) -> Self {
        if has_tracking_number {
            return Self::Shipped;
        }
        match status {
            OrderStatus::Completed | OrderStatus::Delivered => Self::Delivered,
            OrderStatus::Cancelled => Self::Cancelled,
            OrderStatus::Pending | OrderStatus::Shipped => Self::Pending,
        }
    }

    /// Whether the box reached the customer.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
    Expired,
}

/// How often a subscription ships a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_frequency", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFrequency {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
}

impl std::str::FromStr for DeliveryFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            _ => Err(format!("invalid delivery frequency: {s}")),
        }
    }
}

/// Billing recurrence of a subscription type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_recurrence", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum Recurrence {
    #[default]
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl Recurrence {
    /// Length of one subscription term in months.
    #[must_use]
    pub const fn duration_months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::SemiAnnual => 6,
            Self::Annual => 12,
        }
    }

    /// Shipping cadence a new subscription of this recurrence starts with.
    #[must_use]
    pub const fn default_frequency(self) -> DeliveryFrequency {
        match self {
            Self::Quarterly => DeliveryFrequency::Quarterly,
            Self::Monthly | Self::SemiAnnual | Self::Annual => DeliveryFrequency::Monthly,
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi-annual" => Ok(Self::SemiAnnual),
            "annual" => Ok(Self::Annual),
            _ => Err(format!("invalid recurrence: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_status_prefers_tracking_number() {
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Pending, true),
            DeliveryStatus::Shipped
        );
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Completed, true),
            DeliveryStatus::Shipped
        );
    }

    #[test]
    fn test_delivery_status_from_order_status() {
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Completed, false),
            DeliveryStatus::Delivered
        );
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Delivered, false),
            DeliveryStatus::Delivered
        );
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Cancelled, false),
            DeliveryStatus::Cancelled
        );
        assert_eq!(
            DeliveryStatus::for_order(OrderStatus::Shipped, false),
            DeliveryStatus::Pending
        );
    }

    #[test]
    fn test_recurrence_durations() {
        assert_eq!(Recurrence::Monthly.duration_months(), 1);
        assert_eq!(Recurrence::Quarterly.duration_months(), 3);
        assert_eq!(Recurrence::SemiAnnual.duration_months(), 6);
        assert_eq!(Recurrence::Annual.duration_months(), 12);
    }

    #[test]
    fn test_recurrence_serde_is_kebab_case() {
        let json = serde_json::to_string(&Recurrence::SemiAnnual).unwrap_or_default();
        assert_eq!(json, "\"semi-annual\"");
        assert_eq!("semi-annual".parse(), Ok(Recurrence::SemiAnnual));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse(), Ok(UserRole::Admin));
        assert!("root".parse::<UserRole>().is_err());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
    }
}
