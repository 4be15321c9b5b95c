//! Typed row IDs.
//!
//! Every table keyed by a `SERIAL` gets its own wrapper so a `BoxId` can't be
//! bound where an `OrderId` is expected. IDs serialize as bare numbers and,
//! with the `postgres` feature, bind as `INTEGER`.

/// Declare `i32` ID newtypes, grouped under a shared doc line each.
macro_rules! ids {
    ($($(#[$doc:meta])* $name:ident;)+) => {$(
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    )+};
}

ids! {
    /// A customer or admin account.
    UserId;

    /// A box for sale or in rotation.
    BoxId;
    BoxCategoryId;
    ItemId;
    BoxImageId;
    /// A subscription offer (monthly, quarterly, ...).
    SubscriptionTypeId;
    GiftCardTypeId;
    PaymentMethodTypeId;
    ArticleId;

    OrderId;
    /// A box line of an order.
    BoxOrderId;
    /// A subscription bought through an order.
    SubscriptionId;
    SubscriptionDeliveryId;
    GiftCardId;
    /// A payment recorded against an order.
    PaymentMethodId;
    ReviewId;
}
