//! Mixed-cart validation, analysis and pricing.
//!
//! A cart mixes one-off boxes, subscriptions, gift card purchases and the
//! redemption of a gift card. Prices always come from a [`PriceBook`] built
//! from the catalog; the client only says *what* it wants.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{BoxId, GiftCardTypeId, OrderStatus, Recurrence, SubscriptionTypeId};

/// Largest quantity a single cart line may ask for.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Kind of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartItemKind {
    Box,
    Subscription,
    GiftCard,
    GiftCardUsage,
}

impl std::str::FromStr for CartItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(Self::Box),
            "subscription" => Ok(Self::Subscription),
            "giftcard" | "gift_card" => Ok(Self::GiftCard),
            "giftcard_usage" => Ok(Self::GiftCardUsage),
            _ => Err(format!("unknown cart item type: {s}")),
        }
    }
}

/// A cart line as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default, rename = "paidWithGiftCard")]
    pub paid_with_gift_card: bool,
    #[serde(default, rename = "giftCardCode")]
    pub gift_card_code: Option<String>,
}

/// A validated cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub kind: CartItemKind,
    /// Catalog id; `None` only for [`CartItemKind::GiftCardUsage`].
    pub id: Option<i32>,
    pub quantity: u32,
    pub paid_with_gift_card: bool,
    pub gift_card_code: Option<String>,
}

impl CartLine {
    /// Whether this line adds to the amount the customer pays.
    #[must_use]
    pub const fn is_billable(&self) -> bool {
        !self.paid_with_gift_card && !matches!(self.kind, CartItemKind::GiftCardUsage)
    }
}

/// A cart rule violation, tied to the offending line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("The cart item type is invalid.")]
    UnknownType { index: usize },
    #[error("The cart item id is required.")]
    MissingId { index: usize },
    #[error("The quantity must be between 1 and 99.")]
    InvalidQuantity { index: usize },
    #[error("Only one subscription can be ordered at a time.")]
    MultipleSubscriptions { index: usize },
    #[error("The selected item does not exist.")]
    UnknownItem { index: usize },
    #[error("The selected item is not available.")]
    InactiveItem { index: usize },
}

impl CartError {
    /// Request field the error belongs to, e.g. `items.2.quantity`.
    #[must_use]
    pub fn field(&self) -> String {
        match self {
            Self::UnknownType { index } => format!("items.{index}.type"),
            Self::MissingId { index }
            | Self::UnknownItem { index }
            | Self::InactiveItem { index }
            | Self::MultipleSubscriptions { index } => format!("items.{index}.id"),
            Self::InvalidQuantity { index } => format!("items.{index}.quantity"),
        }
    }
}

/// Validate raw cart items into [`CartLine`]s.
///
/// Every violation is reported, not only the first.
///
/// # Errors
///
/// Returns all [`CartError`]s found.
pub fn parse_cart(items: &[CartItem]) -> Result<Vec<CartLine>, Vec<CartError>> {
    let mut lines = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    let mut subscriptions = 0usize;

    for (index, item) in items.iter().enumerate() {
        let Ok(kind) = item.kind.parse::<CartItemKind>() else {
            errors.push(CartError::UnknownType { index });
            continue;
        };

        if kind != CartItemKind::GiftCardUsage && item.id.is_none() {
            errors.push(CartError::MissingId { index });
            continue;
        }

        let quantity = match item.quantity {
            None => 1,
            Some(q) => match u32::try_from(q) {
                Ok(q) if (1..=MAX_LINE_QUANTITY).contains(&q) => q,
                _ => {
                    errors.push(CartError::InvalidQuantity { index });
                    continue;
                }
            },
        };

        if kind == CartItemKind::Subscription {
            subscriptions += 1;
            if subscriptions > 1 || quantity > 1 {
                errors.push(CartError::MultipleSubscriptions { index });
                continue;
            }
        }

        lines.push(CartLine {
            kind,
            id: item.id,
            quantity,
            paid_with_gift_card: item.paid_with_gift_card,
            gift_card_code: item
                .gift_card_code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
        });
    }

    if errors.is_empty() {
        Ok(lines)
    } else {
        Err(errors)
    }
}

/// What a cart contains, computed before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartAnalysis {
    pub has_boxes: bool,
    pub has_subscriptions: bool,
    pub has_gift_cards: bool,
    pub has_gift_card_usage: bool,
    /// Code of the gift card the cart redeems, if the client named one.
    pub gift_card_code: Option<String>,
    pub paid_items: usize,
    pub free_items: usize,
}

impl CartAnalysis {
    /// Analyse validated cart lines.
    #[must_use]
    pub fn of(lines: &[CartLine]) -> Self {
        let mut analysis = Self::default();

        for line in lines {
            match line.kind {
                CartItemKind::Box | CartItemKind::Subscription => {
                    if line.kind == CartItemKind::Box {
                        analysis.has_boxes = true;
                    } else {
                        analysis.has_subscriptions = true;
                    }
                    if line.paid_with_gift_card {
                        analysis.free_items += 1;
                        analysis.has_gift_card_usage = true;
                        if line.gift_card_code.is_some() {
                            analysis.gift_card_code.clone_from(&line.gift_card_code);
                        }
                    } else {
                        analysis.paid_items += 1;
                    }
                }
                CartItemKind::GiftCard => {
                    analysis.has_gift_cards = true;
                    analysis.paid_items += 1;
                }
                CartItemKind::GiftCardUsage => {
                    analysis.has_gift_card_usage = true;
                    analysis.gift_card_code.clone_from(&line.gift_card_code);
                }
            }
        }

        analysis
    }

    /// Status the order settles on once every line is persisted.
    ///
    /// Nothing ships for subscription-only or gift-card-only carts, and a
    /// fully gift-card-covered cart has nothing left to pay.
    #[must_use]
    pub fn final_status(&self, total: Decimal) -> OrderStatus {
        let subscriptions_only = self.has_subscriptions && !self.has_boxes && !self.has_gift_cards;
        let gift_cards_only = self.has_gift_cards && !self.has_boxes && !self.has_subscriptions;
        let free = total.is_zero() && self.free_items > 0;

        if subscriptions_only || gift_cards_only || free {
            OrderStatus::Completed
        } else {
            OrderStatus::Pending
        }
    }
}

/// Catalog price and availability of one purchasable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogPrice {
    pub price: Decimal,
    pub active: bool,
}

/// Catalog entry of a subscription type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPrice {
    pub price: Decimal,
    pub recurrence: Recurrence,
}

/// Catalog prices for the ids a cart references.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    pub boxes: HashMap<BoxId, CatalogPrice>,
    pub subscription_types: HashMap<SubscriptionTypeId, SubscriptionPrice>,
    pub gift_card_types: HashMap<GiftCardTypeId, CatalogPrice>,
}

impl PriceBook {
    /// Ids per catalog table referenced by `lines`, for loading the book.
    #[must_use]
    pub fn wanted(
        lines: &[CartLine],
    ) -> (Vec<BoxId>, Vec<SubscriptionTypeId>, Vec<GiftCardTypeId>) {
        let mut boxes = Vec::new();
        let mut subscription_types = Vec::new();
        let mut gift_card_types = Vec::new();
        for line in lines {
            let Some(id) = line.id else { continue };
            match line.kind {
                CartItemKind::Box => boxes.push(BoxId::new(id)),
                CartItemKind::Subscription => subscription_types.push(SubscriptionTypeId::new(id)),
                CartItemKind::GiftCard => gift_card_types.push(GiftCardTypeId::new(id)),
                CartItemKind::GiftCardUsage => {}
            }
        }
        boxes.sort_unstable();
        boxes.dedup();
        subscription_types.sort_unstable();
        subscription_types.dedup();
        gift_card_types.sort_unstable();
        gift_card_types.dedup();
        (boxes, subscription_types, gift_card_types)
    }

    fn unit_price(&self, index: usize, line: &CartLine) -> Result<Option<Decimal>, CartError> {
        let Some(id) = line.id else {
            return Ok(None);
        };
        let entry = match line.kind {
            CartItemKind::Box => self.boxes.get(&BoxId::new(id)).copied(),
            CartItemKind::Subscription => self
                .subscription_types
                .get(&SubscriptionTypeId::new(id))
                .map(|s| CatalogPrice {
                    price: s.price,
                    active: true,
                }),
            CartItemKind::GiftCard => self.gift_card_types.get(&GiftCardTypeId::new(id)).copied(),
            CartItemKind::GiftCardUsage => return Ok(None),
        };
        match entry {
            None => Err(CartError::UnknownItem { index }),
            Some(entry) if !entry.active => Err(CartError::InactiveItem { index }),
            Some(entry) => Ok(Some(entry.price)),
        }
    }

    /// Amount due for `lines`: catalog price times quantity over the
    /// billable lines.
    ///
    /// Lines covered by a gift card are still checked against the catalog.
    ///
    /// # Errors
    ///
    /// Returns every unknown or inactive catalog reference.
    pub fn total(&self, lines: &[CartLine]) -> Result<Decimal, Vec<CartError>> {
        let mut total = Decimal::ZERO;
        let mut errors = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            match self.unit_price(index, line) {
                Ok(Some(price)) if line.is_billable() => {
                    total += price * Decimal::from(line.quantity);
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(total)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(kind: &str, id: Option<i32>, quantity: Option<i64>) -> CartItem {
        CartItem {
            kind: kind.to_owned(),
            id,
            quantity,
            paid_with_gift_card: false,
            gift_card_code: None,
        }
    }

    fn book() -> PriceBook {
        let mut book = PriceBook::default();
        book.boxes.insert(
            BoxId::new(1),
            CatalogPrice {
                price: dec("29.90"),
                active: true,
            },
        );
        book.boxes.insert(
            BoxId::new(2),
            CatalogPrice {
                price: dec("10.00"),
                active: false,
            },
        );
        book.subscription_types.insert(
            SubscriptionTypeId::new(1),
            SubscriptionPrice {
                price: dec("24.99"),
                recurrence: Recurrence::Monthly,
            },
        );
        book.gift_card_types.insert(
            GiftCardTypeId::new(1),
            CatalogPrice {
                price: dec("50.00"),
                active: true,
            },
        );
        book
    }

    #[test]
    fn test_parse_cart_defaults_quantity_and_accepts_alias() {
        let lines = parse_cart(&[item("box", Some(1), None), item("gift_card", Some(1), Some(2))])
            .unwrap();
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(lines[1].kind, CartItemKind::GiftCard);
        assert_eq!(lines[1].quantity, 2);
    }

    #[test]
    fn test_parse_cart_collects_every_error() {
        let errors = parse_cart(&[
            item("voucher", Some(1), None),
            item("box", None, None),
            item("box", Some(1), Some(0)),
            item("subscription", Some(1), None),
            item("subscription", Some(1), None),
        ])
        .unwrap_err();

        assert_eq!(
            errors,
            vec![
                CartError::UnknownType { index: 0 },
                CartError::MissingId { index: 1 },
                CartError::InvalidQuantity { index: 2 },
                CartError::MultipleSubscriptions { index: 4 },
            ]
        );
        assert_eq!(errors[2].field(), "items.2.quantity");
    }

    #[test]
    fn test_parse_cart_caps_line_quantity() {
        let lines = parse_cart(&[item("giftcard", Some(1), Some(99))]).unwrap();
        assert_eq!(lines[0].quantity, MAX_LINE_QUANTITY);

        let errors = parse_cart(&[
            item("box", Some(1), Some(100)),
            item("box", Some(1), Some(3_000_000_000)),
            item("giftcard", Some(1), Some(i64::MAX)),
            item("box", Some(1), Some(-1)),
        ])
        .unwrap_err();
        assert_eq!(
            errors,
            (0..4)
                .map(|index| CartError::InvalidQuantity { index })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_analysis_counts_free_items_and_code() {
        let mut free_box = item("box", Some(1), None);
        free_box.paid_with_gift_card = true;
        free_box.gift_card_code = Some("GIFT-AAAA-BBBB".to_owned());
        let lines = parse_cart(&[free_box, item("giftcard", Some(1), None)]).unwrap();

        let analysis = CartAnalysis::of(&lines);
        assert!(analysis.has_boxes);
        assert!(analysis.has_gift_cards);
        assert!(analysis.has_gift_card_usage);
        assert_eq!(analysis.gift_card_code.as_deref(), Some("GIFT-AAAA-BBBB"));
        assert_eq!(analysis.free_items, 1);
        assert_eq!(analysis.paid_items, 1);
    }

    #[test]
    fn test_total_uses_catalog_prices_and_skips_covered_lines() {
        let mut free_sub = item("subscription", Some(1), None);
        free_sub.paid_with_gift_card = true;
        let lines = parse_cart(&[
            item("box", Some(1), Some(2)),
            free_sub,
            item("giftcard", Some(1), None),
            item("giftcard_usage", None, None),
        ])
        .unwrap();

        assert_eq!(book().total(&lines).unwrap(), dec("109.80"));
    }

    #[test]
    fn test_total_rejects_unknown_and_inactive() {
        let lines = parse_cart(&[item("box", Some(2), None), item("giftcard", Some(9), None)])
            .unwrap();
        assert_eq!(
            book().total(&lines).unwrap_err(),
            vec![
                CartError::InactiveItem { index: 0 },
                CartError::UnknownItem { index: 1 },
            ]
        );
    }

    #[test]
    fn test_final_status() {
        let subs_only = CartAnalysis {
            has_subscriptions: true,
            paid_items: 1,
            ..CartAnalysis::default()
        };
        assert_eq!(subs_only.final_status(dec("24.99")), OrderStatus::Completed);

        let boxes = CartAnalysis {
            has_boxes: true,
            paid_items: 1,
            ..CartAnalysis::default()
        };
        assert_eq!(boxes.final_status(dec("29.90")), OrderStatus::Pending);

        let free_box = CartAnalysis {
            has_boxes: true,
            free_items: 1,
            ..CartAnalysis::default()
        };
        assert_eq!(free_box.final_status(Decimal::ZERO), OrderStatus::Completed);
    }

    #[test]
    fn test_wanted_ids_are_deduplicated() {
        let lines = parse_cart(&[
            item("box", Some(3), None),
            item("box", Some(3), Some(2)),
            item("giftcard", Some(1), None),
        ])
        .unwrap();
        let (boxes, subs, cards) = PriceBook::wanted(&lines);
        assert_eq!(boxes, vec![BoxId::new(3)]);
        assert!(subs.is_empty());
        assert_eq!(cards, vec![GiftCardTypeId::new(1)]);
    }
}
