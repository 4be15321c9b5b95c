//! Order placement.
//!
//! A cart is validated and priced from the catalog, the gift card it redeems
//! is resolved, and every row the order implies is written in one
//! transaction by [`OrderRepository::place`].

use std::collections::HashSet;

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use loomi_core::cart::{
    CartAnalysis, CartError, CartItem, CartItemKind, CartLine, PriceBook, parse_cart,
};
use loomi_core::payment::{GIFT_CARD_PAYMENT, payment_type_name};
use loomi_core::{
    BoxId, GiftCardId, GiftCardTypeId, OrderId, OrderStatus, SubscriptionTypeId, gift_card,
    schedule,
};

use crate::db::orders::{NewGiftCard, NewOrder, NewPayment, NewSubscription};
use crate::db::{
    BoxRepository, GiftCardRepository, OrderRepository, PaymentRepository, RepositoryError,
    SubscriptionTypeRepository,
};
use crate::models::{GiftCard, User};
use crate::validation::ValidationErrors;

/// Attempts at drawing an unused order number or gift card code.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid or already used gift card")]
    InvalidGiftCard,

    #[error("could not draw an unused {0}")]
    CodeExhausted(&'static str),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for OrderError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl OrderError {
    pub(crate) const fn is_server_error(&self) -> bool {
        matches!(self, Self::Repository(_) | Self::CodeExhausted(_))
    }

    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::EmptyCart | Self::InvalidGiftCard => StatusCode::BAD_REQUEST,
            Self::CodeExhausted(_) | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of `POST /api/order`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrderInput {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub gift_card_id: Option<i32>,
}

/// Summary of a placed order.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_date: Option<NaiveDate>,
}

/// Order placement service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for `user`.
    ///
    /// # Errors
    ///
    /// - `OrderError::EmptyCart` when there are no items
    /// - `OrderError::Validation` for cart or payment method problems
    /// - `OrderError::InvalidGiftCard` when the redeemed gift card is unusable
    #[tracing::instrument(skip(self, user, input), fields(user_id = %user.id, items = input.items.len()))]
    pub async fn place(
        &self,
        user: &User,
        input: &PlaceOrderInput,
    ) -> Result<PlacedOrder, OrderError> {
        if input.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let lines = parse_cart(&input.items).map_err(ValidationErrors::from)?;
        let analysis = CartAnalysis::of(&lines);
        tracing::debug!(?analysis, "Cart analysed");

        let now = Utc::now();
        let redeem = match redeemed_card(&analysis, input.gift_card_id) {
            Some(card) => Some(
                self.redeemable_gift_card(card, now)
                    .await?
                    .ok_or(OrderError::InvalidGiftCard)?,
            ),
            None if analysis.has_gift_card_usage => return Err(OrderError::InvalidGiftCard),
            None => None,
        };

        let book = self.price_book(&lines).await?;
        let total = book.total(&lines).map_err(ValidationErrors::from)?;

        let payments = self
            .payments(input.payment_method.as_deref(), redeem.as_ref(), total)
            .await?;

        let boxes = box_lines(&lines)?;
        let today = now.date_naive();
        let order_number = self.unused_order_number(today).await?;
        let gift_cards = self.new_gift_cards(&lines, now).await?;

        let new = NewOrder {
            user_id: user.id,
            order_number,
            total_amount: total,
            delivery_date: analysis
                .has_boxes
                .then(|| schedule::order_delivery_date(today)),
            delivery_address: delivery_address(user),
            boxes,
            subscription: new_subscription(&lines, &book, today),
            gift_cards,
            redeem: redeem.as_ref().map(|card| card.id),
            payments,
            status: analysis.final_status(total),
            now,
        };

        let order = OrderRepository::new(self.pool)
            .place(&new)
            .await?
            .ok_or(OrderError::InvalidGiftCard)?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            status = %order.status,
            "Order placed"
        );

        Ok(PlacedOrder {
            id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            status: order.status,
            delivery_date: order.delivery_date,
        })
    }

    /// Load the redeemed card. A used or expired card counts as absent.
    async fn redeemable_gift_card(
        &self,
        card: RedeemedCard<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<GiftCard>, OrderError> {
        let repo = GiftCardRepository::new(self.pool);
        let card = match card {
            RedeemedCard::Id(id) => repo.get(id).await?,
            RedeemedCard::Code(code) => repo.find_by_code(&gift_card::normalize_code(code)).await?,
        };
        Ok(card.filter(|c| gift_card::check_redeemable(c.used_at, c.expiration_date, now).is_ok()))
    }

    async fn price_book(&self, lines: &[CartLine]) -> Result<PriceBook, OrderError> {
        let (boxes, subscription_types, gift_card_types) = PriceBook::wanted(lines);
        Ok(PriceBook {
            boxes: BoxRepository::new(self.pool).prices(&boxes).await?,
            subscription_types: SubscriptionTypeRepository::new(self.pool)
                .prices(&subscription_types)
                .await?,
            gift_card_types: GiftCardRepository::new(self.pool)
                .type_prices(&gift_card_types)
                .await?,
        })
    }

    /// Payments of the order: a zero `Gift Card` payment for the redeemed
    /// card, then the amount due with the chosen method.
    async fn payments(
        &self,
        payment_method: Option<&str>,
        redeem: Option<&GiftCard>,
        total: Decimal,
    ) -> Result<Vec<NewPayment>, OrderError> {
        let method = payment_method.map(str::trim).filter(|m| !m.is_empty());
        let due = total > Decimal::ZERO;
        if due && method.is_none() {
            return Err(ValidationErrors::single(
                "payment_method",
                "The payment method field is required when there is an amount to pay.",
            )
            .into());
        }
        let type_name = method.filter(|_| due).map(payment_type_name);

        let mut names = Vec::with_capacity(2);
        if redeem.is_some() {
            names.push(GIFT_CARD_PAYMENT);
        }
        names.extend(type_name);
        let ids = PaymentRepository::new(self.pool).type_ids(&names).await?;

        let mut payments = Vec::with_capacity(names.len());
        if let Some(card) = redeem {
            match ids.get(GIFT_CARD_PAYMENT) {
                Some(&payment_method_type_id) => payments.push(NewPayment {
                    payment_method_type_id,
                    amount: Decimal::ZERO,
                    gift_card_id: Some(card.id),
                }),
                None => tracing::warn!(gift_card_id = %card.id, "Gift Card payment type missing"),
            }
        }
        if let Some(name) = type_name {
            let Some(&payment_method_type_id) = ids.get(name) else {
                return Err(ValidationErrors::single(
                    "payment_method",
                    "The selected payment method is invalid.",
                )
                .into());
            };
            payments.push(NewPayment {
                payment_method_type_id,
                amount: total,
                gift_card_id: None,
            });
        }
        Ok(payments)
    }

    async fn unused_order_number(&self, today: NaiveDate) -> Result<String, OrderError> {
        let orders = OrderRepository::new(self.pool);
        for _ in 0..MAX_CODE_ATTEMPTS {
            let number = order_number(today, &random_token(8));
            if !orders.number_exists(&number).await? {
                return Ok(number);
            }
        }
        Err(OrderError::CodeExhausted("order number"))
    }

    /// Gift cards bought by the cart, each with a fresh unique code.
    async fn new_gift_cards(
        &self,
        lines: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<Vec<NewGiftCard>, OrderError> {
        let repo = GiftCardRepository::new(self.pool);
        let expiration_date = schedule::add_months_at(now, gift_card::VALIDITY_MONTHS);
        let mut drawn = HashSet::new();
        let mut cards = Vec::new();

        for line in lines.iter().filter(|l| l.kind == CartItemKind::GiftCard) {
            let Some(type_id) = line.id.map(GiftCardTypeId::new) else {
                continue;
            };
            for _ in 0..line.quantity {
                let code = self.unused_gift_code(&repo, &drawn).await?;
                drawn.insert(code.clone());
                cards.push(NewGiftCard {
                    gift_card_type_id: type_id,
                    code,
                    expiration_date,
                });
            }
        }
        Ok(cards)
    }

    async fn unused_gift_code(
        &self,
        repo: &GiftCardRepository<'_>,
        drawn: &HashSet<String>,
    ) -> Result<String, OrderError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = gift_card::format_code(&random_token(4), &random_token(4));
            if !drawn.contains(&code) && !repo.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(OrderError::CodeExhausted("gift card code"))
    }
}

/// How the client identified the gift card a cart redeems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedeemedCard<'a> {
    Id(GiftCardId),
    Code(&'a str),
}

/// The card to redeem, by ID first, then by code. A `gift_card_id` sent
/// with a cart that uses no gift card is ignored.
fn redeemed_card(analysis: &CartAnalysis, gift_card_id: Option<i32>) -> Option<RedeemedCard<'_>> {
    if !analysis.has_gift_card_usage {
        return None;
    }
    gift_card_id
        .map(|id| RedeemedCard::Id(GiftCardId::new(id)))
        .or_else(|| analysis.gift_card_code.as_deref().map(RedeemedCard::Code))
}

/// `ORD-YYYYMMDD-XXXXXXXX`.
fn order_number(day: NaiveDate, suffix: &str) -> String {
    format!("ORD-{}-{}", day.format("%Y%m%d"), suffix.to_uppercase())
}

/// Uppercase alphanumeric string of `len` characters.
fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Box rows of the order. Line indexes match the cart's item indexes.
fn box_lines(lines: &[CartLine]) -> Result<Vec<(BoxId, i32)>, ValidationErrors> {
    let mut boxes = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if line.kind != CartItemKind::Box {
            continue;
        }
        let (Some(id), Ok(quantity)) = (line.id, i32::try_from(line.quantity)) else {
            return Err(ValidationErrors::from(vec![CartError::InvalidQuantity { index }]));
        };
        boxes.push((BoxId::new(id), quantity));
    }
    Ok(boxes)
}

fn new_subscription(
    lines: &[CartLine],
    book: &PriceBook,
    today: NaiveDate,
) -> Option<NewSubscription> {
    let line = lines.iter().find(|l| l.kind == CartItemKind::Subscription)?;
    let type_id = SubscriptionTypeId::new(line.id?);
    let entry = book.subscription_types.get(&type_id)?;
    Some(NewSubscription {
        subscription_type_id: type_id,
        frequency: entry.recurrence.default_frequency(),
        start_date: today,
        end_date: schedule::subscription_end_date(today, entry.recurrence),
    })
}

/// The user's postal address on one line, when they gave one.
fn delivery_address(user: &User) -> Option<String> {
    let address = user.address.as_deref()?.trim();
    if address.is_empty() {
        return None;
    }
    let locality = [user.zipcode.as_deref(), user.city.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if locality.is_empty() {
        Some(address.to_owned())
    } else {
        Some(format!("{address}, {locality}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use loomi_core::cart::{CatalogPrice, SubscriptionPrice};
    use loomi_core::{Email, Recurrence, UserId, UserRole};

    fn line(kind: CartItemKind, id: i32, quantity: u32) -> CartLine {
        CartLine {
            kind,
            id: Some(id),
            quantity,
            paid_with_gift_card: false,
            gift_card_code: None,
        }
    }

    fn user(address: Option<&str>, zipcode: Option<&str>, city: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            email: Email::parse("jane@loomi.fr").unwrap(),
            role: UserRole::User,
            address: address.map(str::to_owned),
            city: city.map(str::to_owned),
            zipcode: zipcode.map(str::to_owned),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_number_format() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(order_number(day, "ab12cd34"), "ORD-20250307-AB12CD34");
    }

    #[test]
    fn test_random_token() {
        let token = random_token(8);
        assert_eq!(token.len(), 8);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_box_lines_and_subscription() {
        let lines = vec![
            line(CartItemKind::Box, 3, 2),
            line(CartItemKind::Subscription, 9, 1),
            line(CartItemKind::GiftCard, 4, 1),
        ];
        assert_eq!(box_lines(&lines).unwrap(), vec![(BoxId::new(3), 2)]);

        let mut book = PriceBook::default();
        book.boxes.insert(
            BoxId::new(3),
            CatalogPrice {
                price: Decimal::new(2990, 2),
                active: true,
            },
        );
        book.subscription_types.insert(
            SubscriptionTypeId::new(9),
            SubscriptionPrice {
                price: Decimal::new(7500, 2),
                recurrence: Recurrence::Quarterly,
            },
        );
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let sub = new_subscription(&lines, &book, today).unwrap();
        assert_eq!(sub.subscription_type_id, SubscriptionTypeId::new(9));
        assert_eq!(sub.start_date, today);
        assert_eq!(sub.end_date, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
        assert_eq!(sub.frequency, loomi_core::DeliveryFrequency::Quarterly);
    }

    #[test]
    fn test_box_lines_refuse_unrepresentable_quantity() {
        let lines = vec![
            line(CartItemKind::GiftCard, 4, 1),
            line(CartItemKind::Box, 3, u32::MAX),
        ];
        let errors = box_lines(&lines).unwrap_err();
        assert!(errors.get("items.1.quantity").is_some());
    }

    #[test]
    fn test_redeemed_card_requires_gift_card_usage() {
        let paid = CartAnalysis {
            has_boxes: true,
            paid_items: 1,
            ..CartAnalysis::default()
        };
        assert_eq!(redeemed_card(&paid, Some(5)), None);

        let covered = CartAnalysis {
            has_boxes: true,
            has_gift_card_usage: true,
            free_items: 1,
            gift_card_code: Some("GIFT-AAAA-BBBB".to_owned()),
            ..CartAnalysis::default()
        };
        assert_eq!(
            redeemed_card(&covered, Some(5)),
            Some(RedeemedCard::Id(GiftCardId::new(5)))
        );
        assert_eq!(
            redeemed_card(&covered, None),
            Some(RedeemedCard::Code("GIFT-AAAA-BBBB"))
        );

        let anonymous = CartAnalysis {
            has_gift_card_usage: true,
            ..CartAnalysis::default()
        };
        assert_eq!(redeemed_card(&anonymous, None), None);
    }

    #[test]
    fn test_delivery_address() {
        assert_eq!(delivery_address(&user(None, Some("69001"), Some("Lyon"))), None);
        assert_eq!(
            delivery_address(&user(Some("1 rue de la Paix"), Some("69001"), Some("Lyon"))),
            Some("1 rue de la Paix, 69001 Lyon".to_owned())
        );
        assert_eq!(
            delivery_address(&user(Some("1 rue de la Paix"), None, None)),
            Some("1 rue de la Paix".to_owned())
        );
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(OrderError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(OrderError::InvalidGiftCard.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            OrderError::Validation(ValidationErrors::single("items", "bad")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert!(OrderError::CodeExhausted("order number").is_server_error());
    }
}
