//! Payment method names as stored vs. as offered to the storefront.

use serde::Serialize;

/// Stored name of gift card payments; never offered as a checkout choice.
pub const GIFT_CARD_PAYMENT: &str = "Gift Card";

/// A checkout choice offered to the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentChoice {
    pub key: &'static str,
    pub label: &'static str,
}

/// Stored payment type name and the storefront choice it maps to.
const CHOICES: [(&str, PaymentChoice); 5] = [
    (
        "Credit Card",
        PaymentChoice {
            key: "cb",
            label: "Credit Card",
        },
    ),
    (
        "PayPal",
        PaymentChoice {
            key: "paypal",
            label: "PayPal",
        },
    ),
    (
        "Apple Pay",
        PaymentChoice {
            key: "applepay",
            label: "Apple Pay",
        },
    ),
    (
        "Google Pay",
        PaymentChoice {
            key: "googlepay",
            label: "Google Pay",
        },
    ),
    (
        "Samsung Pay",
        PaymentChoice {
            key: "samsungpay",
            label: "Samsung Pay",
        },
    ),
];

const VISA: PaymentChoice = PaymentChoice {
    key: "visa",
    label: "Visa",
};

/// Stored payment type name for a checkout key.
///
/// Unknown keys are returned as-is so a type seeded under that exact name
/// still matches.
#[must_use]
pub fn payment_type_name(key: &str) -> &str {
    match key {
        "visa" | "cb" => "Credit Card",
        "paypal" => "PayPal",
        "apple_pay" | "applepay" => "Apple Pay",
        "google_pay" | "googlepay" => "Google Pay",
        "samsung_pay" | "samsungpay" => "Samsung Pay",
        other => other,
    }
}

/// Checkout choices for the stored payment type names.
///
/// Names without a storefront mapping, including gift card, are skipped.
/// `visa` is offered first whenever card payments are available.
#[must_use]
pub fn payment_choices<'a, I>(type_names: I) -> Vec<PaymentChoice>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut choices: Vec<PaymentChoice> = type_names
        .into_iter()
        .filter(|name| *name != GIFT_CARD_PAYMENT)
        .filter_map(|name| {
            CHOICES
                .iter()
                .find(|(stored, _)| *stored == name)
                .map(|(_, choice)| *choice)
        })
        .collect();

    let has_card = choices.iter().any(|c| c.key == "cb");
    let has_visa = choices.iter().any(|c| c.key == VISA.key);
    if has_card && !has_visa {
        choices.insert(0, VISA);
    }
    choices
}

/// Choices served when the payment types cannot be read.
#[must_use]
pub fn fallback_payment_choices() -> Vec<PaymentChoice> {
    let mut choices = vec![VISA];
    choices.extend(CHOICES.iter().take(3).map(|(_, choice)| *choice));
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_type_name_mapping() {
        assert_eq!(payment_type_name("visa"), "Credit Card");
        assert_eq!(payment_type_name("cb"), "Credit Card");
        assert_eq!(payment_type_name("apple_pay"), "Apple Pay");
        assert_eq!(payment_type_name("samsungpay"), "Samsung Pay");
        assert_eq!(payment_type_name("Bank Transfer"), "Bank Transfer");
    }

    #[test]
    fn test_choices_skip_gift_card_and_prepend_visa() {
        let choices = payment_choices(["Gift Card", "PayPal", "Credit Card", "Cash"]);
        let keys: Vec<_> = choices.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["visa", "paypal", "cb"]);
    }

    #[test]
    fn test_choices_without_card_have_no_visa() {
        let choices = payment_choices(["PayPal"]);
        assert_eq!(choices.len(), 1);
        assert_eq!(choices.first().map(|c| c.key), Some("paypal"));
    }

    #[test]
    fn test_fallback_choices() {
        let keys: Vec<_> = fallback_payment_choices().iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["visa", "cb", "paypal", "applepay"]);
    }
}
