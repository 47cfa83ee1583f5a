//! The `otherFees` document attached to an order detail.
//!
//! Every fee kind is an explicit optional field and discounts are tagged
//! unions, so a document that reaches pricing is already well formed.
//! Documents are stored as JSON and carry a `version` so older rows stay
//! readable when the shape grows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const OTHER_FEES_VERSION: u16 = 1;

/// Largest money amount accepted anywhere in an order: fifteen integral
/// digits and four decimal places.
pub const MAX_AMOUNT: Decimal = dec!(999999999999999.9999);

fn current_version() -> u16 {
    OTHER_FEES_VERSION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct OtherFees {
    #[serde(default = "current_version")]
    pub version: u16,
    #[serde(default)]
    pub packaging: Option<Decimal>,
    #[serde(default)]
    pub insurance: Option<Decimal>,
    /// Flat surcharge added as-is (not multiplied by any weight).
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub shipping_cost: Option<ShippingCost>,
    /// Order-level discount, applied after everything else.
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub product_discount: Vec<ProductDiscount>,
    #[serde(default)]
    pub installments: Option<InstallmentFee>,
}

impl Default for OtherFees {
    fn default() -> Self {
        Self {
            version: OTHER_FEES_VERSION,
            packaging: None,
            insurance: None,
            weight: None,
            shipping_cost: None,
            discount: None,
            product_discount: Vec::new(),
            installments: None,
        }
    }
}

/// Discount expressed either as a percentage of a base or as a flat amount.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    Percent(Decimal),
    Nominal(Decimal),
}

impl Discount {
    pub fn value(&self) -> Decimal {
        match self {
            Discount::Percent(v) | Discount::Nominal(v) => *v,
        }
    }

    /// Amount taken off `base`.
    pub fn amount_of(&self, base: Decimal) -> Decimal {
        match self {
            Discount::Percent(pct) => base * *pct / Decimal::ONE_HUNDRED,
            Discount::Nominal(amount) => *amount,
        }
    }

    /// `"10%"` for percentages, the bare amount otherwise.
    pub fn label(&self) -> String {
        match self {
            Discount::Percent(pct) => format!("{}%", pct.normalize()),
            Discount::Nominal(amount) => amount.normalize().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percent,
    Nominal,
}

/// Discount on the line ordering a specific variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscount {
    #[serde(alias = "produkVariantId")]
    pub product_variant_id: Uuid,
    pub discount_amount: Decimal,
    pub discount_type: DiscountKind,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingCost {
    #[serde(default)]
    pub shipping_service: Option<String>,
    #[serde(default, rename = "type")]
    pub shipping_type: Option<String>,
    #[serde(default)]
    pub cost: Option<Decimal>,
}

/// A partial payment that is added to the order total and recorded as an installment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentFee {
    #[serde(default)]
    pub payment_method_id: Option<Uuid>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

impl InstallmentFee {
    /// Method and non-zero amount, when both are present.
    pub fn billable(&self) -> Option<(Uuid, Decimal)> {
        match (self.payment_method_id, self.amount) {
            (Some(method), Some(amount)) if !amount.is_zero() => Some((method, amount)),
            _ => None,
        }
    }
}

impl OtherFees {
    /// Parses a loosely-typed document, reporting shape errors as `InvalidInput`.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ServiceError> {
        serde_json::from_value(value)
            .map_err(|e| ServiceError::InvalidInput(format!("otherFees: {}", e)))
    }

    pub fn shipping_amount(&self) -> Decimal {
        self.shipping_amount_opt().unwrap_or_default()
    }

    /// Insurance, packaging and weight surcharge together.
    pub fn handling_amount(&self) -> Decimal {
        self.insurance.unwrap_or_default()
            + self.packaging.unwrap_or_default()
            + self.weight.unwrap_or_default()
    }

    /// Checks the rules serde cannot express.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.version != OTHER_FEES_VERSION {
            return Err(ServiceError::InvalidInput(format!(
                "otherFees version {} is not supported",
                self.version
            )));
        }

        for (name, value) in [
            ("packaging", self.packaging),
            ("insurance", self.insurance),
            ("weight", self.weight),
            ("shippingCost.cost", self.shipping_amount_opt()),
        ] {
            if let Some(value) = value {
                check_amount(&format!("otherFees.{}", name), value)?;
            }
        }

        if let Some(discount) = &self.discount {
            check_discount(
                "otherFees.discount",
                discount.value(),
                matches!(discount, Discount::Percent(_)),
            )?;
        }

        for entry in &self.product_discount {
            if entry.product_variant_id.is_nil() {
                return Err(ServiceError::InvalidInput(
                    "otherFees.productDiscount requires a product variant id".to_string(),
                ));
            }
            check_discount(
                "otherFees.productDiscount",
                entry.discount_amount,
                entry.discount_type == DiscountKind::Percent,
            )?;
        }

        if let Some(amount) = self.installments.as_ref().and_then(|i| i.amount) {
            check_amount("otherFees.installments.amount", amount)?;
        }

        Ok(())
    }

    fn shipping_amount_opt(&self) -> Option<Decimal> {
        self.shipping_cost.as_ref().and_then(|s| s.cost)
    }
}

/// Rejects amounts that are negative or beyond [`MAX_AMOUNT`].
pub fn check_amount(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() {
        return Err(ServiceError::InvalidInput(format!(
            "{} must not be negative",
            field
        )));
    }
    if value > MAX_AMOUNT {
        return Err(ServiceError::InvalidInput(format!(
            "{} must be at most {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

fn check_discount(field: &str, value: Decimal, percent: bool) -> Result<(), ServiceError> {
    check_amount(field, value)?;
    if percent && value > Decimal::ONE_HUNDRED {
        return Err(ServiceError::InvalidInput(format!(
            "{} percentage must be at most 100",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parses_camel_case_document() {
        let variant = Uuid::new_v4();
        let fees = OtherFees::from_json(json!({
            "packaging": 10,
            "insurance": "2.5",
            "weight": 4,
            "shippingCost": { "shippingService": "JNE", "type": "REG", "cost": 12 },
            "discount": { "type": "percent", "value": 10 },
            "productDiscount": [
                { "produkVariantId": variant, "discountAmount": 5, "discountType": "nominal" }
            ],
            "installments": { "paymentMethodId": Uuid::nil(), "amount": 0 }
        }))
        .unwrap();

        assert_eq!(fees.version, OTHER_FEES_VERSION);
        assert_eq!(fees.packaging, Some(dec!(10)));
        assert_eq!(fees.insurance, Some(dec!(2.5)));
        assert_eq!(fees.discount, Some(Discount::Percent(dec!(10))));
        assert_eq!(fees.product_discount[0].product_variant_id, variant);
        assert_eq!(fees.product_discount[0].discount_type, DiscountKind::Nominal);
        assert_eq!(fees.shipping_amount(), dec!(12));
        assert_eq!(fees.handling_amount(), dec!(16.5));
        assert!(fees.installments.as_ref().unwrap().billable().is_none());
        assert!(fees.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_discount_type() {
        let err = OtherFees::from_json(json!({
            "discount": { "type": "bogo", "value": 1 }
        }))
        .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    #[test]
    fn rejects_non_numeric_fee() {
        let err = OtherFees::from_json(json!({ "packaging": { "amount": 3 } })).unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    #[test]
    fn rejects_product_discount_without_variant() {
        let err = OtherFees::from_json(json!({
            "productDiscount": [{ "discountAmount": 5, "discountType": "percent" }]
        }))
        .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    #[test]
    fn validate_rejects_percent_over_hundred_and_negative_fees() {
        let fees = OtherFees {
            discount: Some(Discount::Percent(dec!(150))),
            ..Default::default()
        };
        assert_matches!(fees.validate(), Err(ServiceError::InvalidInput(_)));

        let fees = OtherFees {
            packaging: Some(dec!(-1)),
            ..Default::default()
        };
        assert_matches!(fees.validate(), Err(ServiceError::InvalidInput(_)));

        let fees = OtherFees {
            version: 7,
            ..Default::default()
        };
        assert_matches!(fees.validate(), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn validate_rejects_amounts_beyond_the_money_range() {
        let fees = OtherFees {
            product_discount: vec![ProductDiscount {
                product_variant_id: Uuid::new_v4(),
                discount_amount: Decimal::MAX,
                discount_type: DiscountKind::Nominal,
            }],
            ..Default::default()
        };
        assert_matches!(fees.validate(), Err(ServiceError::InvalidInput(_)));

        let fees = OtherFees {
            insurance: Some(MAX_AMOUNT + dec!(1)),
            ..Default::default()
        };
        assert_matches!(fees.validate(), Err(ServiceError::InvalidInput(_)));

        let fees = OtherFees {
            insurance: Some(MAX_AMOUNT),
            ..Default::default()
        };
        assert!(fees.validate().is_ok());
    }

    #[test]
    fn discount_amounts_and_labels() {
        assert_eq!(Discount::Percent(dec!(10)).amount_of(dec!(330)), dec!(33));
        assert_eq!(Discount::Nominal(dec!(25)).amount_of(dec!(330)), dec!(25));
        assert_eq!(Discount::Percent(dec!(10)).label(), "10%");
        assert_eq!(Discount::Nominal(dec!(25.50)).label(), "25.5");
    }

    #[test]
    fn installment_is_billable_only_with_method_and_amount() {
        let method = Uuid::new_v4();
        let fee = InstallmentFee {
            payment_method_id: Some(method),
            payment_date: None,
            amount: Some(dec!(50)),
        };
        assert_eq!(fee.billable(), Some((method, dec!(50))));

        let fee = InstallmentFee {
            payment_method_id: None,
            ..fee
        };
        assert_eq!(fee.billable(), None);
    }
}
