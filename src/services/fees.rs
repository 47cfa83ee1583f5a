//! Order total computation.
//!
//! Everything here is pure. The steps run in a fixed order because the
//! order-level percent discount is taken of whatever has accumulated before it:
//!
//! 1. line total (unit price × quantity)
//! 2. + insurance
//! 3. + installment amount
//! 4. − per-variant discounts
//! 5. + packaging
//! 6. + weight surcharge (added as-is)
//! 7. + shipping cost
//! 8. − order-level discount
//!
//! The result is not floored at zero.

use crate::{
    errors::ServiceError,
    models::{Discount, DiscountKind, OtherFees, MAX_AMOUNT},
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A line as seen by the fee pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeLine {
    pub variant_id: Option<Uuid>,
    pub qty: i32,
    /// Snapshot price the line was charged at.
    pub unit_price: Decimal,
    /// Tier price read again for percent discounts; `None` when the variant has no price row.
    pub discount_base_price: Option<Decimal>,
}

impl FeeLine {
    pub fn subtotal(&self) -> Result<Decimal, ServiceError> {
        self.unit_price
            .checked_mul(Decimal::from(self.qty))
            .ok_or_else(|| out_of_range("line subtotal"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub line_total: Decimal,
    pub insurance: Decimal,
    pub installment: Decimal,
    pub product_discount: Decimal,
    pub packaging: Decimal,
    pub weight: Decimal,
    pub shipping: Decimal,
    pub order_discount: Decimal,
    pub total: Decimal,
}

fn out_of_range(what: &str) -> ServiceError {
    ServiceError::InvalidInput(format!("{} is out of range", what))
}

fn add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, ServiceError> {
    a.checked_add(b).ok_or_else(|| out_of_range(what))
}

fn sub(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, ServiceError> {
    a.checked_sub(b).ok_or_else(|| out_of_range(what))
}

fn percent_of(base: Decimal, pct: Decimal, what: &str) -> Result<Decimal, ServiceError> {
    base.checked_mul(pct)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(what))
}

pub fn line_total(lines: &[FeeLine]) -> Result<Decimal, ServiceError> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        add(acc, line.subtotal()?, "line total")
    })
}

/// Sum of per-variant discounts.
///
/// Each entry applies to the first line ordering its variant. Entries with no
/// matching line, or whose line has no price row, contribute nothing.
pub fn product_discount_total(lines: &[FeeLine], fees: &OtherFees) -> Result<Decimal, ServiceError> {
    let mut total = Decimal::ZERO;
    for entry in &fees.product_discount {
        let Some(line) = lines
            .iter()
            .find(|l| l.variant_id == Some(entry.product_variant_id))
        else {
            continue;
        };
        let Some(base) = line.discount_base_price else {
            continue;
        };
        let qty = Decimal::from(line.qty);
        let amount = match entry.discount_type {
            DiscountKind::Percent => {
                let gross = base
                    .checked_mul(qty)
                    .ok_or_else(|| out_of_range("product discount"))?;
                percent_of(gross, entry.discount_amount, "product discount")?
            }
            DiscountKind::Nominal => entry
                .discount_amount
                .checked_mul(qty)
                .ok_or_else(|| out_of_range("product discount"))?,
        };
        total = add(total, amount, "product discount")?;
    }
    Ok(total)
}

/// Applies `fees` to `line_total`.
///
/// Fails with `InvalidInput` when an intermediate sum or the total leaves the
/// money range.
pub fn compute_total(
    line_total: Decimal,
    fees: &OtherFees,
    product_discount: Decimal,
) -> Result<FeeBreakdown, ServiceError> {
    let mut b = FeeBreakdown {
        line_total,
        insurance: fees.insurance.unwrap_or_default(),
        installment: fees
            .installments
            .as_ref()
            .and_then(|i| i.billable())
            .map(|(_, amount)| amount)
            .unwrap_or_default(),
        product_discount,
        packaging: fees.packaging.unwrap_or_default(),
        weight: fees.weight.unwrap_or_default(),
        shipping: fees.shipping_amount(),
        ..Default::default()
    };

    let mut running = add(b.line_total, b.insurance, "order total")?;
    running = add(running, b.installment, "order total")?;
    running = sub(running, b.product_discount, "order total")?;
    running = add(running, b.packaging, "order total")?;
    running = add(running, b.weight, "order total")?;
    running = add(running, b.shipping, "order total")?;

    b.order_discount = match fees.discount {
        Some(Discount::Percent(pct)) => percent_of(running, pct, "order discount")?,
        Some(Discount::Nominal(amount)) => amount,
        None => Decimal::ZERO,
    };
    b.total = sub(running, b.order_discount, "order total")?;
    if b.total.abs() > MAX_AMOUNT {
        return Err(out_of_range("order total"));
    }
    Ok(b)
}

/// Full pipeline over priced lines.
pub fn total_for(lines: &[FeeLine], fees: &OtherFees) -> Result<FeeBreakdown, ServiceError> {
    compute_total(line_total(lines)?, fees, product_discount_total(lines, fees)?)
}
