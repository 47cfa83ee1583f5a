//! Steps shared by the create, update and import paths.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::payload::{OrderLineInput, ShippingServiceInput};
use crate::{
    entities::{
        customer, delivery_place, installment, order_detail, payment_method, product,
        product_variant, sales_channel, shipping_service,
    },
    errors::ServiceError,
    models::{CustomerCategory, InstallmentFee, OtherFees},
    services::{
        fees::{total_for, FeeBreakdown, FeeLine},
        pricing::{resolve_price, PricingResolver},
    },
};

pub const DEFAULT_CODE_PREFIX: &str = "OID";
const CODE_ATTEMPTS: usize = 8;

pub(crate) async fn find_customer<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    role: &str,
) -> Result<customer::Model, ServiceError> {
    customer::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("{} customer {} not found", role, id)))
}

pub(crate) async fn ensure_delivery_place<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<(), ServiceError> {
    delivery_place::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery place {} not found", id)))
}

pub(crate) async fn ensure_sales_channel<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<(), ServiceError> {
    sales_channel::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Sales channel {} not found", id)))
}

pub(crate) async fn ensure_payment_method<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<(), ServiceError> {
    payment_method::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Payment method {} not found", id)))
}

/// Every product must exist, and a named variant must belong to its product.
pub(crate) async fn ensure_products<C: ConnectionTrait>(
    conn: &C,
    lines: &[OrderLineInput],
) -> Result<(), ServiceError> {
    let product_ids: HashSet<Uuid> = lines.iter().map(|l| l.product_id).collect();

    let existing: HashSet<Uuid> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids.iter().copied()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if let Some(missing) = product_ids.iter().find(|id| !existing.contains(id)) {
        return Err(ServiceError::NotFound(format!("Product {} not found", missing)));
    }

    for line in lines {
        let Some(variant_id) = line.product_variant_id else {
            continue;
        };
        let variant = product_variant::Entity::find_by_id(variant_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product variant {} not found", variant_id))
            })?;
        if variant.product_id != line.product_id {
            return Err(ServiceError::InvalidInput(format!(
                "variant {} does not belong to product {}",
                variant_id, line.product_id
            )));
        }
    }
    Ok(())
}

/// Payment method named by an installment fee must exist.
pub(crate) async fn ensure_installment_method<C: ConnectionTrait>(
    conn: &C,
    fees: Option<&OtherFees>,
) -> Result<(), ServiceError> {
    if let Some((method, _)) = fees
        .and_then(|f| f.installments.as_ref())
        .and_then(InstallmentFee::billable)
    {
        ensure_payment_method(conn, method).await?;
    }
    Ok(())
}

/// Writes the order's detail row before anything else is read, so concurrent
/// writers of the same order wait for this transaction to finish.
pub(crate) async fn claim_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<(), ServiceError> {
    let claimed = order_detail::Entity::update_many()
        .col_expr(order_detail::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order_detail::Column::OrderId.eq(order_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if claimed.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
    }
    Ok(())
}

pub(crate) async fn code_exists<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    except_order: Option<Uuid>,
) -> Result<bool, ServiceError> {
    let mut query = order_detail::Entity::find().filter(order_detail::Column::Code.eq(code));
    if let Some(order_id) = except_order {
        query = query.filter(order_detail::Column::OrderId.ne(order_id));
    }
    Ok(query.count(conn).await.map_err(ServiceError::db_error)? > 0)
}

/// `{prefix}-{last 4 digits of epoch millis}-{1000..=9999}`.
pub fn generate_code(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().rem_euclid(10_000);
    let suffix = rand::thread_rng().gen_range(1000..=9999);
    format!("{}-{:04}-{}", prefix, millis, suffix)
}

/// A generated code not yet used by any order.
pub(crate) async fn allocate_code<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
) -> Result<String, ServiceError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code(prefix);
        if !code_exists(conn, &code, None).await? {
            return Ok(code);
        }
        debug!(%code, "Generated order code already taken, retrying");
    }
    Err(ServiceError::Conflict(
        "could not allocate a unique order code".to_string(),
    ))
}

/// A line after pricing, ready to be written.
#[derive(Debug, Clone)]
pub(crate) struct PricedOrderLine {
    pub input: OrderLineInput,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub(crate) struct PricedOrder {
    pub lines: Vec<PricedOrderLine>,
    pub breakdown: FeeBreakdown,
}

/// Prices `lines` for `category` and runs the fee pipeline.
///
/// Percent product discounts read the variant's price row again rather than
/// reusing the line snapshot.
pub(crate) async fn price_order<C: ConnectionTrait>(
    conn: &C,
    category: CustomerCategory,
    lines: &[OrderLineInput],
    fees: &OtherFees,
) -> Result<PricedOrder, ServiceError> {
    let resolver = PricingResolver::new(conn, category);
    let mut priced = Vec::with_capacity(lines.len());
    let mut fee_lines = Vec::with_capacity(lines.len());

    for line in lines {
        let quote = resolver
            .price_line(line.product_id, line.product_variant_id)
            .await?;

        let discount_base_price = match line.product_variant_id {
            Some(variant_id) if fees.product_discount.iter().any(|d| d.product_variant_id == variant_id) => {
                resolver
                    .price_row(variant_id)
                    .await?
                    .map(|row| resolve_price(Some(&row), category))
            }
            _ => None,
        };

        fee_lines.push(FeeLine {
            variant_id: line.product_variant_id,
            qty: line.product_qty,
            unit_price: quote.unit_price,
            discount_base_price,
        });
        priced.push(PricedOrderLine {
            input: line.clone(),
            unit_price: quote.unit_price,
        });
    }

    Ok(PricedOrder {
        lines: priced,
        breakdown: total_for(&fee_lines, fees)?,
    })
}

pub(crate) async fn insert_shipping_services<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    services: &[ShippingServiceInput],
) -> Result<(), ServiceError> {
    for service in services {
        shipping_service::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            shipping_name: Set(service.shipping_name.clone()),
            service_name: Set(service.service_name.clone()),
            weight: Set(service.weight),
            is_cod: Set(service.is_cod.unwrap_or(false)),
            shipping_cost: Set(service.shipping_cost),
            shipping_cashback: Set(service.shipping_cashback),
            shipping_cost_net: Set(service.shipping_cost_net),
            grandtotal: Set(service.grandtotal),
            service_fee: Set(service.service_fee),
            net_income: Set(service.net_income),
            etd: Set(service.etd.clone()),
            service_type: Set(service.service_type.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(())
}

/// Writes the installment for `fees`, overwriting the row already recorded
/// for the same order and payment method.
pub(crate) async fn upsert_installment<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    fees: &OtherFees,
) -> Result<Option<installment::Model>, ServiceError> {
    let Some(fee) = fees.installments.as_ref() else {
        return Ok(None);
    };
    let Some((method, amount)) = fee.billable() else {
        return Ok(None);
    };
    let payment_date = fee.payment_date.unwrap_or_else(Utc::now);

    let existing = installment::Entity::find()
        .filter(installment::Column::OrderId.eq(order_id))
        .filter(installment::Column::PaymentMethodId.eq(method))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let saved = match existing {
        Some(row) => {
            let mut active: installment::ActiveModel = row.into();
            active.amount = Set(amount);
            active.payment_date = Set(payment_date);
            active.is_paid = Set(true);
            active.update(conn).await
        }
        None => {
            installment::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                payment_method_id: Set(method),
                payment_date: Set(payment_date),
                amount: Set(amount),
                is_paid: Set(true),
                created_at: Set(Utc::now()),
            }
            .insert(conn)
            .await
        }
    }
    .map_err(ServiceError::db_error)?;

    Ok(Some(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_prefix_clock_and_random_parts() {
        let code = generate_code("OID");
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "OID");
        assert_eq!(parts[1].len(), 4);
        let suffix: u32 = parts[2].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }

    #[test]
    fn custom_prefix_is_kept() {
        assert!(generate_code("WEB").starts_with("WEB-"));
    }
}
