//! Flat per-order rows for spreadsheet export. Encoding the rows is left to the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    entities::{customer, delivery_place, order, order_detail, payment_method, product, product_variant, sales_channel},
    errors::ServiceError,
    models::{Discount, OrderAggregate},
    queries::order_queries::{load_aggregates, OrderFilter},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExportRow {
    pub no: usize,
    pub code: String,
    pub orderer: String,
    pub delivery_target: String,
    pub delivery_place: String,
    pub sales_channel: String,
    pub payment_method: String,
    pub payment_status: String,
    pub order_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    /// `Name (SKU: a, b) xQty` per line.
    pub products: String,
    pub total_items: i64,
    pub product_price: Decimal,
    pub shipping_cost: Decimal,
    pub other_fees: Decimal,
    pub discount: String,
    pub final_price: Decimal,
    pub receipt_number: String,
    pub shipping_service: String,
    pub shipping_type: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// What the products earned once fees and the order discount are taken out
/// of the final price. Floored at zero, unlike the pricing total.
pub fn product_price_net(detail: &order_detail::Model) -> Decimal {
    let fees = detail.other_fees.clone().unwrap_or_default();
    let discount = fees
        .discount
        .map(|d| d.amount_of(detail.final_price))
        .unwrap_or_default();
    let net = detail.final_price - discount - (fees.shipping_amount() + fees.handling_amount());
    net.max(Decimal::ZERO)
}

fn discount_label(discount: Option<Discount>) -> String {
    discount.map(|d| d.label()).unwrap_or_else(|| "0".to_string())
}

/// Names of everything an export row refers to.
#[derive(Debug, Default)]
pub struct ExportLookups {
    pub customers: HashMap<Uuid, String>,
    pub delivery_places: HashMap<Uuid, String>,
    pub sales_channels: HashMap<Uuid, String>,
    pub payment_methods: HashMap<Uuid, String>,
    /// Product name and the SKUs of its variants.
    pub products: HashMap<Uuid, (String, Vec<String>)>,
}

fn name_of(map: &HashMap<Uuid, String>, id: Option<Uuid>) -> String {
    id.and_then(|id| map.get(&id).cloned()).unwrap_or_default()
}

impl ExportLookups {
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        aggregates: &[OrderAggregate],
    ) -> Result<Self, ServiceError> {
        let mut customer_ids = HashSet::new();
        let mut place_ids = HashSet::new();
        let mut channel_ids = HashSet::new();
        let mut method_ids = HashSet::new();
        let mut product_ids = HashSet::new();
        for agg in aggregates {
            customer_ids.insert(agg.order.orderer_customer_id);
            customer_ids.insert(agg.order.delivery_target_customer_id);
            place_ids.extend(agg.order.delivery_place_id);
            channel_ids.extend(agg.order.sales_channel_id);
            method_ids.extend(agg.order_detail.payment_method_id);
            product_ids.extend(agg.order_products.iter().map(|p| p.product_id));
        }

        let customers = customer::Entity::find()
            .filter(customer::Column::Id.is_in(customer_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let delivery_places = delivery_place::Entity::find()
            .filter(delivery_place::Column::Id.is_in(place_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let sales_channels = sales_channel::Entity::find()
            .filter(sales_channel::Column::Id.is_in(channel_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let payment_methods = payment_method::Entity::find()
            .filter(payment_method::Column::Id.is_in(method_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        let mut products: HashMap<Uuid, (String, Vec<String>)> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids.clone()))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, (p.name, Vec::new())))
            .collect();
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.is_in(product_ids))
            .order_by_asc(product_variant::Column::Position)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        for variant in variants {
            if let Some((_, skus)) = products.get_mut(&variant.product_id) {
                skus.push(variant.sku);
            }
        }

        Ok(Self {
            customers,
            delivery_places,
            sales_channels,
            payment_methods,
            products,
        })
    }

    fn product_line(&self, product_id: Uuid, qty: i32) -> String {
        match self.products.get(&product_id) {
            Some((name, skus)) if !skus.is_empty() => {
                format!("{} (SKU: {}) x{}", name, skus.join(", "), qty)
            }
            Some((name, _)) => format!("{} x{}", name, qty),
            None => format!("Product x{}", qty),
        }
    }
}

impl OrderExportRow {
    /// `index` is zero-based; the row number starts at 1.
    pub fn project(index: usize, agg: &OrderAggregate, lookups: &ExportLookups) -> Self {
        let detail = &agg.order_detail;
        let fees = detail.other_fees.clone().unwrap_or_default();

        Self {
            no: index + 1,
            code: detail.code.clone(),
            orderer: name_of(&lookups.customers, Some(agg.order.orderer_customer_id)),
            delivery_target: name_of(&lookups.customers, Some(agg.order.delivery_target_customer_id)),
            delivery_place: name_of(&lookups.delivery_places, agg.order.delivery_place_id),
            sales_channel: name_of(&lookups.sales_channels, agg.order.sales_channel_id),
            payment_method: name_of(&lookups.payment_methods, detail.payment_method_id),
            payment_status: detail.payment_status.to_string(),
            order_date: agg.order.order_date,
            payment_date: detail.payment_date,
            products: agg
                .order_products
                .iter()
                .map(|p| lookups.product_line(p.product_id, p.product_qty))
                .collect::<Vec<_>>()
                .join(", "),
            total_items: agg.item_count(),
            product_price: product_price_net(detail),
            shipping_cost: fees.shipping_amount(),
            other_fees: fees.handling_amount(),
            discount: discount_label(fees.discount),
            final_price: detail.final_price,
            receipt_number: detail.receipt_number.clone().unwrap_or_default(),
            shipping_service: agg
                .shipping_services
                .first()
                .map(|s| s.service_name.clone())
                .unwrap_or_default(),
            shipping_type: fees
                .shipping_cost
                .as_ref()
                .and_then(|s| s.shipping_type.clone())
                .unwrap_or_default(),
            note: agg.order.note.clone().unwrap_or_default(),
            created_at: agg.order.created_at,
        }
    }
}

/// Every order matching `filter`, newest first, as export rows.
pub async fn export_orders<C: ConnectionTrait>(
    conn: &C,
    filter: &OrderFilter,
) -> Result<Vec<OrderExportRow>, ServiceError> {
    let orders = order::Entity::find()
        .filter(filter.condition()?)
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let aggregates = load_aggregates(conn, orders).await?;
    let lookups = ExportLookups::load(conn, &aggregates).await?;

    Ok(aggregates
        .iter()
        .enumerate()
        .map(|(i, agg)| OrderExportRow::project(i, agg, &lookups))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OtherFees, PaymentStatus, ShippingCost};
    use rust_decimal_macros::dec;

    fn detail(final_price: Decimal, fees: Option<OtherFees>) -> order_detail::Model {
        order_detail::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            code: "OID-0001-1234".into(),
            original_final_price: final_price,
            final_price,
            other_fees: fees,
            payment_method_id: None,
            payment_status: PaymentStatus::Pending,
            payment_date: None,
            receipt_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn net_product_price_removes_fees_and_percent_of_final_price() {
        let fees = OtherFees {
            packaging: Some(dec!(10)),
            insurance: Some(dec!(5)),
            shipping_cost: Some(ShippingCost {
                cost: Some(dec!(20)),
                ..Default::default()
            }),
            discount: Some(Discount::Percent(dec!(10))),
            ..Default::default()
        };
        // 300 - 30 - (20 + 15)
        assert_eq!(product_price_net(&detail(dec!(300), Some(fees))), dec!(235));
    }

    #[test]
    fn net_product_price_is_floored_at_zero() {
        let fees = OtherFees {
            discount: Some(Discount::Nominal(dec!(500))),
            ..Default::default()
        };
        assert_eq!(product_price_net(&detail(dec!(100), Some(fees))), Decimal::ZERO);
    }

    #[test]
    fn discount_labels() {
        assert_eq!(discount_label(None), "0");
        assert_eq!(discount_label(Some(Discount::Percent(dec!(15)))), "15%");
        assert_eq!(discount_label(Some(Discount::Nominal(dec!(2000)))), "2000");
    }

    #[test]
    fn product_lines_list_skus() {
        let id = Uuid::new_v4();
        let mut lookups = ExportLookups::default();
        lookups
            .products
            .insert(id, ("Kopi".into(), vec!["KOPI-S".into(), "KOPI-L".into()]));
        assert_eq!(lookups.product_line(id, 3), "Kopi (SKU: KOPI-S, KOPI-L) x3");
        assert_eq!(lookups.product_line(Uuid::new_v4(), 1), "Product x1");
    }
}
