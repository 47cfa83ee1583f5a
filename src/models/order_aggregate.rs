use serde::Serialize;

use crate::entities::{installment, order, order_detail, order_product, shipping_service};

/// An order with everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAggregate {
    #[serde(flatten)]
    pub order: order::Model,
    pub order_detail: order_detail::Model,
    pub order_products: Vec<order_product::Model>,
    pub shipping_services: Vec<shipping_service::Model>,
    pub installments: Vec<installment::Model>,
}

impl OrderAggregate {
    pub fn code(&self) -> &str {
        &self.order_detail.code
    }

    pub fn item_count(&self) -> i64 {
        self.order_products
            .iter()
            .map(|p| i64::from(p.product_qty))
            .sum()
    }
}
