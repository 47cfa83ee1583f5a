//! Request shapes accepted by the order commands, and the structural checks
//! that run before any store access.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{check_amount, OtherFees, PaymentStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order: OrderHeader,
    pub order_detail: OrderDetailBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub orderer_customer_id: Uuid,
    /// Defaults to the orderer.
    #[serde(default)]
    pub delivery_target_customer_id: Option<Uuid>,
    #[serde(default)]
    pub delivery_place_id: Option<Uuid>,
    #[serde(default)]
    pub sales_channel_id: Option<Uuid>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailBlock {
    #[serde(default)]
    pub detail: DetailInput,
    #[serde(default)]
    pub payment_method: Option<PaymentInput>,
    #[serde(default)]
    pub order_products: Vec<OrderLineInput>,
    #[serde(default)]
    pub shipping_services: Vec<ShippingServiceInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DetailInput {
    #[validate(length(min = 1, max = 64))]
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub other_fees: Option<OtherFees>,
    /// Manual override of the computed total.
    #[serde(default)]
    pub original_final_price: Option<Decimal>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl PaymentInput {
    pub fn parsed_status(&self) -> Result<Option<PaymentStatus>, ServiceError> {
        self.status
            .as_deref()
            .map(|s| s.parse::<PaymentStatus>().map_err(ServiceError::InvalidInput))
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: Uuid,
    #[serde(default)]
    pub product_variant_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1000000, message = "quantity must be between 1 and 1000000"))]
    pub product_qty: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingServiceInput {
    #[validate(length(min = 1, message = "shippingName is required"))]
    #[serde(default)]
    pub shipping_name: String,
    #[validate(length(min = 1, message = "serviceName is required"))]
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub is_cod: Option<bool>,
    #[serde(default)]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub shipping_cashback: Option<Decimal>,
    #[serde(default)]
    pub shipping_cost_net: Option<Decimal>,
    #[serde(default)]
    pub grandtotal: Option<Decimal>,
    #[serde(default)]
    pub service_fee: Option<Decimal>,
    #[serde(default)]
    pub net_income: Option<Decimal>,
    #[serde(default)]
    pub etd: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
}

/// Partial update. Absent blocks and fields keep their stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub order: Option<OrderHeaderPatch>,
    #[serde(default)]
    pub order_detail: Option<OrderDetailPatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeaderPatch {
    #[serde(default)]
    pub orderer_customer_id: Option<Uuid>,
    #[serde(default)]
    pub delivery_target_customer_id: Option<Uuid>,
    #[serde(default)]
    pub delivery_place_id: Option<Uuid>,
    #[serde(default)]
    pub sales_channel_id: Option<Uuid>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailPatch {
    #[serde(default)]
    pub detail: Option<DetailInput>,
    #[serde(default)]
    pub payment_method: Option<PaymentInput>,
    /// When present, replaces every line of the order.
    #[serde(default)]
    pub order_products: Option<Vec<OrderLineInput>>,
    /// When present, replaces every shipping service row.
    #[serde(default)]
    pub shipping_services: Option<Vec<ShippingServiceInput>>,
}

/// Decodes a request body, reporting shape errors as `InvalidInput`.
pub fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

pub(crate) fn check_lines(lines: &[OrderLineInput]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one order product is required".to_string(),
        ));
    }
    for line in lines {
        line.validate()?;
    }
    Ok(())
}

pub(crate) fn check_shipping(services: &[ShippingServiceInput]) -> Result<(), ServiceError> {
    for service in services {
        service.validate().map_err(|e| {
            ServiceError::InvalidInput(format!("shippingServices: {}", e))
        })?;
    }
    Ok(())
}

pub(crate) fn check_detail(detail: &DetailInput) -> Result<(), ServiceError> {
    detail.validate()?;
    if let Some(fees) = &detail.other_fees {
        fees.validate()?;
    }
    if let Some(price) = detail.original_final_price {
        check_amount("originalFinalPrice", price)?;
    }
    Ok(())
}

impl CreateOrderRequest {
    /// Structural checks that need no store access.
    pub fn check(&self) -> Result<(), ServiceError> {
        check_detail(&self.order_detail.detail)?;
        check_lines(&self.order_detail.order_products)?;
        check_shipping(&self.order_detail.shipping_services)?;
        if let Some(payment) = &self.order_detail.payment_method {
            payment.parsed_status()?;
        }
        Ok(())
    }

    pub fn code(&self) -> Option<&str> {
        self.order_detail.detail.code.as_deref()
    }
}

impl UpdateOrderRequest {
    pub fn check(&self) -> Result<(), ServiceError> {
        let Some(block) = &self.order_detail else {
            return Ok(());
        };
        if let Some(detail) = &block.detail {
            check_detail(detail)?;
        }
        if let Some(lines) = &block.order_products {
            check_lines(lines)?;
        }
        if let Some(services) = &block.shipping_services {
            check_shipping(services)?;
        }
        if let Some(payment) = &block.payment_method {
            payment.parsed_status()?;
        }
        Ok(())
    }

    pub fn lines(&self) -> Option<&[OrderLineInput]> {
        self.order_detail
            .as_ref()
            .and_then(|b| b.order_products.as_deref())
    }

    pub fn other_fees(&self) -> Option<&OtherFees> {
        self.detail().and_then(|d| d.other_fees.as_ref())
    }

    pub fn detail(&self) -> Option<&DetailInput> {
        self.order_detail.as_ref().and_then(|b| b.detail.as_ref())
    }

    pub fn payment(&self) -> Option<&PaymentInput> {
        self.order_detail
            .as_ref()
            .and_then(|b| b.payment_method.as_ref())
    }

    pub fn shipping_services(&self) -> Option<&[ShippingServiceInput]> {
        self.order_detail
            .as_ref()
            .and_then(|b| b.shipping_services.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn body(lines: serde_json::Value) -> serde_json::Value {
        json!({
            "order": { "ordererCustomerId": Uuid::new_v4() },
            "orderDetail": {
                "detail": { "otherFees": { "packaging": 10 } },
                "paymentMethod": { "status": "settlement" },
                "orderProducts": lines
            }
        })
    }

    #[test]
    fn decodes_camel_case_body() {
        let product = Uuid::new_v4();
        let req: CreateOrderRequest =
            from_json(body(json!([{ "productId": product, "productQty": 2 }]))).unwrap();

        assert_eq!(req.order_detail.order_products[0].product_id, product);
        assert_eq!(req.order_detail.order_products[0].product_variant_id, None);
        assert!(req.check().is_ok());
        assert_eq!(
            req.order_detail.payment_method.unwrap().parsed_status().unwrap(),
            Some(PaymentStatus::Settlement)
        );
    }

    #[test]
    fn rejects_zero_quantity_and_empty_lines() {
        let req: CreateOrderRequest =
            from_json(body(json!([{ "productId": Uuid::new_v4(), "productQty": 0 }]))).unwrap();
        assert_matches!(req.check(), Err(ServiceError::ValidationError(_)));

        let req: CreateOrderRequest = from_json(body(json!([]))).unwrap();
        assert_matches!(req.check(), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn rejects_quantities_and_prices_out_of_range() {
        let req: CreateOrderRequest = from_json(body(json!([
            { "productId": Uuid::new_v4(), "productQty": 1_500_000_000 }
        ])))
        .unwrap();
        assert_matches!(req.check(), Err(ServiceError::ValidationError(_)));

        let mut req: CreateOrderRequest =
            from_json(body(json!([{ "productId": Uuid::new_v4(), "productQty": 1 }]))).unwrap();
        req.order_detail.detail.original_final_price = Some(Decimal::MAX);
        assert_matches!(req.check(), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unknown_payment_status() {
        let mut req: CreateOrderRequest =
            from_json(body(json!([{ "productId": Uuid::new_v4(), "productQty": 1 }]))).unwrap();
        req.order_detail.payment_method = Some(PaymentInput {
            status: Some("paid".into()),
            ..Default::default()
        });
        assert_matches!(req.check(), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn shipping_service_requires_names() {
        let mut req: CreateOrderRequest =
            from_json(body(json!([{ "productId": Uuid::new_v4(), "productQty": 1 }]))).unwrap();
        req.order_detail.shipping_services = vec![ShippingServiceInput {
            shipping_name: "JNE".into(),
            ..Default::default()
        }];
        assert_matches!(req.check(), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn malformed_fee_document_is_invalid_input() {
        let err = from_json::<CreateOrderRequest>(json!({
            "order": { "ordererCustomerId": Uuid::new_v4() },
            "orderDetail": {
                "detail": { "otherFees": { "discount": { "type": "free", "value": 1 } } },
                "orderProducts": []
            }
        }))
        .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    #[test]
    fn empty_update_is_valid() {
        let req = UpdateOrderRequest::default();
        assert!(req.check().is_ok());
        assert!(req.lines().is_none());
    }
}
