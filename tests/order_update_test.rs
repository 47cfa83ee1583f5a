mod common;

use common::{create_request, line, TestContext};
use orderdesk::commands::orders::UpdateOrderRequest;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn lines_patch(lines: Vec<Value>) -> UpdateOrderRequest {
    serde_json::from_value(json!({ "orderDetail": { "orderProducts": lines } })).unwrap()
}

#[tokio::test]
async fn raising_quantity_reserves_only_the_difference() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Rudi", None).await;
    let (product, variant) = ctx.stocked_product("kopi", Some(10), dec!(40)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 3)], json!(null), None))
        .await;
    assert_eq!(ctx.stock_of(variant).await, Some(7));

    let response = ctx
        .service
        .update_order(order.order.id, lines_patch(vec![line(product, Some(variant), 5)]))
        .await;

    assert!(response.success, "{}", response.message);
    let updated = response.data.unwrap();
    assert_eq!(ctx.stock_of(variant).await, Some(5));
    assert_eq!(updated.order_products.len(), 1);
    assert_eq!(updated.order_products[0].product_qty, 5);
    assert_eq!(updated.order_detail.final_price, dec!(200));
    assert_eq!(updated.order_detail.code, order.order_detail.code);
}

#[tokio::test]
async fn lowering_quantity_and_dropping_a_line_give_stock_back() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Maya", None).await;
    let (kept_product, kept) = ctx.stocked_product("teh", Some(10), dec!(10)).await;
    let (dropped_product, dropped) = ctx.stocked_product("gula", Some(6), dec!(8)).await;

    let order = ctx
        .place(create_request(
            customer,
            vec![line(kept_product, Some(kept), 4), line(dropped_product, Some(dropped), 2)],
            json!(null),
            None,
        ))
        .await;
    assert_eq!(ctx.stock_of(kept).await, Some(6));
    assert_eq!(ctx.stock_of(dropped).await, Some(4));

    let response = ctx
        .service
        .update_order(order.order.id, lines_patch(vec![line(kept_product, Some(kept), 1)]))
        .await;

    assert!(response.success, "{}", response.message);
    assert_eq!(ctx.stock_of(kept).await, Some(9));
    assert_eq!(ctx.stock_of(dropped).await, Some(6));
    assert_eq!(ctx.order_line_count().await, 1);
}

#[tokio::test]
async fn update_that_needs_more_than_available_changes_nothing() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Joko", None).await;
    let (product, variant) = ctx.stocked_product("beras", Some(5), dec!(60)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 2)], json!(null), None))
        .await;

    let response = ctx
        .service
        .update_order(order.order.id, lines_patch(vec![line(product, Some(variant), 9)]))
        .await;

    assert!(!response.success);
    assert_eq!(response.status_code, 422);
    assert_eq!(ctx.stock_of(variant).await, Some(3));
    let stored = ctx.service.get_order(order.order.id).await.data.unwrap();
    assert_eq!(stored.order_products[0].product_qty, 2);
    assert_eq!(stored.order_detail.final_price, dec!(120));
}

#[tokio::test]
async fn fee_patch_reprices_without_touching_stock() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Fitri", None).await;
    let (product, variant) = ctx.stocked_product("sabun", Some(10), dec!(50)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 2)], json!(null), None))
        .await;

    let patch: UpdateOrderRequest = serde_json::from_value(json!({
        "order": { "note": "kirim sore" },
        "orderDetail": {
            "detail": {
                "receiptNumber": "RES-77",
                "otherFees": {
                    "insurance": 5,
                    "discount": { "type": "nominal", "value": 15 }
                }
            },
            "paymentMethod": { "status": "SETTLEMENT" }
        }
    }))
    .unwrap();

    let updated = ctx.service.update_order(order.order.id, patch).await.data.unwrap();
    assert_eq!(updated.order_detail.final_price, dec!(90));
    assert_eq!(updated.order_detail.receipt_number.as_deref(), Some("RES-77"));
    assert_eq!(updated.order.note.as_deref(), Some("kirim sore"));
    assert_eq!(updated.order_detail.payment_status.to_string(), "SETTLEMENT");
    assert_eq!(ctx.stock_of(variant).await, Some(8));
}

#[tokio::test]
async fn lines_of_a_cancelled_order_cannot_change() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Hadi", None).await;
    let (product, variant) = ctx.stocked_product("mie", Some(10), dec!(3)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 4)], json!(null), None))
        .await;
    assert!(ctx.service.cancel_order(order.order.id).await.success);

    let response = ctx
        .service
        .update_order(order.order.id, lines_patch(vec![line(product, Some(variant), 2)]))
        .await;
    assert_eq!(response.status_code, 409);
    assert_eq!(ctx.stock_of(variant).await, Some(10));
}

#[tokio::test]
async fn updating_to_a_taken_code_is_a_conflict() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Wati", None).await;
    let (product, variant) = ctx.stocked_product("kecap", Some(10), dec!(9)).await;

    ctx.place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), Some("A-1")))
        .await;
    let second = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), Some("A-2")))
        .await;

    let patch: UpdateOrderRequest =
        serde_json::from_value(json!({ "orderDetail": { "detail": { "code": "A-1" } } })).unwrap();
    let response = ctx.service.update_order(second.order.id, patch).await;
    assert_eq!(response.status_code, 409);

    let missing = ctx
        .service
        .update_order(uuid::Uuid::new_v4(), UpdateOrderRequest::default())
        .await;
    assert_eq!(missing.status_code, 404);
}

#[tokio::test]
async fn oversized_line_quantities_are_rejected_before_stock_moves() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Okta", None).await;
    let (product, variant) = ctx.stocked_product("piring", Some(10), dec!(12)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), None))
        .await;

    let response = ctx
        .service
        .update_order(
            order.order.id,
            lines_patch(vec![
                line(product, Some(variant), 1_500_000_000),
                line(product, Some(variant), 1_500_000_000),
            ]),
        )
        .await;

    assert!(!response.success);
    assert_eq!(response.status_code, 400);
    assert_eq!(ctx.stock_of(variant).await, Some(9));
}

#[tokio::test]
async fn installments_are_overwritten_per_method_and_shipping_rows_replaced() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Lina", None).await;
    let transfer = ctx.payment_method("Transfer").await;
    let (product, variant) = ctx.stocked_product("tas", Some(10), dec!(100)).await;

    let order = ctx
        .place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), None))
        .await;

    for (amount, service) in [(30, "REG"), (45, "YES")] {
        let patch: UpdateOrderRequest = serde_json::from_value(json!({
            "orderDetail": {
                "detail": {
                    "otherFees": { "installments": { "paymentMethodId": transfer, "amount": amount } }
                },
                "shippingServices": [
                    { "shippingName": "JNE", "serviceName": service },
                    { "shippingName": "SiCepat", "serviceName": service }
                ]
            }
        }))
        .unwrap();
        let response = ctx.service.update_order(order.order.id, patch).await;
        assert!(response.success, "{}", response.message);
    }

    let installments = ctx.installments_of(order.order.id).await;
    assert_eq!(installments.len(), 1);
    assert_eq!(installments[0].payment_method_id, transfer);
    assert_eq!(installments[0].amount, dec!(45));

    let services = ctx.shipping_services_of(order.order.id).await;
    assert_eq!(services.len(), 2);
    assert!(services.iter().all(|s| s.service_name == "YES"));

    let stored = ctx.service.get_order(order.order.id).await.data.unwrap();
    // 100 + 45 installment
    assert_eq!(stored.order_detail.final_price, dec!(145));
}
