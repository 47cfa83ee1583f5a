mod common;

use chrono::{TimeZone, Utc};
use common::{create_request, line, TestContext};
use orderdesk::{
    models::{CustomerCategory, PaymentStatus},
    queries::order_queries::OrderFilter,
    services::orders::OrderServiceSettings,
};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn lists_newest_first_with_pagination() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Ratna", None).await;
    let (product, variant) = ctx.stocked_product("buku", Some(50), dec!(20)).await;

    for code in ["P-1", "P-2", "P-3"] {
        ctx.place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), Some(code)))
            .await;
    }

    let first = ctx
        .service
        .list_orders(OrderFilter::default(), Some(1), Some(2))
        .await
        .data
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].order_detail.code, "P-3");

    let second = ctx
        .service
        .list_orders(OrderFilter::default(), Some(2), Some(2))
        .await
        .data
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].order_detail.code, "P-1");
}

#[tokio::test]
async fn page_zero_is_rejected() {
    let ctx = TestContext::new().await;
    let response = ctx.service.list_orders(OrderFilter::default(), Some(0), None).await;
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn per_page_is_capped_by_settings() {
    let ctx = TestContext::with_settings(OrderServiceSettings {
        max_page_size: 2,
        default_page_size: 1,
        ..Default::default()
    })
    .await;
    let customer = ctx.customer("Gita", None).await;
    let (product, variant) = ctx.stocked_product("pena", Some(10), dec!(2)).await;
    for _ in 0..3 {
        ctx.place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), None))
            .await;
    }

    let page = ctx
        .service
        .list_orders(OrderFilter::default(), None, Some(50))
        .await
        .data
        .unwrap();
    assert_eq!(page.per_page, 2);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn filters_combine_on_status_category_names_and_dates() {
    let ctx = TestContext::new().await;
    let reseller = ctx.customer("Toko Makmur", Some(CustomerCategory::Reseller)).await;
    let walk_in = ctx.customer("Pak Harun", None).await;
    let (coffee, coffee_variant) = ctx.stocked_product("Kopi Gayo", Some(50), dec!(90)).await;
    let (tea, tea_variant) = ctx.stocked_product("Teh Melati", Some(50), dec!(30)).await;

    let mut dated = create_request(reseller, vec![line(coffee, Some(coffee_variant), 2)], json!(null), Some("F-1"));
    dated.order.order_date = Some(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap());
    dated.order_detail.detail.receipt_number = Some("JNE-123".into());
    let coffee_order = ctx.place(dated).await;

    let mut later = create_request(walk_in, vec![line(tea, Some(tea_variant), 1)], json!(null), Some("F-2"));
    later.order.order_date = Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap());
    let tea_order = ctx.place(later).await;
    assert!(ctx.service.cancel_order(tea_order.order.id).await.success);

    let find = |filter: OrderFilter| {
        let service = ctx.service.clone();
        async move {
            let page = service.list_orders(filter, None, None).await;
            assert!(page.success, "{}", page.message);
            page.data
                .unwrap()
                .items
                .into_iter()
                .map(|o| o.order_detail.code)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        find(OrderFilter {
            payment_status: Some(PaymentStatus::Cancel),
            ..Default::default()
        })
        .await,
        vec!["F-2"]
    );
    assert_eq!(
        find(OrderFilter {
            customer_category: Some(CustomerCategory::Customer),
            ..Default::default()
        })
        .await,
        vec!["F-2"]
    );
    assert_eq!(
        find(OrderFilter {
            product_name: Some("gayo".into()),
            ..Default::default()
        })
        .await,
        vec!["F-1"]
    );
    assert_eq!(
        find(OrderFilter {
            customer_name: Some("Harun".into()),
            ..Default::default()
        })
        .await,
        vec!["F-2"]
    );
    assert_eq!(
        find(OrderFilter {
            order_month: Some(3),
            order_year: Some(2024),
            ..Default::default()
        })
        .await,
        vec!["F-1"]
    );
    assert_eq!(
        find(OrderFilter {
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 2),
            ..Default::default()
        })
        .await,
        vec!["F-2"]
    );
    assert_eq!(
        find(OrderFilter {
            missing_receipt: true,
            ..Default::default()
        })
        .await,
        vec!["F-2"]
    );
    assert_eq!(
        find(OrderFilter {
            order_id: Some(coffee_order.order.id),
            product_id: Some(coffee),
            ..Default::default()
        })
        .await,
        vec!["F-1"]
    );
}

#[tokio::test]
async fn export_rows_project_names_and_net_price() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Bu Ani", None).await;
    let product = ctx.product("Kopi").await;
    let variant = ctx.variant(product, "KOPI-S", Some(10), 0).await;
    ctx.price(variant, common::Tiers::normal(dec!(100))).await;

    ctx.place(create_request(
        customer,
        vec![line(product, Some(variant), 3)],
        json!({
            "packaging": 10,
            "shippingCost": { "type": "REG", "cost": 20 },
            "discount": { "type": "percent", "value": 10 }
        }),
        Some("EXP-1"),
    ))
    .await;

    let rows = ctx.service.export_orders(OrderFilter::default()).await.data.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.no, 1);
    assert_eq!(row.code, "EXP-1");
    assert_eq!(row.orderer, "Bu Ani");
    assert_eq!(row.delivery_target, "Bu Ani");
    assert_eq!(row.products, "Kopi (SKU: KOPI-S) x3");
    assert_eq!(row.total_items, 3);
    // (300 + 10 + 20) - 10% = 297
    assert_eq!(row.final_price, dec!(297));
    assert_eq!(row.discount, "10%");
    assert_eq!(row.shipping_type, "REG");
    // 297 - 29.7 - (20 + 10)
    assert_eq!(row.product_price, dec!(237.3));
}
