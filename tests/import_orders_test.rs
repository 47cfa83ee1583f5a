mod common;

use common::{create_request, line, TestContext};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn import_skips_existing_codes_and_reports_failing_rows() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Importir", None).await;
    let (product, variant) = ctx.stocked_product("kardus", Some(10), dec!(4)).await;

    ctx.place(create_request(customer, vec![line(product, Some(variant), 1)], json!(null), Some("IMP-1")))
        .await;

    let rows = vec![
        create_request(customer, vec![line(product, Some(variant), 2)], json!(null), Some("IMP-1")),
        create_request(customer, vec![line(product, Some(variant), 2)], json!(null), Some("IMP-2")),
        create_request(Uuid::new_v4(), vec![line(product, Some(variant), 1)], json!(null), Some("IMP-3")),
        create_request(customer, vec![line(product, Some(variant), 50)], json!(null), Some("IMP-4")),
        create_request(customer, vec![line(product, Some(variant), 3)], json!(null), None),
    ];

    let response = ctx.service.import_orders(rows).await;
    assert!(response.success, "{}", response.message);
    let summary = response.data.unwrap();

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.skipped_codes, vec!["IMP-1".to_string()]);
    assert_eq!(summary.imported_codes[0], "IMP-2");
    assert!(summary.imported_codes[1].starts_with("OID-"));

    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].row, 2);
    assert_eq!(summary.failures[0].status_code, 404);
    assert_eq!(summary.failures[1].row, 3);
    assert_eq!(summary.failures[1].code.as_deref(), Some("IMP-4"));
    assert_eq!(summary.failures[1].status_code, 422);

    // 10 - 1 (seed order) - 2 - 3; the skipped and failed rows reserved nothing.
    assert_eq!(ctx.stock_of(variant).await, Some(4));
    assert_eq!(ctx.order_count().await, 3);
}

#[tokio::test]
async fn importing_nothing_is_an_empty_summary() {
    let ctx = TestContext::new().await;
    let summary = ctx.service.import_orders(Vec::new()).await.data.unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 0);
    assert!(summary.failures.is_empty());
}
