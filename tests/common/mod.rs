#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use orderdesk::{
    commands::orders::CreateOrderRequest,
    config::RestockPolicy,
    db::{self, DbConfig, DbPool},
    entities::{
        customer, delivery_place, installment, order, order_product, payment_method, product,
        product_price, product_variant, sales_channel, shipping_service,
    },
    events::{self, EventSender},
    models::{CustomerCategory, OrderAggregate},
    services::orders::{OrderService, OrderServiceSettings},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::{json, Value};
use uuid::Uuid;

/// Store with the schema applied and an event loop draining domain events.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub event_sender: Arc<EventSender>,
    pub service: OrderService,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: Option<tempfile::TempDir>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(OrderServiceSettings::default()).await
    }

    pub async fn with_restock_policy(policy: RestockPolicy) -> Self {
        Self::with_settings(OrderServiceSettings {
            restock_policy: policy,
            ..Default::default()
        })
        .await
    }

    pub async fn with_settings(settings: OrderServiceSettings) -> Self {
        // One connection: every `sqlite::memory:` connection is its own database.
        let config = DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        Self::open(config, settings, None).await
    }

    /// File-backed store shared by `connections` pooled connections, so
    /// transactions from spawned tasks really overlap.
    pub async fn file_backed(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = DbConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("orders.db").display()),
            max_connections: connections,
            min_connections: 1,
            ..Default::default()
        };
        Self::open(config, OrderServiceSettings::default(), Some(dir)).await
    }

    async fn open(config: DbConfig, settings: OrderServiceSettings, dir: Option<tempfile::TempDir>) -> Self {
        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (sender, rx) = events::channel(64);
        let event_sender = Arc::new(sender);
        let event_task = tokio::spawn(events::process_events(rx));

        Self {
            service: OrderService::new(db.clone(), event_sender.clone(), settings),
            db,
            event_sender,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub async fn customer(&self, name: &str, category: Option<CustomerCategory>) -> Uuid {
        let id = Uuid::new_v4();
        customer::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            phone: Set(Some(format!("0812{}", &id.simple().to_string()[..6]))),
            category: Set(category),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed customer");
        id
    }

    pub async fn product(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed product");
        id
    }

    pub async fn variant(&self, product_id: Uuid, sku: &str, stock: Option<i32>, position: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product_variant::ActiveModel {
            id: Set(id),
            product_id: Set(product_id),
            sku: Set(sku.to_string()),
            stock: Set(stock),
            position: Set(position),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed variant");
        id
    }

    pub async fn price(&self, variant_id: Uuid, tiers: Tiers) {
        product_price::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_variant_id: Set(variant_id),
            normal: Set(tiers.normal),
            member: Set(tiers.member),
            reseller: Set(tiers.reseller),
            agent: Set(tiers.agent),
            buy: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed price");
    }

    /// Product with one variant carrying `stock` and a normal price.
    pub async fn stocked_product(&self, name: &str, stock: Option<i32>, normal: Decimal) -> (Uuid, Uuid) {
        let product_id = self.product(name).await;
        let variant_id = self
            .variant(product_id, &format!("{}-1", name.to_uppercase()), stock, 0)
            .await;
        self.price(variant_id, Tiers::normal(normal)).await;
        (product_id, variant_id)
    }

    pub async fn payment_method(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        payment_method::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed payment method");
        id
    }

    pub async fn delivery_place(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        delivery_place::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            address: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed delivery place");
        id
    }

    pub async fn sales_channel(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        sales_channel::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed sales channel");
        id
    }

    pub async fn stock_of(&self, variant_id: Uuid) -> Option<i32> {
        product_variant::Entity::find_by_id(variant_id)
            .one(self.db.as_ref())
            .await
            .expect("read variant")
            .expect("variant exists")
            .stock
    }

    pub async fn order_count(&self) -> u64 {
        order::Entity::find()
            .count(self.db.as_ref())
            .await
            .expect("count orders")
    }

    pub async fn installments_of(&self, order_id: Uuid) -> Vec<installment::Model> {
        installment::Entity::find()
            .filter(installment::Column::OrderId.eq(order_id))
            .all(self.db.as_ref())
            .await
            .expect("read installments")
    }

    pub async fn shipping_services_of(&self, order_id: Uuid) -> Vec<shipping_service::Model> {
        shipping_service::Entity::find()
            .filter(shipping_service::Column::OrderId.eq(order_id))
            .all(self.db.as_ref())
            .await
            .expect("read shipping services")
    }

    pub async fn order_line_count(&self) -> u64 {
        order_product::Entity::find()
            .count(self.db.as_ref())
            .await
            .expect("count order lines")
    }

    /// Creates an order through the façade and unwraps the aggregate.
    pub async fn place(&self, request: CreateOrderRequest) -> OrderAggregate {
        let response = self.service.create_order(request).await;
        assert!(response.success, "order creation failed: {}", response.message);
        response.data.expect("created order")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tiers {
    pub normal: Option<Decimal>,
    pub member: Option<Decimal>,
    pub reseller: Option<Decimal>,
    pub agent: Option<Decimal>,
}

impl Tiers {
    pub fn normal(normal: Decimal) -> Self {
        Self {
            normal: Some(normal),
            ..Default::default()
        }
    }
}

/// One order line: product, optional variant, quantity.
pub fn line(product_id: Uuid, variant_id: Option<Uuid>, qty: i32) -> Value {
    json!({
        "productId": product_id,
        "productVariantId": variant_id,
        "productQty": qty
    })
}

pub fn create_request(customer_id: Uuid, lines: Vec<Value>, other_fees: Value, code: Option<&str>) -> CreateOrderRequest {
    serde_json::from_value(json!({
        "order": { "ordererCustomerId": customer_id },
        "orderDetail": {
            "detail": { "code": code, "otherFees": other_fees },
            "orderProducts": lines
        }
    }))
    .expect("valid create payload")
}
