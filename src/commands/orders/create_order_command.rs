use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::{order, order_detail, order_product},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderAggregate, PaymentStatus},
    queries::order_queries::load_order_aggregate,
    services::inventory::InventoryLedger,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
    metrics::{ORDER_CREATIONS, ORDER_CREATION_FAILURES},
    payload::CreateOrderRequest,
    shared::{self, DEFAULT_CODE_PREFIX},
};

/// Creates an order, its detail, lines, installment and shipping rows, and
/// reserves stock, all in one transaction.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub request: CreateOrderRequest,
    pub code_prefix: String,
}

impl CreateOrderCommand {
    pub fn new(request: CreateOrderRequest) -> Self {
        Self {
            request,
            code_prefix: DEFAULT_CODE_PREFIX.to_string(),
        }
    }

    pub fn with_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.code_prefix = prefix.into();
        self
    }
}

/// Facts gathered before the transaction opens.
struct Validated {
    category: crate::models::CustomerCategory,
    delivery_target: Uuid,
    payment_status: PaymentStatus,
}

#[async_trait::async_trait]
impl Command for CreateOrderCommand {
    type Result = OrderAggregate;

    #[instrument(skip(self, db_pool, event_sender), fields(orderer = %self.request.order.orderer_customer_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let result = async {
            let validated = self.validate_references(db).await?;
            let txn = db::begin(db).await?;
            let outcome = self.persist(&txn, &validated).await;
            db::settle(txn, outcome).await
        }
        .await;

        match result {
            Ok(created) => {
                ORDER_CREATIONS.inc();
                info!(
                    order_id = %created.order.id,
                    code = %created.order_detail.code,
                    final_price = %created.order_detail.final_price,
                    lines = created.order_products.len(),
                    "Order created"
                );
                event_sender
                    .send_or_log(Event::OrderCreated {
                        order_id: created.order.id,
                        code: created.order_detail.code.clone(),
                    })
                    .await;
                Ok(created)
            }
            Err(e) => {
                ORDER_CREATION_FAILURES
                    .with_label_values(&[e.kind()])
                    .inc();
                error!(error = %e, "Order creation failed");
                Err(e)
            }
        }
    }
}

impl CreateOrderCommand {
    /// Checks every reference and the payload shape; performs no writes.
    async fn validate_references(&self, db: &DbPool) -> Result<Validated, ServiceError> {
        self.request.check()?;
        let header = &self.request.order;
        let block = &self.request.order_detail;

        let orderer = shared::find_customer(db, header.orderer_customer_id, "Orderer").await?;
        let delivery_target = match header.delivery_target_customer_id {
            Some(id) => shared::find_customer(db, id, "Delivery target").await?.id,
            None => orderer.id,
        };
        if let Some(id) = header.delivery_place_id {
            shared::ensure_delivery_place(db, id).await?;
        }
        if let Some(id) = header.sales_channel_id {
            shared::ensure_sales_channel(db, id).await?;
        }

        let mut payment_status = PaymentStatus::default();
        if let Some(payment) = &block.payment_method {
            if let Some(id) = payment.id {
                shared::ensure_payment_method(db, id).await?;
            }
            payment_status = payment.parsed_status()?.unwrap_or_default();
        }
        shared::ensure_installment_method(db, block.detail.other_fees.as_ref()).await?;
        shared::ensure_products(db, &block.order_products).await?;

        if let Some(code) = self.request.code() {
            if shared::code_exists(db, code, None).await? {
                return Err(ServiceError::Conflict(format!(
                    "Order code {} already exists",
                    code
                )));
            }
        }

        Ok(Validated {
            category: orderer.price_category(),
            delivery_target,
            payment_status,
        })
    }

    async fn persist(
        &self,
        txn: &DatabaseTransaction,
        validated: &Validated,
    ) -> Result<OrderAggregate, ServiceError> {
        let header = &self.request.order;
        let block = &self.request.order_detail;
        let detail = &block.detail;
        let fees = detail.other_fees.clone().unwrap_or_default();

        let priced =
            shared::price_order(txn, validated.category, &block.order_products, &fees).await?;
        let total = priced.breakdown.total;

        let code = match self.request.code() {
            Some(code) => code.to_string(),
            None => shared::allocate_code(txn, &self.code_prefix).await?,
        };

        let now = Utc::now();
        let saved_order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            orderer_customer_id: Set(header.orderer_customer_id),
            delivery_target_customer_id: Set(validated.delivery_target),
            delivery_place_id: Set(header.delivery_place_id),
            sales_channel_id: Set(header.sales_channel_id),
            order_date: Set(header.order_date.unwrap_or(now)),
            note: Set(header.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;

        let payment = block.payment_method.as_ref();
        let saved_detail = order_detail::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(saved_order.id),
            code: Set(code.clone()),
            original_final_price: Set(total),
            final_price: Set(detail.original_final_price.unwrap_or(total)),
            other_fees: Set(detail.other_fees.clone()),
            payment_method_id: Set(payment.and_then(|p| p.id)),
            payment_status: Set(validated.payment_status),
            payment_date: Set(payment.and_then(|p| p.date)),
            receipt_number: Set(detail.receipt_number.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_write_error(e, format!("Order code {} already exists", code)))?;

        let ledger = InventoryLedger::new(txn);
        for line in &priced.lines {
            if let Some(variant_id) = line.input.product_variant_id {
                ledger.reserve(variant_id, line.input.product_qty).await?;
            }

            order_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(saved_order.id),
                order_detail_id: Set(saved_detail.id),
                product_id: Set(line.input.product_id),
                product_variant_id: Set(line.input.product_variant_id),
                product_qty: Set(line.input.product_qty),
                product_price: Set(line.unit_price),
                created_at: Set(now),
            }
            .insert(txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        shared::upsert_installment(txn, saved_order.id, &fees).await?;
        shared::insert_shipping_services(txn, saved_order.id, &block.shipping_services).await?;

        load_order_aggregate(txn, saved_order.id)
            .await?
            .ok_or_else(|| ServiceError::InternalError("created order vanished".to_string()))
    }
}
