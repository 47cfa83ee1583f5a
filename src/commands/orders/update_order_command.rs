use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::{order, order_detail, order_product, shipping_service},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CustomerCategory, OrderAggregate, PaymentStatus},
    queries::order_queries::load_order_aggregate,
    services::inventory::InventoryLedger,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    metrics::{ORDER_UPDATES, ORDER_UPDATE_FAILURES},
    payload::{OrderLineInput, UpdateOrderRequest},
    shared,
};

/// Applies a partial update to an order in one transaction.
///
/// When lines are submitted, stock moves by the per-variant difference
/// between the stored and submitted quantities; variants that disappear from
/// the order get their full quantity back.
#[derive(Debug, Clone)]
pub struct UpdateOrderCommand {
    pub order_id: Uuid,
    pub request: UpdateOrderRequest,
}

impl UpdateOrderCommand {
    pub fn new(order_id: Uuid, request: UpdateOrderRequest) -> Self {
        Self { order_id, request }
    }
}

struct Validated {
    category: CustomerCategory,
    payment_status: Option<PaymentStatus>,
}

#[async_trait::async_trait]
impl Command for UpdateOrderCommand {
    type Result = OrderAggregate;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let result = async {
            let validated = self.validate_references(db).await?;
            let txn = db::begin(db).await?;
            let outcome = self.persist(&txn, validated).await;
            db::settle(txn, outcome).await
        }
        .await;

        match result {
            Ok(updated) => {
                ORDER_UPDATES.inc();
                info!(
                    code = %updated.order_detail.code,
                    final_price = %updated.order_detail.final_price,
                    "Order updated"
                );
                event_sender.send_or_log(Event::OrderUpdated(self.order_id)).await;
                Ok(updated)
            }
            Err(e) => {
                ORDER_UPDATE_FAILURES.with_label_values(&[e.kind()]).inc();
                error!(error = %e, "Order update failed");
                Err(e)
            }
        }
    }
}

/// Sums quantities per variant. Lines without a variant reserve nothing and are left out.
fn quantities_by_variant(
    lines: impl IntoIterator<Item = (Option<Uuid>, i32)>,
) -> Result<BTreeMap<Uuid, i32>, ServiceError> {
    let mut totals = BTreeMap::new();
    for (variant, qty) in lines {
        if let Some(variant) = variant {
            let total = totals.entry(variant).or_insert(0i32);
            *total = total.checked_add(qty).ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "total quantity for variant {} is out of range",
                    variant
                ))
            })?;
        }
    }
    Ok(totals)
}

/// Signed stock change per variant: positive means more units are needed.
fn stock_deltas(prior: &BTreeMap<Uuid, i32>, next: &BTreeMap<Uuid, i32>) -> Vec<(Uuid, i32)> {
    let mut deltas: Vec<(Uuid, i32)> = next
        .iter()
        .map(|(variant, qty)| (*variant, qty - prior.get(variant).copied().unwrap_or(0)))
        .chain(
            prior
                .iter()
                .filter(|(variant, _)| !next.contains_key(variant))
                .map(|(variant, qty)| (*variant, -qty)),
        )
        .filter(|(_, delta)| *delta != 0)
        .collect();
    // Releases run before reservations.
    deltas.sort_by_key(|(variant, delta)| (*delta > 0, *variant));
    deltas
}

fn submitted_lines_on_cancelled(existing: &OrderAggregate, request: &UpdateOrderRequest) -> bool {
    request.lines().is_some() && existing.order_detail.payment_status == PaymentStatus::Cancel
}

impl UpdateOrderCommand {
    async fn validate_references(&self, db: &DbPool) -> Result<Validated, ServiceError> {
        self.request.check()?;

        let existing = load_order_aggregate(db, self.order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;

        let header = self.request.order.as_ref();
        let orderer_id = header
            .and_then(|h| h.orderer_customer_id)
            .unwrap_or(existing.order.orderer_customer_id);
        let orderer = shared::find_customer(db, orderer_id, "Orderer").await?;

        if let Some(header) = header {
            if let Some(id) = header.delivery_target_customer_id {
                shared::find_customer(db, id, "Delivery target").await?;
            }
            if let Some(id) = header.delivery_place_id {
                shared::ensure_delivery_place(db, id).await?;
            }
            if let Some(id) = header.sales_channel_id {
                shared::ensure_sales_channel(db, id).await?;
            }
        }

        let mut payment_status = None;
        if let Some(payment) = self.request.payment() {
            if let Some(id) = payment.id {
                shared::ensure_payment_method(db, id).await?;
            }
            payment_status = payment.parsed_status()?;
        }
        shared::ensure_installment_method(db, self.request.other_fees()).await?;

        if submitted_lines_on_cancelled(&existing, &self.request) {
            return Err(ServiceError::Conflict(format!(
                "Order {} is cancelled; its lines can no longer change",
                existing.order_detail.code
            )));
        }
        if let Some(lines) = self.request.lines() {
            shared::ensure_products(db, lines).await?;
        }

        if let Some(code) = self.request.detail().and_then(|d| d.code.as_deref()) {
            if shared::code_exists(db, code, Some(self.order_id)).await? {
                return Err(ServiceError::Conflict(format!(
                    "Order code {} already exists",
                    code
                )));
            }
        }

        Ok(Validated {
            category: orderer.price_category(),
            payment_status,
        })
    }

    async fn persist(
        &self,
        txn: &DatabaseTransaction,
        validated: Validated,
    ) -> Result<OrderAggregate, ServiceError> {
        let Validated {
            category,
            payment_status,
        } = validated;
        // Stock deltas are computed from the lines as they stand once the order is claimed.
        shared::claim_order(txn, self.order_id).await?;
        let existing = load_order_aggregate(txn, self.order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;
        if submitted_lines_on_cancelled(&existing, &self.request) {
            return Err(ServiceError::Conflict(format!(
                "Order {} is cancelled; its lines can no longer change",
                existing.order_detail.code
            )));
        }
        let order_id = existing.order.id;
        let submitted_lines = self.request.lines();
        let submitted_fees = self.request.other_fees();
        let detail_input = self.request.detail();

        let effective_lines: Vec<OrderLineInput> = match submitted_lines {
            Some(lines) => lines.to_vec(),
            None => existing
                .order_products
                .iter()
                .map(|p| OrderLineInput {
                    product_id: p.product_id,
                    product_variant_id: p.product_variant_id,
                    product_qty: p.product_qty,
                })
                .collect(),
        };
        let effective_fees = submitted_fees
            .cloned()
            .or_else(|| existing.order_detail.other_fees.clone())
            .unwrap_or_default();

        let priced = if submitted_lines.is_some() || submitted_fees.is_some() {
            Some(shared::price_order(txn, category, &effective_lines, &effective_fees).await?)
        } else {
            None
        };

        if let (Some(lines), Some(priced)) = (submitted_lines, priced.as_ref()) {
            let prior = quantities_by_variant(
                existing
                    .order_products
                    .iter()
                    .map(|p| (p.product_variant_id, p.product_qty)),
            )?;
            let next =
                quantities_by_variant(lines.iter().map(|l| (l.product_variant_id, l.product_qty)))?;

            let ledger = InventoryLedger::new(txn);
            for (variant_id, delta) in stock_deltas(&prior, &next) {
                debug!(%variant_id, delta, "Reconciling stock");
                match ledger.adjust_by_delta(variant_id, delta).await {
                    Ok(_) => {}
                    Err(ServiceError::NotFound(_)) if delta < 0 => {
                        warn!(%variant_id, "Variant no longer exists; nothing to release");
                    }
                    Err(e) => return Err(e),
                }
            }

            order_product::Entity::delete_many()
                .filter(order_product::Column::OrderId.eq(order_id))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?;

            let now = Utc::now();
            for line in &priced.lines {
                order_product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    order_detail_id: Set(existing.order_detail.id),
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
        }

        if let Some(header) = &self.request.order {
            let mut active: order::ActiveModel = existing.order.clone().into();
            if let Some(id) = header.orderer_customer_id {
                active.orderer_customer_id = Set(id);
            }
            if let Some(id) = header.delivery_target_customer_id {
                active.delivery_target_customer_id = Set(id);
            }
            if let Some(id) = header.delivery_place_id {
                active.delivery_place_id = Set(Some(id));
            }
            if let Some(id) = header.sales_channel_id {
                active.sales_channel_id = Set(Some(id));
            }
            if let Some(date) = header.order_date {
                active.order_date = Set(date);
            }
            if let Some(note) = &header.note {
                active.note = Set(Some(note.clone()));
            }
            active.update(txn).await.map_err(ServiceError::db_error)?;
        }

        let code = existing.order_detail.code.clone();
        let mut detail: order_detail::ActiveModel = existing.order_detail.into();
        if let Some(priced) = &priced {
            detail.original_final_price = Set(priced.breakdown.total);
            detail.final_price = Set(priced.breakdown.total);
        }
        if let Some(input) = detail_input {
            if let Some(code) = &input.code {
                detail.code = Set(code.clone());
            }
            if let Some(fees) = &input.other_fees {
                detail.other_fees = Set(Some(fees.clone()));
            }
            if let Some(price) = input.original_final_price {
                detail.final_price = Set(price);
            }
            if let Some(receipt) = &input.receipt_number {
                detail.receipt_number = Set(Some(receipt.clone()));
            }
        }
        if let Some(payment) = self.request.payment() {
            if let Some(id) = payment.id {
                detail.payment_method_id = Set(Some(id));
            }
            if let Some(date) = payment.date {
                detail.payment_date = Set(Some(date));
            }
        }
        if let Some(status) = payment_status {
            detail.payment_status = Set(status);
        }
        let new_code = detail_input
            .and_then(|d| d.code.clone())
            .unwrap_or(code);
        detail.update(txn).await.map_err(|e| {
            ServiceError::from_write_error(e, format!("Order code {} already exists", new_code))
        })?;

        if let Some(fees) = submitted_fees {
            shared::upsert_installment(txn, order_id, fees).await?;
        }

        if let Some(services) = self.request.shipping_services() {
            shipping_service::Entity::delete_many()
                .filter(shipping_service::Column::OrderId.eq(order_id))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?;
            shared::insert_shipping_services(txn, order_id, services).await?;
        }

        load_order_aggregate(txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}
