use crate::{
    commands::Command,
    config::RestockPolicy,
    db::{self, DbPool},
    entities::{order_detail, order_product},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderAggregate, PaymentStatus},
    queries::order_queries::load_order_aggregate,
    services::inventory::InventoryLedger,
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::metrics::ORDER_CANCELLATIONS;

/// Marks an order CANCEL and gives its stock back. No rows are deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderCommand {
    pub order_id: Uuid,
    #[serde(default)]
    pub restock_policy: RestockPolicy,
}

impl CancelOrderCommand {
    pub fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            restock_policy: RestockPolicy::default(),
        }
    }

    pub fn with_restock_policy(mut self, policy: RestockPolicy) -> Self {
        self.restock_policy = policy;
        self
    }
}

#[async_trait::async_trait]
impl Command for CancelOrderCommand {
    type Result = OrderAggregate;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, policy = %self.restock_policy))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = db::begin(db_pool.as_ref()).await?;
        let outcome = self.cancel_in_txn(&txn).await;
        let cancelled = db::settle(txn, outcome).await.map_err(|e| {
            error!(error = %e, "Order cancellation failed");
            e
        })?;

        ORDER_CANCELLATIONS.inc();
        info!(code = %cancelled.order_detail.code, "Order cancelled");
        event_sender
            .send_or_log(Event::OrderCancelled(self.order_id))
            .await;
        Ok(cancelled)
    }
}

impl CancelOrderCommand {
    async fn cancel_in_txn(&self, txn: &DatabaseTransaction) -> Result<OrderAggregate, ServiceError> {
        // Only the transaction that flips the status restocks; a concurrent
        // cancel waits on the row and then matches nothing.
        let claimed = order_detail::Entity::update_many()
            .col_expr(order_detail::Column::PaymentStatus, Expr::value(PaymentStatus::Cancel))
            .col_expr(order_detail::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order_detail::Column::OrderId.eq(self.order_id))
            .filter(order_detail::Column::PaymentStatus.ne(PaymentStatus::Cancel))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let cancelled = load_order_aggregate(txn, self.order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;

        if claimed.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} is already cancelled",
                cancelled.order_detail.code
            )));
        }

        self.restock(txn, &cancelled.order_products).await?;
        Ok(cancelled)
    }

    async fn restock(
        &self,
        txn: &DatabaseTransaction,
        lines: &[order_product::Model],
    ) -> Result<(), ServiceError> {
        let ledger = InventoryLedger::new(txn);

        for line in lines {
            match self.restock_policy {
                RestockPolicy::ReservedVariant => {
                    let Some(variant_id) = line.product_variant_id else {
                        continue;
                    };
                    match ledger.release(variant_id, line.product_qty).await {
                        Ok(_) => {}
                        Err(ServiceError::NotFound(_)) => {
                            warn!(%variant_id, "Variant no longer exists; nothing to restock");
                        }
                        Err(e) => return Err(e),
                    }
                }
                RestockPolicy::AllVariants => {
                    ledger
                        .release_all_variants(line.product_id, line.product_qty)
                        .await?;
                }
            }
        }
        Ok(())
    }
}
