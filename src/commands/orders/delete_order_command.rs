use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::{installment, order, order_detail, order_product, shipping_service},
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::metrics::ORDER_DELETIONS;

/// Removes an order and everything it owns. Stock is left as it is;
/// cancellation is the path that gives stock back.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteOrderCommand {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderResult {
    pub id: Uuid,
    pub code: String,
}

#[async_trait]
impl Command for DeleteOrderCommand {
    type Result = DeleteOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = db::begin(db_pool.as_ref()).await?;
        let outcome = self.delete_order(&txn).await;
        let code = db::settle(txn, outcome).await.map_err(|e| {
            error!(error = %e, "Failed to delete order");
            e
        })?;

        ORDER_DELETIONS.inc();
        info!(%code, "Order deleted");
        event_sender.send_or_log(Event::OrderDeleted(self.order_id)).await;

        Ok(DeleteOrderResult {
            id: self.order_id,
            code,
        })
    }
}

impl DeleteOrderCommand {
    async fn delete_order(&self, txn: &DatabaseTransaction) -> Result<String, ServiceError> {
        order::Entity::find_by_id(self.order_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;

        let code = order_detail::Entity::find()
            .filter(order_detail::Column::OrderId.eq(self.order_id))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|d| d.code)
            .unwrap_or_default();

        shipping_service::Entity::delete_many()
            .filter(shipping_service::Column::OrderId.eq(self.order_id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        order_product::Entity::delete_many()
            .filter(order_product::Column::OrderId.eq(self.order_id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        installment::Entity::delete_many()
            .filter(installment::Column::OrderId.eq(self.order_id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        order_detail::Entity::delete_many()
            .filter(order_detail::Column::OrderId.eq(self.order_id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        order::Entity::delete_by_id(self.order_id)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(code)
    }
}
