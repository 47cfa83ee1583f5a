use crate::{
    commands::{
        orders::{
            CancelOrderCommand, CreateOrderCommand, CreateOrderRequest, DeleteOrderCommand,
            DeleteOrderResult, ImportOrdersCommand, ImportSummary, UpdateOrderCommand,
            UpdateOrderRequest,
        },
        Command,
    },
    config::{AppConfig, RestockPolicy},
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::OrderAggregate,
    queries::{
        order_queries::{GetOrderQuery, ListOrdersQuery, OrderFilter, OrderPage},
        Query,
    },
    services::export::{self, OrderExportRow},
    ServiceResponse,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Knobs the façade takes from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderServiceSettings {
    pub code_prefix: String,
    pub restock_policy: RestockPolicy,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for OrderServiceSettings {
    fn default() -> Self {
        Self {
            code_prefix: "OID".to_string(),
            restock_policy: RestockPolicy::default(),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl From<&AppConfig> for OrderServiceSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            code_prefix: cfg.order_code_prefix.clone(),
            restock_policy: cfg.restock_policy,
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
        }
    }
}

impl OrderServiceSettings {
    /// Missing or zero sizes fall back to the default; larger ones are capped.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(0) | None => self.default_page_size,
            Some(size) => size.min(self.max_page_size),
        }
    }
}

/// Entry points for order writes and reads. Every method answers with a
/// [`ServiceResponse`]; errors never escape.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: OrderServiceSettings,
}

fn respond<T>(
    result: Result<T, ServiceError>,
    ok: impl FnOnce(T) -> ServiceResponse<T>,
) -> ServiceResponse<T> {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            warn!(error = %e, status = e.status_code().as_u16(), "Order operation failed");
            ServiceResponse::from_error(&e)
        }
    }
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: OrderServiceSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            settings,
        }
    }

    pub fn from_config(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, cfg: &AppConfig) -> Self {
        Self::new(db_pool, event_sender, OrderServiceSettings::from(cfg))
    }

    pub fn settings(&self) -> &OrderServiceSettings {
        &self.settings
    }

    #[instrument(skip(self, request))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> ServiceResponse<OrderAggregate> {
        let command = CreateOrderCommand::new(request).with_code_prefix(self.settings.code_prefix.clone());
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        respond(result, |order| ServiceResponse::created("Order created successfully", order))
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> ServiceResponse<OrderAggregate> {
        let command = UpdateOrderCommand::new(order_id, request);
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        respond(result, |order| ServiceResponse::ok("Order updated successfully", order))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: Uuid) -> ServiceResponse<OrderAggregate> {
        let command = CancelOrderCommand::new(order_id).with_restock_policy(self.settings.restock_policy);
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        respond(result, |order| ServiceResponse::ok("Order cancelled successfully", order))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> ServiceResponse<DeleteOrderResult> {
        let result = DeleteOrderCommand { order_id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        respond(result, |deleted| ServiceResponse::ok("Order deleted successfully", deleted))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> ServiceResponse<OrderAggregate> {
        let result = GetOrderQuery { order_id }.execute(&self.db_pool).await;
        respond(result, |order| ServiceResponse::ok("Order retrieved successfully", order))
    }

    #[instrument(skip(self, filter))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> ServiceResponse<OrderPage> {
        let query = ListOrdersQuery::new(
            filter,
            page.unwrap_or(1),
            self.settings.page_size(per_page),
        );
        let result = query.execute(&self.db_pool).await;
        respond(result, |page| ServiceResponse::ok("Orders retrieved successfully", page))
    }

    /// Per-row failures are part of the summary, so the response itself only
    /// fails when the store does.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_orders(&self, rows: Vec<CreateOrderRequest>) -> ServiceResponse<ImportSummary> {
        let command = ImportOrdersCommand::new(rows).with_code_prefix(self.settings.code_prefix.clone());
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        respond(result, |summary| {
            let message = format!(
                "Imported {} orders, skipped {}, failed {}",
                summary.imported,
                summary.skipped,
                summary.failures.len()
            );
            ServiceResponse::ok(message, summary)
        })
    }

    #[instrument(skip(self, filter))]
    pub async fn export_orders(&self, filter: OrderFilter) -> ServiceResponse<Vec<OrderExportRow>> {
        let result = export::export_orders(self.db_pool.as_ref(), &filter).await;
        respond(result, |rows| ServiceResponse::ok("Orders exported successfully", rows))
    }
}
