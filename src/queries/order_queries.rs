use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    sea_query::{Query as SelectQuery, SelectStatement},
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::Query;
use crate::{
    db::DbPool,
    entities::{customer, installment, order, order_detail, order_product, product, shipping_service},
    errors::ServiceError,
    models::{CustomerCategory, OrderAggregate, PaymentStatus},
};

/// Loads one order with everything it owns, through any connection or transaction.
pub async fn load_order_aggregate<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<OrderAggregate>, ServiceError> {
    let Some(order) = order::Entity::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
    else {
        return Ok(None);
    };
    let mut loaded = load_aggregates(conn, vec![order]).await?;
    Ok(loaded.pop())
}

/// Attaches details, lines, shipping services and installments to `orders`,
/// keeping their order. Orders without a detail row are skipped.
pub(crate) async fn load_aggregates<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderAggregate>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let mut details: HashMap<Uuid, order_detail::Model> = order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.is_in(ids.clone()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|d| (d.order_id, d))
        .collect();

    let mut products = group_by_order(
        order_product::Entity::find()
            .filter(order_product::Column::OrderId.is_in(ids.clone()))
            .order_by_asc(order_product::Column::CreatedAt)
            .order_by_asc(order_product::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?,
        |p| p.order_id,
    );

    let mut services = group_by_order(
        shipping_service::Entity::find()
            .filter(shipping_service::Column::OrderId.is_in(ids.clone()))
            .order_by_asc(shipping_service::Column::CreatedAt)
            .order_by_asc(shipping_service::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?,
        |s| s.order_id,
    );

    let mut installments = group_by_order(
        installment::Entity::find()
            .filter(installment::Column::OrderId.is_in(ids))
            .order_by_asc(installment::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?,
        |i| i.order_id,
    );

    Ok(orders
        .into_iter()
        .filter_map(|order| {
            let order_detail = details.remove(&order.id)?;
            Some(OrderAggregate {
                order_products: products.remove(&order.id).unwrap_or_default(),
                shipping_services: services.remove(&order.id).unwrap_or_default(),
                installments: installments.remove(&order.id).unwrap_or_default(),
                order,
                order_detail,
            })
        })
        .collect())
}

fn group_by_order<T>(rows: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut grouped: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

/// Struct to get a specific order by ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetOrderQuery {
    pub order_id: Uuid,
}

#[async_trait]
impl Query for GetOrderQuery {
    type Result = OrderAggregate;

    #[instrument(skip(self, db), fields(order_id = %self.order_id))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderQuery");
        load_order_aggregate(db, self.order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))
    }
}

/// Typed filter for order listings. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilter {
    pub sales_channel_id: Option<Uuid>,
    /// Category of the ordering customer; `CUSTOMER` also matches customers without one.
    pub customer_category: Option<CustomerCategory>,
    pub payment_status: Option<PaymentStatus>,
    pub product_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub order_date: Option<NaiveDate>,
    /// 1..=12; combined with `order_year`, or the current year when that is absent.
    pub order_month: Option<u32>,
    pub order_year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    /// Inclusive.
    pub end_date: Option<NaiveDate>,
    pub missing_receipt: bool,
    pub orderer_customer_id: Option<Uuid>,
    pub delivery_target_customer_id: Option<Uuid>,
    pub delivery_place_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub code: Option<String>,
    pub customer_name: Option<String>,
    pub product_name: Option<String>,
    pub receipt_number: Option<String>,
    pub phone_number: Option<String>,
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, ServiceError> {
    date.succ_opt()
        .ok_or_else(|| ServiceError::InvalidInput(format!("date {} is out of range", date)))
}

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let invalid = || ServiceError::InvalidInput(format!("invalid month {}-{}", year, month));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;
    Ok((first, next))
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let invalid = || ServiceError::InvalidInput(format!("invalid year {}", year));
    Ok((
        NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?,
        NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?,
    ))
}

fn detail_orders(cond: Condition) -> SelectStatement {
    SelectQuery::select()
        .column(order_detail::Column::OrderId)
        .from(order_detail::Entity)
        .cond_where(cond)
        .to_owned()
}

fn line_orders(cond: Condition) -> SelectStatement {
    SelectQuery::select()
        .column(order_product::Column::OrderId)
        .from(order_product::Entity)
        .cond_where(cond)
        .to_owned()
}

fn customers(cond: Condition) -> SelectStatement {
    SelectQuery::select()
        .column(customer::Column::Id)
        .from(customer::Entity)
        .cond_where(cond)
        .to_owned()
}

/// Orders whose orderer or delivery target matches `cond`.
fn either_customer(cond: Condition) -> Condition {
    Condition::any()
        .add(order::Column::OrdererCustomerId.in_subquery(customers(cond.clone())))
        .add(order::Column::DeliveryTargetCustomerId.in_subquery(customers(cond)))
}

impl OrderFilter {
    /// Builds the `WHERE` clause over `orders`.
    pub fn condition(&self) -> Result<Condition, ServiceError> {
        let mut cond = Condition::all();

        if let Some(id) = self.sales_channel_id {
            cond = cond.add(order::Column::SalesChannelId.eq(id));
        }
        if let Some(category) = self.customer_category {
            let mut by_category = Condition::any().add(customer::Column::Category.eq(category));
            if category == CustomerCategory::Customer {
                by_category = by_category.add(customer::Column::Category.is_null());
            }
            cond = cond.add(order::Column::OrdererCustomerId.in_subquery(customers(by_category)));
        }
        if let Some(status) = self.payment_status {
            cond = cond.add(order::Column::Id.in_subquery(detail_orders(
                Condition::all().add(order_detail::Column::PaymentStatus.eq(status)),
            )));
        }
        if let Some(product_id) = self.product_id {
            cond = cond.add(order::Column::Id.in_subquery(line_orders(
                Condition::all().add(order_product::Column::ProductId.eq(product_id)),
            )));
        }
        if let Some(method) = self.payment_method_id {
            cond = cond.add(order::Column::Id.in_subquery(detail_orders(
                Condition::all().add(order_detail::Column::PaymentMethodId.eq(method)),
            )));
        }
        if let Some(date) = self.order_date {
            cond = cond
                .add(order::Column::OrderDate.gte(start_of(date)))
                .add(order::Column::OrderDate.lt(start_of(next_day(date)?)));
        }
        match (self.order_month, self.order_year) {
            (Some(month), year) => {
                let (from, to) = month_bounds(year.unwrap_or_else(|| Utc::now().year()), month)?;
                cond = cond
                    .add(order::Column::OrderDate.gte(start_of(from)))
                    .add(order::Column::OrderDate.lt(start_of(to)));
            }
            (None, Some(year)) => {
                let (from, to) = year_bounds(year)?;
                cond = cond
                    .add(order::Column::OrderDate.gte(start_of(from)))
                    .add(order::Column::OrderDate.lt(start_of(to)));
            }
            (None, None) => {}
        }
        if let Some(start) = self.start_date {
            cond = cond.add(order::Column::OrderDate.gte(start_of(start)));
        }
        if let Some(end) = self.end_date {
            cond = cond.add(order::Column::OrderDate.lt(start_of(next_day(end)?)));
        }
        if self.missing_receipt {
            cond = cond.add(order::Column::Id.in_subquery(detail_orders(
                Condition::any()
                    .add(order_detail::Column::ReceiptNumber.is_null())
                    .add(order_detail::Column::ReceiptNumber.eq("")),
            )));
        }
        if let Some(id) = self.orderer_customer_id {
            cond = cond.add(order::Column::OrdererCustomerId.eq(id));
        }
        if let Some(id) = self.delivery_target_customer_id {
            cond = cond.add(order::Column::DeliveryTargetCustomerId.eq(id));
        }
        if let Some(id) = self.delivery_place_id {
            cond = cond.add(order::Column::DeliveryPlaceId.eq(id));
        }
        if let Some(id) = self.order_id {
            cond = cond.add(order::Column::Id.eq(id));
        }
        if let Some(code) = non_blank(&self.code) {
            cond = cond.add(order::Column::Id.in_subquery(detail_orders(
                Condition::all().add(order_detail::Column::Code.contains(code)),
            )));
        }
        if let Some(name) = non_blank(&self.customer_name) {
            cond = cond.add(either_customer(
                Condition::all().add(customer::Column::Name.contains(name)),
            ));
        }
        if let Some(name) = non_blank(&self.product_name) {
            let products = SelectQuery::select()
                .column(product::Column::Id)
                .from(product::Entity)
                .and_where(product::Column::Name.contains(name))
                .to_owned();
            cond = cond.add(order::Column::Id.in_subquery(line_orders(
                Condition::all().add(order_product::Column::ProductId.in_subquery(products)),
            )));
        }
        if let Some(receipt) = non_blank(&self.receipt_number) {
            cond = cond.add(order::Column::Id.in_subquery(detail_orders(
                Condition::all().add(order_detail::Column::ReceiptNumber.contains(receipt)),
            )));
        }
        if let Some(phone) = non_blank(&self.phone_number) {
            cond = cond.add(either_customer(
                Condition::all().add(customer::Column::Phone.contains(phone)),
            ));
        }

        Ok(cond)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub items: Vec<OrderAggregate>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// Filtered, newest-first page of orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub filter: OrderFilter,
    /// Starts at 1.
    pub page: u64,
    pub per_page: u64,
}

impl ListOrdersQuery {
    pub fn new(filter: OrderFilter, page: u64, per_page: u64) -> Self {
        Self {
            filter,
            page,
            per_page,
        }
    }
}

#[async_trait]
impl Query for ListOrdersQuery {
    type Result = OrderPage;

    #[instrument(skip(self, db), fields(page = self.page, per_page = self.per_page))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        if self.page == 0 || self.per_page == 0 {
            return Err(ServiceError::InvalidInput(
                "page and perPage must be at least 1".to_string(),
            ));
        }

        let paginator = order::Entity::find()
            .filter(self.filter.condition()?)
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(db, self.per_page);

        let counts = paginator.num_items_and_pages().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(self.page - 1)
            .await
            .map_err(ServiceError::db_error)?;
        debug!(found = orders.len(), total = counts.number_of_items, "Listed orders");

        Ok(OrderPage {
            items: load_aggregates(db, orders).await?,
            total: counts.number_of_items,
            page: self.page,
            per_page: self.per_page,
            total_pages: counts.number_of_pages,
        })
    }
}
