use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Carrier and service chosen for an order, with its cost breakdown.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipping_name: String,
    pub service_name: String,
    pub weight: Option<Decimal>,
    pub is_cod: bool,
    pub shipping_cost: Option<Decimal>,
    pub shipping_cashback: Option<Decimal>,
    pub shipping_cost_net: Option<Decimal>,
    pub grandtotal: Option<Decimal>,
    pub service_fee: Option<Decimal>,
    pub net_income: Option<Decimal>,
    pub etd: Option<String>,
    #[sea_orm(column_name = "type")]
    pub service_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
