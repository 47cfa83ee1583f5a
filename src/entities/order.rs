use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// The `orders` table: who ordered, who receives, where and through which channel.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub orderer_customer_id: Uuid,
    pub delivery_target_customer_id: Uuid,
    pub delivery_place_id: Option<Uuid>,
    pub sales_channel_id: Option<Uuid>,
    pub order_date: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::order_detail::Entity")]
    OrderDetail,
    #[sea_orm(has_many = "super::order_product::Entity")]
    OrderProducts,
    #[sea_orm(has_many = "super::shipping_service::Entity")]
    ShippingServices,
    #[sea_orm(has_many = "super::installment::Entity")]
    Installments,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::OrdererCustomerId",
        to = "super::customer::Column::Id"
    )]
    OrdererCustomer,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::DeliveryTargetCustomerId",
        to = "super::customer::Column::Id"
    )]
    DeliveryTargetCustomer,
    #[sea_orm(
        belongs_to = "super::delivery_place::Entity",
        from = "Column::DeliveryPlaceId",
        to = "super::delivery_place::Column::Id"
    )]
    DeliveryPlace,
    #[sea_orm(
        belongs_to = "super::sales_channel::Entity",
        from = "Column::SalesChannelId",
        to = "super::sales_channel::Column::Id"
    )]
    SalesChannel,
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetail.def()
    }
}

impl Related<super::order_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderProducts.def()
    }
}

impl Related<super::shipping_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShippingServices.def()
    }
}

impl Related<super::installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
