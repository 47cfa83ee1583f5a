use crate::{
    entities::{product_price, product_variant},
    errors::ServiceError,
    models::CustomerCategory,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

/// Unit price a customer of `category` pays for a variant.
///
/// A tier that is unset or zero falls back to `normal`; a variant without a
/// price row costs 0.
pub fn resolve_price(price: Option<&product_price::Model>, category: CustomerCategory) -> Decimal {
    let Some(price) = price else {
        return Decimal::ZERO;
    };
    let normal = price.normal.unwrap_or_default();

    let tier = match category {
        CustomerCategory::Customer | CustomerCategory::Dropshipper => None,
        CustomerCategory::Member => price.member,
        CustomerCategory::Reseller => price.reseller,
        CustomerCategory::Agent => price.agent,
    };

    match tier {
        Some(value) if !value.is_zero() => value,
        _ => normal,
    }
}

/// The variant used when a line names only a product: lowest `position`,
/// then oldest, then lowest id, so the choice never depends on storage order.
pub async fn default_variant<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Option<product_variant::Model>, ServiceError> {
    product_variant::Entity::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .order_by_asc(product_variant::Column::Position)
        .order_by_asc(product_variant::Column::CreatedAt)
        .order_by_asc(product_variant::Column::Id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// A line after pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    /// Variant whose price was used, if the product has any.
    pub priced_variant_id: Option<Uuid>,
    pub unit_price: Decimal,
}

/// Reads price rows through whichever connection or transaction it is given.
pub struct PricingResolver<'a, C> {
    conn: &'a C,
    category: CustomerCategory,
}

impl<'a, C: ConnectionTrait> PricingResolver<'a, C> {
    pub fn new(conn: &'a C, category: CustomerCategory) -> Self {
        Self { conn, category }
    }

    pub fn category(&self) -> CustomerCategory {
        self.category
    }

    pub async fn price_row(
        &self,
        variant_id: Uuid,
    ) -> Result<Option<product_price::Model>, ServiceError> {
        product_price::Entity::find()
            .filter(product_price::Column::ProductVariantId.eq(variant_id))
            .order_by_asc(product_price::Column::Id)
            .one(self.conn)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Tier price of one variant; 0 when it has no price row.
    pub async fn unit_price(&self, variant_id: Uuid) -> Result<Decimal, ServiceError> {
        let row = self.price_row(variant_id).await?;
        Ok(resolve_price(row.as_ref(), self.category))
    }

    /// Prices a line, substituting the product's default variant when none is given.
    /// A product with no variants prices at 0.
    pub async fn price_line(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<PricedLine, ServiceError> {
        let priced_variant_id = match variant_id {
            Some(id) => Some(id),
            None => default_variant(self.conn, product_id).await?.map(|v| v.id),
        };

        let unit_price = match priced_variant_id {
            Some(id) => self.unit_price(id).await?,
            None => Decimal::ZERO,
        };

        Ok(PricedLine {
            priced_variant_id,
            unit_price,
        })
    }
}
