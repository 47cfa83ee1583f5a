use crate::{entities::product_variant, errors::ServiceError};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Outcome of a stock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock is not tracked for the variant; nothing changed.
    Untracked,
    /// Tracked stock moved by this signed amount.
    Applied(i32),
}

/// The only code that writes `product_variants.stock`.
///
/// Every mutation is a single conditional `UPDATE`, so two writers can never
/// both take the last units. Run it on the caller's transaction so an abort
/// later in the order write undoes the reservation too.
pub struct InventoryLedger<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> InventoryLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    async fn variant(&self, variant_id: Uuid) -> Result<product_variant::Model, ServiceError> {
        product_variant::Entity::find_by_id(variant_id)
            .one(self.conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product variant {} not found", variant_id))
            })
    }

    /// Takes `qty` units, failing with `InsufficientStock` if fewer are on hand.
    #[instrument(skip(self))]
    pub async fn reserve(&self, variant_id: Uuid, qty: i32) -> Result<StockEffect, ServiceError> {
        if qty < 0 {
            return Err(ServiceError::InvalidInput(format!(
                "cannot reserve a negative quantity ({})",
                qty
            )));
        }

        let variant = self.variant(variant_id).await?;
        let Some(available) = variant.stock else {
            return Ok(StockEffect::Untracked);
        };
        if qty == 0 {
            return Ok(StockEffect::Applied(0));
        }

        let result = product_variant::Entity::update_many()
            .col_expr(
                product_variant::Column::Stock,
                Expr::col(product_variant::Column::Stock).sub(qty),
            )
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_variant::Column::Id.eq(variant_id))
            .filter(product_variant::Column::Stock.gte(qty))
            .exec(self.conn)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            counter!("orderdesk_inventory.reserve_rejected", 1);
            warn!(%variant_id, sku = %variant.sku, available, requested = qty, "Insufficient stock");
            return Err(ServiceError::InsufficientStock(format!(
                "variant {} has {} in stock, {} requested",
                variant.sku, available, qty
            )));
        }

        debug!(%variant_id, qty, "Stock reserved");
        Ok(StockEffect::Applied(-qty))
    }

    /// Returns `qty` units. Never fails on availability.
    #[instrument(skip(self))]
    pub async fn release(&self, variant_id: Uuid, qty: i32) -> Result<StockEffect, ServiceError> {
        if qty < 0 {
            return Err(ServiceError::InvalidInput(format!(
                "cannot release a negative quantity ({})",
                qty
            )));
        }

        let variant = self.variant(variant_id).await?;
        if variant.stock.is_none() {
            return Ok(StockEffect::Untracked);
        }
        if qty == 0 {
            return Ok(StockEffect::Applied(0));
        }

        product_variant::Entity::update_many()
            .col_expr(
                product_variant::Column::Stock,
                Expr::col(product_variant::Column::Stock).add(qty),
            )
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_variant::Column::Id.eq(variant_id))
            .filter(product_variant::Column::Stock.is_not_null())
            .exec(self.conn)
            .await
            .map_err(ServiceError::db_error)?;

        debug!(%variant_id, qty, "Stock released");
        Ok(StockEffect::Applied(qty))
    }

    /// Returns `qty` units to every tracked variant of a product.
    pub async fn release_all_variants(
        &self,
        product_id: Uuid,
        qty: i32,
    ) -> Result<u64, ServiceError> {
        if qty <= 0 {
            return Ok(0);
        }

        let result = product_variant::Entity::update_many()
            .col_expr(
                product_variant::Column::Stock,
                Expr::col(product_variant::Column::Stock).add(qty),
            )
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_variant::Column::ProductId.eq(product_id))
            .filter(product_variant::Column::Stock.is_not_null())
            .exec(self.conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected)
    }

    /// Positive deltas reserve, negative deltas release, zero is a no-op.
    pub async fn adjust_by_delta(
        &self,
        variant_id: Uuid,
        delta: i32,
    ) -> Result<StockEffect, ServiceError> {
        match delta {
            d if d > 0 => self.reserve(variant_id, d).await,
            d if d < 0 => self.release(variant_id, d.saturating_neg()).await,
            _ => Ok(StockEffect::Applied(0)),
        }
    }
}
