use async_trait::async_trait;

use crate::{db::DbPool, errors::ServiceError};

pub mod order_queries;

/// Trait representing a generic asynchronous read.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    /// Executes the query against the pool.
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError>;
}
