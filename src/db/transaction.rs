/*!
 * Transaction helpers
 *
 * Order writes open a transaction with [`begin`], run every step against the
 * returned handle, and hand the outcome to [`settle`], which commits on `Ok`
 * and rolls back on `Err`.
 */

use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, error, warn};

/// Opens a transaction on the pool.
pub async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, ServiceError> {
    let txn = db.begin().await.map_err(|e| {
        error!(error = %e, "Failed to start transaction");
        ServiceError::DatabaseError(e)
    })?;
    counter!("orderdesk_db.transaction.started", 1);
    Ok(txn)
}

/// Commits `txn` if `result` is `Ok`, otherwise rolls it back and returns the original error.
///
/// A failed rollback is logged; the error that caused it is the one reported.
///
/// ```rust,ignore
/// let txn = db::begin(&db).await?;
/// let result = write_order_graph(&txn, &payload).await;
/// let order = db::settle(txn, result).await?;
/// ```
pub async fn settle<T>(
    txn: DatabaseTransaction,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(|e| {
                error!(error = %e, "Failed to commit transaction");
                counter!("orderdesk_db.transaction.commit_failed", 1);
                ServiceError::DatabaseError(e)
            })?;
            counter!("orderdesk_db.transaction.committed", 1);
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, cause = %err, "Transaction rollback failed");
            }
            counter!("orderdesk_db.transaction.rolled_back", 1);
            debug!(cause = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
