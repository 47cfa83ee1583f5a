use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    pub static ref ORDER_CREATIONS: IntCounter =
        IntCounter::new("order_creations_total", "Total number of orders created")
            .expect("metric can be created");
    pub static ref ORDER_CREATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "order_creation_failures_total",
            "Total number of failed order creations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    pub static ref ORDER_UPDATES: IntCounter =
        IntCounter::new("order_updates_total", "Total number of orders updated")
            .expect("metric can be created");
    pub static ref ORDER_UPDATE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "order_update_failures_total",
            "Total number of failed order updates"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    pub static ref ORDER_CANCELLATIONS: IntCounter = IntCounter::new(
        "order_cancellations_total",
        "Total number of order cancellations"
    )
    .expect("metric can be created");
    pub static ref ORDER_DELETIONS: IntCounter =
        IntCounter::new("order_deletions_total", "Total number of orders deleted")
            .expect("metric can be created");
    pub static ref ORDER_IMPORT_ROWS: IntCounterVec = IntCounterVec::new(
        Opts::new("order_import_rows_total", "Imported order rows by outcome"),
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Registers the order command counters with `registry`.
pub fn register(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(ORDER_CREATIONS.clone()))?;
    registry.register(Box::new(ORDER_CREATION_FAILURES.clone()))?;
    registry.register(Box::new(ORDER_UPDATES.clone()))?;
    registry.register(Box::new(ORDER_UPDATE_FAILURES.clone()))?;
    registry.register(Box::new(ORDER_CANCELLATIONS.clone()))?;
    registry.register(Box::new(ORDER_DELETIONS.clone()))?;
    registry.register(Box::new(ORDER_IMPORT_ROWS.clone()))?;
    Ok(())
}
