use crate::{
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    create_order_command::CreateOrderCommand,
    metrics::ORDER_IMPORT_ROWS,
    payload::CreateOrderRequest,
    shared::{self, DEFAULT_CODE_PREFIX},
};

/// Creates one order per already-parsed row, skipping rows whose code is taken.
#[derive(Debug, Clone)]
pub struct ImportOrdersCommand {
    pub rows: Vec<CreateOrderRequest>,
    pub code_prefix: String,
}

impl ImportOrdersCommand {
    pub fn new(rows: Vec<CreateOrderRequest>) -> Self {
        Self {
            rows,
            code_prefix: DEFAULT_CODE_PREFIX.to_string(),
        }
    }

    pub fn with_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.code_prefix = prefix.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Zero-based position in the submitted rows.
    pub row: usize,
    pub code: Option<String>,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub imported_codes: Vec<String>,
    pub skipped_codes: Vec<String>,
    pub failures: Vec<ImportFailure>,
}

#[async_trait::async_trait]
impl Command for ImportOrdersCommand {
    type Result = ImportSummary;

    #[instrument(skip(self, db_pool, event_sender), fields(rows = self.rows.len()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut summary = ImportSummary::default();

        for (index, row) in self.rows.iter().enumerate() {
            if let Some(code) = row.code() {
                if shared::code_exists(db_pool.as_ref(), code, None).await? {
                    ORDER_IMPORT_ROWS.with_label_values(&["skipped"]).inc();
                    summary.skipped += 1;
                    summary.skipped_codes.push(code.to_string());
                    continue;
                }
            }

            let command =
                CreateOrderCommand::new(row.clone()).with_code_prefix(self.code_prefix.clone());
            match command.execute(db_pool.clone(), event_sender.clone()).await {
                Ok(created) => {
                    ORDER_IMPORT_ROWS.with_label_values(&["imported"]).inc();
                    summary.imported += 1;
                    summary.imported_codes.push(created.order_detail.code);
                }
                Err(e) => {
                    ORDER_IMPORT_ROWS.with_label_values(&["failed"]).inc();
                    warn!(row = index, error = %e, "Import row failed");
                    summary.failures.push(ImportFailure {
                        row: index,
                        code: row.code().map(str::to_string),
                        message: e.response_message(),
                        status_code: e.status_code().as_u16(),
                    });
                }
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "Order import finished"
        );
        event_sender
            .send_or_log(Event::OrdersImported {
                imported: summary.imported,
                skipped: summary.skipped,
                failed: summary.failures.len(),
            })
            .await;

        Ok(summary)
    }
}
