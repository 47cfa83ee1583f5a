//! orderdesk
//!
//! Order transaction engine for a retail back office: tiered pricing, fee
//! aggregation and per-variant stock reservation over a sea-orm store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod models;
pub mod queries;
pub mod services;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Uniform result of every order entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub status_code: u16,
}

impl<T> ServiceResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            status_code: status.as_u16(),
        }
    }

    pub fn from_error(error: &ServiceError) -> Self {
        Self {
            success: false,
            message: error.response_message(),
            data: None,
            status_code: error.status_code().as_u16(),
        }
    }

    pub fn into_result(self) -> Result<T, (u16, String)> {
        match self.data {
            Some(data) if self.success => Ok(data),
            _ => Err((self.status_code, self.message)),
        }
    }
}

pub mod prelude {
    pub use crate::commands::orders::{
        CancelOrderCommand, CreateOrderCommand, CreateOrderRequest, DeleteOrderCommand,
        ImportOrdersCommand, ImportSummary, UpdateOrderCommand, UpdateOrderRequest,
    };
    pub use crate::commands::Command;
    pub use crate::config::{AppConfig, RestockPolicy};
    pub use crate::db::{DbConfig, DbPool};
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::models::{CustomerCategory, Discount, OrderAggregate, OtherFees, PaymentStatus};
    pub use crate::queries::order_queries::{GetOrderQuery, ListOrdersQuery, OrderFilter, OrderPage};
    pub use crate::queries::Query;
    pub use crate::services::orders::{OrderService, OrderServiceSettings};
    pub use crate::ServiceResponse;
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_response_serializes_camel_case() {
        let response = ServiceResponse::created("Order created successfully", json!({ "code": "OID-1" }));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "success": true,
                "message": "Order created successfully",
                "data": { "code": "OID-1" },
                "statusCode": 201
            })
        );
    }

    #[test]
    fn error_response_carries_status_and_hides_database_details() {
        let response: ServiceResponse<()> =
            ServiceResponse::from_error(&ServiceError::db_error("relation missing"));
        assert!(!response.success);
        assert_eq!(response.status_code, 500);
        assert_eq!(response.message, "Database error");
        assert!(response.data.is_none());

        let response: ServiceResponse<()> =
            ServiceResponse::from_error(&ServiceError::InsufficientStock("SKU-1".into()));
        assert_eq!(response.status_code, 422);
        assert_eq!(response.into_result(), Err((422, "Insufficient stock: SKU-1".to_string())));
    }
}
