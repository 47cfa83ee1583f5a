pub mod cancel_order_command;
pub mod create_order_command;
pub mod delete_order_command;
pub mod import_orders_command;
pub mod metrics;
pub mod payload;
pub(crate) mod shared;
pub mod update_order_command;

// Re-export commands for easier access
pub use cancel_order_command::CancelOrderCommand;
pub use create_order_command::CreateOrderCommand;
pub use delete_order_command::{DeleteOrderCommand, DeleteOrderResult};
pub use import_orders_command::{ImportFailure, ImportOrdersCommand, ImportSummary};
pub use payload::{
    CreateOrderRequest, DetailInput, OrderDetailBlock, OrderDetailPatch, OrderHeader,
    OrderHeaderPatch, OrderLineInput, PaymentInput, ShippingServiceInput, UpdateOrderRequest,
};
pub use shared::generate_code;
pub use update_order_command::UpdateOrderCommand;
