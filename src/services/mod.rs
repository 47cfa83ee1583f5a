pub mod export;
pub mod fees;
pub mod inventory;
pub mod orders;
pub mod pricing;
