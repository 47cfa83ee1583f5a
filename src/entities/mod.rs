pub mod customer;
pub mod delivery_place;
pub mod installment;
pub mod order;
pub mod order_detail;
pub mod order_product;
pub mod payment_method;
pub mod product;
pub mod product_price;
pub mod product_variant;
pub mod sales_channel;
pub mod shipping_service;
