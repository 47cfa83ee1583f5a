pub mod order_aggregate;
pub mod other_fees;
pub mod status;

pub use order_aggregate::OrderAggregate;
pub use other_fees::{
    check_amount, Discount, DiscountKind, InstallmentFee, OtherFees, ProductDiscount,
    ShippingCost, MAX_AMOUNT, OTHER_FEES_VERSION,
};
pub use status::{CustomerCategory, PaymentStatus};
