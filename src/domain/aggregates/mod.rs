//! Aggregates module
pub mod cart;
pub mod order;
pub mod refund;

pub use cart::{Cart, CartItem};
pub use order::{Delivery, Order, OrderError, OrderLine, OrderStatus, PaymentMethod};
pub use refund::{Refund, RefundStatus};
