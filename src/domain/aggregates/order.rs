//! Order Aggregate
//!
//! An order is the immutable snapshot of a cart taken at checkout. Only the
//! status and tracking fields may change afterwards, and status changes are
//! constrained to the state machine below.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::Money;

/// Lifecycle: pending → processed → shipped → delivered, with cancellation
/// allowed from any non-terminal state. Delivered and cancelled are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "processed" => Some(Self::Processed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, Self::Pending | Self::Processed | Self::Shipped)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processed)
                | (Processed, Shipped)
                | (Shipped, Delivered)
                | (Pending | Processed | Shipped, Cancelled)
        )
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrderError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Paypal => "paypal",
        }
    }
}

/// Delivery fields copied off the chosen address at checkout, so later
/// address edits never touch the order.
#[derive(Clone, Debug, Serialize)]
pub struct Delivery {
    pub street: String,
    pub city: String,
    pub municipality: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

#[derive(Clone, Debug)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: OrderStatus,
    payment_method: PaymentMethod,
    items: Vec<OrderLine>,
    total: Money,
    delivery: Delivery,
    created_at: DateTime<Utc>,
    estimated_delivery_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots the cart into a pending order. Prices and quantities are
    /// frozen here; the cart itself is cleared by the caller in the same
    /// transaction that persists the order.
    pub fn from_cart(
        order_number: String,
        cart: &Cart,
        delivery: Delivery,
        payment_method: PaymentMethod,
        delivery_offset_days: i64,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let items: Vec<OrderLine> = cart
            .items()
            .iter()
            .map(|i| OrderLine {
                product_id: i.product_id,
                name: i.name.clone(),
                quantity: i.quantity,
                unit_price: i.unit_price.clone(),
                line_total: i.line_total(),
            })
            .collect();
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            order_number,
            user_id: cart.user_id(),
            status: OrderStatus::Pending,
            payment_method,
            items,
            total: cart.total(),
            delivery,
            created_at: now,
            estimated_delivery_at: now + Duration::days(delivery_offset_days),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn order_number(&self) -> &str {
        &self.order_number
    }
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
    pub fn status(&self) -> OrderStatus {
        self.status
    }
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }
    pub fn total(&self) -> &Money {
        &self.total
    }
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn estimated_delivery_at(&self) -> DateTime<Utc> {
        self.estimated_delivery_at
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("cannot create an order from an empty cart")]
    EmptyCart,
    #[error("illegal status change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::CartItem;
    use rust_decimal::Decimal;

    fn delivery() -> Delivery {
        Delivery {
            street: "Av. Juárez 12".into(),
            city: "Oaxaca".into(),
            municipality: "Centro".into(),
            state: "Oaxaca".into(),
            postal_code: "68000".into(),
            phone: "9511234567".into(),
        }
    }

    fn cart_with(lines: &[(u32, i64)]) -> Cart {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        for (quantity, pesos) in lines {
            cart.add_item(CartItem {
                product_id: Uuid::new_v4(),
                name: "Sombrero".into(),
                image_url: None,
                quantity: *quantity,
                unit_price: Money::mxn(Decimal::new(*pesos, 0)),
            });
        }
        cart
    }

    #[test]
    fn forward_transitions_are_legal() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processed));
        assert!(Processed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn cancel_is_legal_from_every_non_terminal_state() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use OrderStatus::*;
        for next in [Pending, Processed, Shipped, Delivered, Cancelled] {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn skips_and_backward_moves_are_rejected() {
        use OrderStatus::*;
        assert_eq!(
            Pending.transition(Shipped),
            Err(OrderError::InvalidTransition { from: Pending, to: Shipped })
        );
        assert!(Shipped.transition(Processed).is_err());
        assert!(Processed.transition(Pending).is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        use OrderStatus::*;
        for status in [Pending, Processed, Shipped, Delivered, Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn from_cart_rejects_empty_cart() {
        let cart = Cart::new(Uuid::new_v4(), "MXN");
        let err = Order::from_cart("ORD-00000001".into(), &cart, delivery(), PaymentMethod::Card, 5)
            .unwrap_err();
        assert_eq!(err, OrderError::EmptyCart);
    }

    #[test]
    fn from_cart_freezes_lines_and_total() {
        let cart = cart_with(&[(2, 150), (1, 99)]);
        let order =
            Order::from_cart("ORD-00000002".into(), &cart, delivery(), PaymentMethod::Paypal, 5)
                .unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total().amount(), Decimal::new(399, 0));
        assert_eq!(order.total().amount(), cart.total().amount());
        assert_eq!(order.items()[0].line_total.amount(), Decimal::new(300, 0));
    }

    #[test]
    fn estimated_delivery_uses_configured_offset() {
        let cart = cart_with(&[(1, 100)]);
        let order = Order::from_cart("ORD-00000003".into(), &cart, delivery(), PaymentMethod::Card, 7)
            .unwrap();
        assert_eq!(order.estimated_delivery_at() - order.created_at(), Duration::days(7));
    }
}
