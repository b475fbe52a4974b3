//! Refund Sub-ledger
//!
//! One refund per cancelled order, opened in the same transaction that
//! cancels the order. The amount is fixed to the order total at cancellation;
//! partial refunds are not modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    InProgress,
    Completed,
}

impl RefundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Refund {
    pub order_id: Uuid,
    pub amount: Money,
    pub status: RefundStatus,
    pub cancelled_at: DateTime<Utc>,
}

impl Refund {
    pub fn for_order(order_id: Uuid, order_total: Money) -> Self {
        Self {
            order_id,
            amount: order_total,
            status: RefundStatus::InProgress,
            cancelled_at: Utc::now(),
        }
    }
}
