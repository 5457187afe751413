//! Order types and the order lifecycle states.

use super::ids::OrderId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells. Multiplies an unsigned size into a position delta.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifecycle states.
///
/// `Submitted` and `Accepted` are transient. `Completed`, `Cancelled`, `Margin`
/// and `Rejected` are terminal: once reached, the order is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created by the strategy, not yet seen by the broker.
    Submitted,
    /// Validated by the broker and scheduled for execution.
    Accepted,
    /// Fully filled.
    Completed,
    /// Withdrawn before execution (strategy request or end of data).
    Cancelled,
    /// Not enough cash to pay for the fill.
    Margin,
    /// Refused by the broker (invalid size, not enough position to sell).
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Margin
                | OrderStatus::Rejected
        )
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            (Submitted, Accepted | Margin | Rejected | Cancelled) => true,
            (Accepted, Completed | Margin | Rejected | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Submitted => "Submitted",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Margin => "Margin",
            OrderStatus::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}

/// What actually happened when an order filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub size: f64,
    /// Opening legs report `price * size`; closing legs report the cost basis
    /// `avg_price * size` of the position they reduce.
    pub value: f64,
    pub commission: f64,
}

/// A single market order for the feed's instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    /// Requested size, always positive.
    pub size: f64,
    pub status: OrderStatus,
    pub created_bar: usize,
    pub executed: Option<ExecutionInfo>,
}

impl Order {
    pub fn new(id: OrderId, side: OrderSide, size: f64, created_bar: usize) -> Self {
        Self {
            id,
            side,
            size,
            status: OrderStatus::Submitted,
            created_bar,
            executed: None,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    /// Still waiting on the broker (Submitted or Accepted).
    pub fn is_alive(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Audit trail entry for an order state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub order_id: OrderId,
    pub bar_index: usize,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
}
