use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID. Issued once by the order manager and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trade ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Monotonic ID generator. Each run owns its own generator, so IDs are
/// deterministic for a given bar sequence.
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next_order: u64,
    next_trade: u64,
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(self.next_order)
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        self.next_trade += 1;
        TradeId(self.next_trade)
    }
}
