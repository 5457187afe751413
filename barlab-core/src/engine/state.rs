//! Mutable engine state and run result types.

use super::broker::Broker;
use super::events::EventQueue;
use super::order_manager::OrderManager;
use crate::domain::{Order, OrderAuditEntry, OrderStatus, Position, Trade};
use crate::strategy::RunSnapshot;
use serde::Serialize;

/// Mutable state that evolves bar-by-bar during the engine loop.
#[derive(Debug)]
pub struct EngineState {
    pub broker: Broker,
    pub orders: OrderManager,
    pub events: EventQueue,
    /// Bars delivered so far.
    pub bars_seen: usize,
}

impl EngineState {
    pub fn new(broker: Broker) -> Self {
        Self {
            broker,
            orders: OrderManager::new(),
            events: EventQueue::new(),
            bars_seen: 0,
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            bars: self.bars_seen,
            cash: self.broker.cash(),
            value: self.broker.value(),
            position: *self.broker.position(),
        }
    }

    /// Verify the accounting identity: value == cash + position marked at `close`.
    ///
    /// Returns the current value. Panics in debug builds if the identity breaks.
    pub fn verify_value(&self, close: f64) -> f64 {
        let value = self.broker.value();

        #[cfg(debug_assertions)]
        {
            let expected = self.broker.cash() + self.broker.position().market_value(close);
            assert!(
                (value - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "value accounting violated: value={value}, cash={} + position={} = {expected}",
                self.broker.cash(),
                self.broker.position().market_value(close),
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = close;

        value
    }
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub strategy: String,
    pub starting_value: f64,
    pub final_value: f64,
    pub final_cash: f64,
    /// Position left open when the data ran out.
    pub position: Position,
    /// Trade still open when the data ran out.
    pub open_trade: Option<Trade>,
    /// Portfolio value at each bar close.
    pub equity_curve: Vec<f64>,
    /// Every order of the run, in creation order, in its final state.
    pub orders: Vec<Order>,
    /// Closed trades, in closing order.
    pub trades: Vec<Trade>,
    pub audit_trail: Vec<OrderAuditEntry>,
    pub bar_count: usize,
}

impl RunResult {
    pub fn net_profit(&self) -> f64 {
        self.final_value - self.starting_value
    }

    /// Commission paid across all executed orders.
    pub fn total_commission(&self) -> f64 {
        self.orders
            .iter()
            .filter_map(|o| o.executed.as_ref())
            .map(|e| e.commission)
            .sum()
    }

    pub fn count_status(&self, status: OrderStatus) -> usize {
        self.orders.iter().filter(|o| o.status == status).count()
    }

    pub fn winners(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }
}
