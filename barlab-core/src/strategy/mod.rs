//! Strategy runtime: the callback surface the event loop drives.
//!
//! A strategy sees one bar at a time through a [`StrategyContext`], places
//! orders through it, and hears back about order and trade changes through
//! `on_order`/`on_trade`. Notifications are delivered in a batch at the start
//! of every bar, before `on_bar`.

pub mod context;
pub mod declining_closes;
pub mod journal;
pub mod rule;
pub mod rule_strategy;

pub use context::StrategyContext;
pub use declining_closes::DecliningCloses;
pub use journal::{Journal, MemoryJournal, NullJournal, StdoutJournal};
pub use rule::{Holding, Signal, SignalRule};
pub use rule_strategy::RuleStrategy;

use crate::domain::{Order, Position, Trade};
use crate::error::StrategyError;
use chrono::NaiveDate;

/// The bar a notification is delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarStamp {
    pub index: usize,
    pub date: NaiveDate,
}

/// Account state handed to `on_start` and `on_stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSnapshot {
    /// Bars delivered so far (0 at start).
    pub bars: usize,
    pub cash: f64,
    pub value: f64,
    pub position: Position,
}

/// Event-driven trading strategy.
///
/// Only `name` and `on_bar` are required. Callbacks never run re-entrantly:
/// the engine finishes its own bookkeeping before calling back.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_start(&mut self, _snapshot: &RunSnapshot) {}

    /// Called once per bar. Returning an error aborts the run.
    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError>;

    /// An order changed state.
    fn on_order(&mut self, _order: &Order, _stamp: &BarStamp) {}

    /// A trade closed.
    fn on_trade(&mut self, _trade: &Trade, _stamp: &BarStamp) {}

    fn on_stop(&mut self, _snapshot: &RunSnapshot) {}
}
