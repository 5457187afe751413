//! Position sizers: how many units an order without an explicit size trades.
//!
//! Sizers are portfolio-aware (they see the equity) but signal-agnostic: they
//! never decide whether to trade, only how much.

pub mod fixed;

pub use fixed::FixedSizer;

use crate::domain::{Bar, OrderSide};

/// Position sizing logic.
///
/// # Responsibilities
/// - Convert equity + side + the current bar into an order size
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the signal rule's job)
/// - Sizers do NOT check affordability (the broker does, via `Margin`)
pub trait Sizer: Send + Sync {
    /// Units to trade. Returns 0.0 when nothing sensible can be traded; the
    /// broker rejects zero-size orders.
    fn size(&self, equity: f64, side: OrderSide, bar: &Bar) -> f64;

    /// Sizer name for logging.
    fn name(&self) -> &str;
}
