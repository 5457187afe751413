//! Signal rules: pure decision functions over the bar history.

use crate::data::History;
use serde::{Deserialize, Serialize};

/// What a rule wants to do on the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// The open position as a rule sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    /// Bar index the entry filled on.
    pub entry_bar: usize,
    /// Bars elapsed since the entry fill (0 on the fill bar).
    pub bars_held: usize,
}

impl Holding {
    pub fn since(entry_bar: usize, bar_index: usize) -> Self {
        Self {
            entry_bar,
            bars_held: bar_index.saturating_sub(entry_bar),
        }
    }
}

/// A trading rule.
///
/// Rules are stateless and side-effect free, so they can be unit-tested
/// without the event loop and shared across sweep threads. Too little history
/// for a decision must yield `Signal::Hold`.
pub trait SignalRule: Send + Sync {
    fn evaluate(&self, history: &History<'_>, holding: Option<Holding>) -> Signal;

    /// Rule name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_counts_from_entry_bar() {
        let holding = Holding::since(3, 8);
        assert_eq!(holding.entry_bar, 3);
        assert_eq!(holding.bars_held, 5);
        assert_eq!(Holding::since(3, 3).bars_held, 0);
    }
}
