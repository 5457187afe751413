//! Buy after a run of falling closes, sell after a fixed holding period.

use super::rule::{Holding, Signal, SignalRule};
use crate::data::History;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// When flat, buy once the close has fallen `streak` bars in a row
/// (`close[0] < close[1] < ... < close[streak]`). When holding, sell once the
/// position has been held for `hold_bars` bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecliningCloses {
    pub streak: usize,
    pub hold_bars: usize,
}

impl Default for DecliningCloses {
    fn default() -> Self {
        Self {
            streak: 2,
            hold_bars: 5,
        }
    }
}

impl DecliningCloses {
    pub fn new(streak: usize, hold_bars: usize) -> Result<Self, ConfigError> {
        if streak == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "streak",
                reason: "needs at least one falling close".into(),
            });
        }
        Ok(Self { streak, hold_bars })
    }

    /// Bars of history needed before an entry can fire.
    pub fn lookback(&self) -> usize {
        self.streak + 1
    }

    fn falling(&self, history: &History<'_>) -> bool {
        (0..self.streak).all(|k| match (history.close(k), history.close(k + 1)) {
            (Ok(now), Ok(before)) => now < before,
            _ => false,
        })
    }
}

impl SignalRule for DecliningCloses {
    fn evaluate(&self, history: &History<'_>, holding: Option<Holding>) -> Signal {
        match holding {
            None if self.falling(history) => Signal::Buy,
            None => Signal::Hold,
            Some(h) if h.bars_held >= self.hold_bars => Signal::Sell,
            Some(_) => Signal::Hold,
        }
    }

    fn name(&self) -> &str {
        "declining_closes"
    }
}
