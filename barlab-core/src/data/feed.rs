//! Forward-only delivery of bars with look-back access.
//!
//! The feed owns the full bar vector (pre-loaded) and a cursor. Bars before
//! and at the cursor have been delivered; bars after it are invisible, so a
//! strategy can never peek at the future.

use crate::domain::Bar;
use crate::error::FeedError;
use chrono::NaiveDate;

/// Ordered, finite, forward-only sequence of bars for one instrument.
#[derive(Debug, Clone)]
pub struct BarFeed {
    bars: Vec<Bar>,
    /// Number of bars delivered so far. The current bar is `bars[delivered - 1]`.
    delivered: usize,
}

impl BarFeed {
    /// Build a feed from pre-loaded bars. Dates must be strictly increasing.
    pub fn new(bars: Vec<Bar>) -> Result<Self, FeedError> {
        if bars.is_empty() {
            return Err(FeedError::Empty);
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(FeedError::OutOfOrder {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self { bars, delivered: 0 })
    }

    /// Advance to the next bar. Returns `None` once the feed is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Bar> {
        if self.delivered >= self.bars.len() {
            return None;
        }
        self.delivered += 1;
        self.bars.get(self.delivered - 1)
    }

    /// The bar `offset` steps before the current one (0 = current).
    pub fn historical(&self, offset: usize) -> Result<&Bar, FeedError> {
        self.history().bar(offset)
    }

    /// Read-only view over the delivered bars.
    pub fn history(&self) -> History<'_> {
        History::new(&self.bars[..self.delivered])
    }

    /// The current bar, if any has been delivered.
    pub fn current(&self) -> Option<&Bar> {
        self.delivered.checked_sub(1).and_then(|i| self.bars.get(i))
    }

    /// Index of the current bar.
    pub fn bar_index(&self) -> Option<usize> {
        self.delivered.checked_sub(1)
    }

    /// Number of bars delivered so far.
    pub fn len(&self) -> usize {
        self.delivered
    }

    pub fn is_empty(&self) -> bool {
        self.delivered == 0
    }

    /// Total number of bars in the feed.
    pub fn total(&self) -> usize {
        self.bars.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.delivered >= self.bars.len()
    }
}

/// Look-back view over delivered bars. Offsets count backwards from the
/// newest bar: `close(0)` is the current close, `close(1)` the previous one.
#[derive(Debug, Clone, Copy)]
pub struct History<'a> {
    bars: &'a [Bar],
}

impl<'a> History<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether `offset` steps back is addressable.
    pub fn has(&self, offset: usize) -> bool {
        offset < self.bars.len()
    }

    pub fn bar(&self, offset: usize) -> Result<&'a Bar, FeedError> {
        let available = self.bars.len();
        if offset >= available {
            return Err(FeedError::OutOfRange { offset, available });
        }
        Ok(&self.bars[available - 1 - offset])
    }

    pub fn open(&self, offset: usize) -> Result<f64, FeedError> {
        self.bar(offset).map(|b| b.open)
    }

    pub fn high(&self, offset: usize) -> Result<f64, FeedError> {
        self.bar(offset).map(|b| b.high)
    }

    pub fn low(&self, offset: usize) -> Result<f64, FeedError> {
        self.bar(offset).map(|b| b.low)
    }

    pub fn close(&self, offset: usize) -> Result<f64, FeedError> {
        self.bar(offset).map(|b| b.close)
    }

    pub fn volume(&self, offset: usize) -> Result<f64, FeedError> {
        self.bar(offset).map(|b| b.volume)
    }

    pub fn date(&self, offset: usize) -> Result<NaiveDate, FeedError> {
        self.bar(offset).map(|b| b.date)
    }
}
