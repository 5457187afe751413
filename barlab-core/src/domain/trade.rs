//! A trade spans opening a position to returning flat.

use super::ids::TradeId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A round trip. Opened by the broker when the position leaves flat and
/// closed when it returns to flat; reported to the strategy once, on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub side: TradeSide,
    pub status: TradeStatus,

    /// Largest absolute size reached during the span.
    pub size: f64,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit (set on close) ──
    pub exit_bar: Option<usize>,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,

    // ── PnL ──
    /// Gross realized profit.
    pub pnl: f64,
    /// Realized profit net of every commission charged during the span.
    pub pnlcomm: f64,
    pub commission: f64,
}

impl Trade {
    pub fn open(
        id: TradeId,
        side: TradeSide,
        size: f64,
        price: f64,
        bar_index: usize,
        date: NaiveDate,
        commission: f64,
    ) -> Self {
        Self {
            id,
            side,
            status: TradeStatus::Open,
            size,
            entry_bar: bar_index,
            entry_date: date,
            entry_price: price,
            exit_bar: None,
            exit_date: None,
            exit_price: None,
            pnl: 0.0,
            pnlcomm: -commission,
            commission,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Bars between entry and exit fills (0 while open).
    pub fn bars_held(&self) -> usize {
        self.exit_bar
            .map(|exit| exit.saturating_sub(self.entry_bar))
            .unwrap_or(0)
    }

    pub fn is_winner(&self) -> bool {
        self.pnlcomm > 0.0
    }

    /// Record a commission charge against the span.
    pub(crate) fn charge(&mut self, commission: f64) {
        self.commission += commission;
        self.pnlcomm = self.pnl - self.commission;
    }

    /// Record realized gross profit from a reducing fill.
    pub(crate) fn realize(&mut self, pnl: f64) {
        self.pnl += pnl;
        self.pnlcomm = self.pnl - self.commission;
    }

    pub(crate) fn close(&mut self, price: f64, bar_index: usize, date: NaiveDate) {
        self.status = TradeStatus::Closed;
        self.exit_price = Some(price);
        self.exit_bar = Some(bar_index);
        self.exit_date = Some(date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, d).unwrap()
    }

    #[test]
    fn open_trade_charges_entry_commission() {
        let trade = Trade::open(TradeId(1), TradeSide::Long, 10.0, 100.0, 4, date(5), 10.0);
        assert!(trade.is_open());
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(trade.pnlcomm, -10.0);
        assert_eq!(trade.bars_held(), 0);
    }

    #[test]
    fn realize_and_close() {
        let mut trade = Trade::open(TradeId(1), TradeSide::Long, 10.0, 100.0, 4, date(5), 10.0);
        trade.realize(100.0);
        trade.charge(11.0);
        trade.close(110.0, 9, date(12));

        assert!(trade.is_closed());
        assert_eq!(trade.pnl, 100.0);
        assert!((trade.pnlcomm - 79.0).abs() < 1e-10);
        assert_eq!(trade.bars_held(), 5);
        assert!(trade.is_winner());
    }
}
