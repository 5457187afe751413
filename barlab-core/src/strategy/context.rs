//! The strategy's window onto the running engine.

use crate::data::{BarFeed, History};
use crate::domain::{Bar, Order, OrderId, OrderSide, Position};
use crate::engine::{Broker, EventQueue, OrderManager};
use crate::error::{FeedError, OrderError};
use crate::sizers::Sizer;

/// Borrowed view of the engine for the duration of one `on_bar` call.
///
/// Reads go straight to the feed and broker. Orders are created immediately
/// (and show up as `Submitted` on the next bar), but the broker only sees them
/// after `on_bar` returns. Cancellation requests are applied at the same point.
pub struct StrategyContext<'a> {
    bar_index: usize,
    bar: &'a Bar,
    feed: &'a BarFeed,
    broker: &'a Broker,
    orders: &'a mut OrderManager,
    events: &'a mut EventQueue,
    sizer: &'a dyn Sizer,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(
        bar_index: usize,
        bar: &'a Bar,
        feed: &'a BarFeed,
        broker: &'a Broker,
        orders: &'a mut OrderManager,
        events: &'a mut EventQueue,
        sizer: &'a dyn Sizer,
    ) -> Self {
        Self {
            bar_index,
            bar,
            feed,
            broker,
            orders,
            events,
            sizer,
        }
    }

    // ── Market data ────────────────────────────────────────────────────

    /// Zero-based index of the current bar.
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    /// The current bar. Same as `historical(0)`.
    pub fn bar(&self) -> &Bar {
        self.bar
    }

    /// The bar `offset` steps back; 0 is the current bar.
    pub fn historical(&self, offset: usize) -> Result<&Bar, FeedError> {
        self.feed.historical(offset)
    }

    pub fn history(&self) -> History<'_> {
        self.feed.history()
    }

    // ── Account ────────────────────────────────────────────────────────

    pub fn position(&self) -> &Position {
        self.broker.position()
    }

    pub fn cash(&self) -> f64 {
        self.broker.cash()
    }

    /// Portfolio value marked at the current close.
    pub fn value(&self) -> f64 {
        self.broker.value()
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Market buy sized by the configured sizer.
    pub fn buy(&mut self) -> OrderId {
        let size = self.sized(OrderSide::Buy);
        self.buy_size(size)
    }

    /// Market sell sized by the configured sizer.
    pub fn sell(&mut self) -> OrderId {
        let size = self.sized(OrderSide::Sell);
        self.sell_size(size)
    }

    pub fn buy_size(&mut self, size: f64) -> OrderId {
        self.submit(OrderSide::Buy, size)
    }

    pub fn sell_size(&mut self, size: f64) -> OrderId {
        self.submit(OrderSide::Sell, size)
    }

    /// Flatten the position with a single opposite order. `None` when flat.
    pub fn close_position(&mut self) -> Option<OrderId> {
        let held = self.broker.position().size;
        if self.broker.position().is_flat() {
            return None;
        }
        let side = if held > 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        Some(self.submit(side, held.abs()))
    }

    /// Ask for a pending order to be cancelled once `on_bar` returns.
    pub fn cancel(&mut self, id: OrderId) -> Result<(), OrderError> {
        self.orders.request_cancel(id)
    }

    /// Orders that have not reached a terminal state, oldest first.
    pub fn pending_orders(&self) -> Vec<&Order> {
        self.orders.alive().collect()
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    fn sized(&self, side: OrderSide) -> f64 {
        self.sizer.size(self.broker.value(), side, self.bar)
    }

    fn submit(&mut self, side: OrderSide, size: f64) -> OrderId {
        self.orders.create(side, size, self.bar_index, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use crate::sizers::FixedSizer;
    use chrono::NaiveDate;

    fn feed() -> BarFeed {
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let bars = [10.0, 9.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(start + chrono::Duration::days(i as i64), c, c, c, c, 100.0))
            .collect();
        BarFeed::new(bars).unwrap()
    }

    #[test]
    fn reads_and_orders_through_context() {
        let mut feed = feed();
        feed.next();
        feed.next();
        let bar = feed.current().unwrap().clone();
        let mut broker = Broker::with_cash(1000.0, 0.0).unwrap();
        broker.start().unwrap();
        broker.mark(bar.close);
        let mut orders = OrderManager::new();
        let mut events = EventQueue::new();
        let sizer = FixedSizer::stake(3.0).unwrap();

        let mut ctx = StrategyContext::new(1, &bar, &feed, &broker, &mut orders, &mut events, &sizer);
        assert_eq!(ctx.bar_index(), 1);
        assert_eq!(ctx.historical(0).unwrap(), ctx.bar());
        assert_eq!(ctx.historical(1).unwrap().close, 10.0);
        assert!(ctx.historical(2).is_err());
        assert_eq!(ctx.history().len(), 2);
        assert_eq!(ctx.cash(), 1000.0);
        assert_eq!(ctx.value(), 1000.0);

        // Nothing to close while flat.
        assert!(ctx.close_position().is_none());

        let id = ctx.buy();
        assert_eq!(ctx.order(id).unwrap().size, 3.0);
        assert_eq!(ctx.order(id).unwrap().status, OrderStatus::Submitted);
        assert_eq!(ctx.pending_orders().len(), 1);
        ctx.cancel(id).unwrap();

        assert_eq!(orders.take_cancel_requests(), vec![id]);
        assert_eq!(orders.take_fresh(), vec![id]);
        assert_eq!(events.len(), 1);
    }
}
