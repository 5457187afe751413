//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Commission is always rate × price × size
//! 2. Unaffordable buys end in Margin with cash and position untouched
//! 3. A buy/sell round trip closes exactly one trade with the expected pnl
//! 4. Every fill lowers cash + position value by exactly its commission
//! 5. Any run leaves every order terminal with one terminal notification

use barlab_core::data::BarFeed;
use barlab_core::domain::{Bar, OrderSide, OrderStatus};
use barlab_core::engine::{
    run_backtest, Broker, CommissionModel, EventQueue, Notification, OrderManager,
};
use barlab_core::sizers::FixedSizer;
use barlab_core::strategy::{DecliningCloses, NullJournal, RuleStrategy};
use chrono::NaiveDate;
use proptest::prelude::*;

fn bar(index: usize, open: f64, close: f64) -> Bar {
    let date = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap() + chrono::Duration::days(index as i64);
    Bar::new(date, open, open.max(close), open.min(close), close, 1000.0)
}

/// Broker, order manager and queue wired together outside the event loop.
struct Desk {
    broker: Broker,
    orders: OrderManager,
    events: EventQueue,
}

impl Desk {
    fn new(cash: f64, rate: f64) -> Self {
        let mut broker = Broker::with_cash(cash, rate).unwrap();
        broker.start().unwrap();
        Self {
            broker,
            orders: OrderManager::new(),
            events: EventQueue::new(),
        }
    }

    fn submit(&mut self, side: OrderSide, size: f64, at: &Bar, index: usize) -> OrderStatus {
        let id = self.orders.create(side, size, index, &mut self.events);
        self.broker
            .accept(id, at, index, &mut self.orders, &mut self.events)
            .unwrap()
    }

    fn fill(&mut self, at: &Bar, index: usize) {
        self.broker
            .execute_scheduled(at, index, &mut self.orders, &mut self.events)
            .unwrap();
    }

    fn book_value(&self, price: f64) -> f64 {
        self.broker.cash() + self.broker.position().market_value(price)
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_size() -> impl Strategy<Value = f64> {
    (1u32..200).prop_map(f64::from)
}

fn arb_rate() -> impl Strategy<Value = f64> {
    0.0..0.02_f64
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..60)
}

// ── 1. Commission formula ────────────────────────────────────────────

proptest! {
    #[test]
    fn commission_is_proportional(rate in arb_rate(), price in arb_price(), size in arb_size()) {
        let model = CommissionModel::new(rate).unwrap();
        let expected = rate * price * size;
        prop_assert!((model.commission(price, size) - expected).abs() <= 1e-12 * expected.max(1.0));
        prop_assert!(model.commission(price, size) >= 0.0);
    }
}

// ── 2. Margin has no side effects ────────────────────────────────────

proptest! {
    #[test]
    fn unaffordable_buy_is_margin(price in arb_price(), size in arb_size(), rate in arb_rate()) {
        let cost = price * size * (1.0 + rate);
        let cash = cost * 0.5;
        let mut desk = Desk::new(cash, rate);
        let status = desk.submit(OrderSide::Buy, size, &bar(0, price, price), 0);
        prop_assert_eq!(status, OrderStatus::Margin);
        prop_assert_eq!(desk.broker.cash(), cash);
        prop_assert!(desk.broker.position().is_flat());
        prop_assert!(desk.broker.scheduled().is_empty());
    }
}

// ── 3. Round trip ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn round_trip_pnl(
        buy in arb_price(),
        sell in arb_price(),
        size in arb_size(),
        rate in arb_rate(),
    ) {
        let mut desk = Desk::new(1e9, rate);
        desk.submit(OrderSide::Buy, size, &bar(0, buy, buy), 0);
        desk.fill(&bar(1, buy, buy), 1);
        desk.submit(OrderSide::Sell, size, &bar(1, buy, buy), 1);
        desk.fill(&bar(2, sell, sell), 2);

        let trades = desk.broker.closed_trades();
        prop_assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        let pnl = (sell - buy) * size;
        let commissions = rate * buy * size + rate * sell * size;
        let tol = 1e-9 * (buy + sell) * size;
        prop_assert!((trade.pnl - pnl).abs() <= tol);
        prop_assert!((trade.pnlcomm - (pnl - commissions)).abs() <= tol);
        prop_assert!(desk.broker.position().is_flat());
    }
}

// ── 4. Cash conservation ─────────────────────────────────────────────

proptest! {
    #[test]
    fn fills_cost_exactly_the_commission(
        prices in prop::collection::vec(arb_price(), 2..20),
        rate in arb_rate(),
    ) {
        let mut desk = Desk::new(1e6, rate);
        for (i, window) in prices.windows(2).enumerate() {
            let (now, next) = (window[0], window[1]);
            let side = if i % 2 == 0 { OrderSide::Buy } else { OrderSide::Sell };
            desk.submit(side, 3.0, &bar(i, now, now), i);

            let before = desk.book_value(next);
            desk.fill(&bar(i + 1, next, next), i + 1);
            let after = desk.book_value(next);
            let commission = rate * next * 3.0;
            prop_assert!((before - after - commission).abs() <= 1e-6);
        }
    }
}

// ── 5. Lifecycle over whole runs ─────────────────────────────────────

proptest! {
    #[test]
    fn runs_leave_every_order_terminal(closes in arb_closes(), hold in 0usize..8) {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c))
            .collect();
        let mut strategy = RuleStrategy::new(DecliningCloses::new(2, hold).unwrap(), NullJournal);
        let result = run_backtest(
            BarFeed::new(bars).unwrap(),
            Broker::with_cash(1000.0, 0.001).unwrap(),
            &mut strategy,
            &FixedSizer::default(),
        )
        .unwrap();

        prop_assert!(result.orders.iter().all(|o| o.status.is_terminal()));
        prop_assert_eq!(result.equity_curve.len(), closes.len());
        prop_assert!(result.final_cash >= 0.0);

        // Value identity at the last close.
        let last = *closes.last().unwrap();
        let expected = result.final_cash + result.position.market_value(last);
        prop_assert!((result.final_value - expected).abs() <= 1e-9 * expected.abs().max(1.0));

        // Terminal transitions in the audit trail: one per order.
        let terminal = result
            .audit_trail
            .iter()
            .filter(|e| e.to_status.is_terminal())
            .count();
        prop_assert_eq!(terminal, result.orders.len());
    }
}

#[test]
fn event_queue_is_empty_after_a_drain() {
    let mut desk = Desk::new(100.0, 0.0);
    desk.submit(OrderSide::Buy, 1.0, &bar(0, 10.0, 10.0), 0);
    let drained = desk.events.drain();
    assert!(matches!(drained[0], Notification::Order(_)));
    assert!(desk.events.is_empty());
}
