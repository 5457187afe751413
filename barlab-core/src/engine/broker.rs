//! Simulated broker: cash, commission, the single position and its trade.
//!
//! The broker validates orders when they are submitted, executes accepted
//! orders against bars, and keeps the books:
//!
//! - Buy fill: `cash -= price * size + commission`
//! - Sell fill: `cash += price * size - commission`
//! - `value() == cash + position.size * last close`
//!
//! Across any fill, `cash + position market value` (at the fill price) drops
//! by exactly the commission charged. Rejected, margin and cancelled orders
//! never touch cash or position.

use super::commission::CommissionModel;
use super::events::EventQueue;
use super::order_manager::OrderManager;
use crate::domain::position::FLAT_EPSILON;
use crate::domain::{
    Bar, ExecutionInfo, IdGen, OrderId, OrderSide, OrderStatus, Position, Trade, TradeSide,
};
use crate::error::{ConfigError, OrderError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shortfall tolerated when checking whether cash covers a buy.
const CASH_EPSILON: f64 = 1e-9;

/// When an accepted order is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fill at the open of the bar after submission.
    #[default]
    NextOpen,
    /// Fill at the close of the submission bar.
    CurrentClose,
}

/// Simulated broker for a single instrument.
#[derive(Debug)]
pub struct Broker {
    cash: Option<f64>,
    starting_cash: Option<f64>,
    commission: Option<CommissionModel>,
    allow_short: bool,
    fill_policy: FillPolicy,
    started: bool,

    position: Position,
    open_trade: Option<Trade>,
    closed_trades: Vec<Trade>,
    /// Accepted orders waiting for the next bar's open, oldest first.
    scheduled: Vec<OrderId>,
    last_close: Option<f64>,
    trade_ids: IdGen,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    /// A broker with no cash and no commission configured. Both must be set
    /// before `start()`.
    pub fn new() -> Self {
        Self {
            cash: None,
            starting_cash: None,
            commission: None,
            allow_short: false,
            fill_policy: FillPolicy::NextOpen,
            started: false,
            position: Position::flat(),
            open_trade: None,
            closed_trades: Vec::new(),
            scheduled: Vec::new(),
            last_close: None,
            trade_ids: IdGen::default(),
        }
    }

    /// Shorthand for a configured broker: `new()`, `set_cash`, `set_commission`.
    pub fn with_cash(cash: f64, commission_rate: f64) -> Result<Self, ConfigError> {
        let mut broker = Self::new();
        broker.set_cash(cash)?;
        broker.set_commission(commission_rate)?;
        Ok(broker)
    }

    // ── Configuration (before start) ───────────────────────────────────

    pub fn set_cash(&mut self, amount: f64) -> Result<(), ConfigError> {
        self.ensure_not_started()?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(ConfigError::InvalidCash(amount));
        }
        self.cash = Some(amount);
        self.starting_cash = Some(amount);
        Ok(())
    }

    pub fn set_commission(&mut self, rate: f64) -> Result<(), ConfigError> {
        self.ensure_not_started()?;
        self.commission = Some(CommissionModel::new(rate)?);
        Ok(())
    }

    pub fn set_allow_short(&mut self, allow: bool) -> Result<(), ConfigError> {
        self.ensure_not_started()?;
        self.allow_short = allow;
        Ok(())
    }

    pub fn set_fill_policy(&mut self, policy: FillPolicy) -> Result<(), ConfigError> {
        self.ensure_not_started()?;
        self.fill_policy = policy;
        Ok(())
    }

    fn ensure_not_started(&self) -> Result<(), ConfigError> {
        if self.started {
            return Err(ConfigError::RunStarted);
        }
        Ok(())
    }

    /// Validate configuration and freeze it for the run.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        if self.cash.is_none() {
            return Err(ConfigError::CashNotSet);
        }
        if self.commission.is_none() {
            return Err(ConfigError::CommissionNotSet);
        }
        self.started = true;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// Current cash (0.0 until set).
    pub fn cash(&self) -> f64 {
        self.cash.unwrap_or(0.0)
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash.unwrap_or(0.0)
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission.map(|c| c.rate()).unwrap_or(0.0)
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill_policy
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn open_trade(&self) -> Option<&Trade> {
        self.open_trade.as_ref()
    }

    /// Trades closed so far, in closing order.
    pub fn closed_trades(&self) -> &[Trade] {
        &self.closed_trades
    }

    pub fn scheduled(&self) -> &[OrderId] {
        &self.scheduled
    }

    /// Portfolio value: cash plus the position marked at the last close.
    pub fn value(&self) -> f64 {
        let mark = self.last_close.unwrap_or(self.position.price);
        self.cash() + self.position.market_value(mark)
    }

    /// Mark the position to a bar's close.
    pub fn mark(&mut self, close: f64) {
        self.last_close = Some(close);
    }

    fn commission_model(&self) -> CommissionModel {
        self.commission.unwrap_or_else(CommissionModel::frictionless)
    }

    // ── Order handling ─────────────────────────────────────────────────

    /// Validate a freshly submitted order against the submission bar's close.
    ///
    /// Outcomes: `Margin` when a buy cannot be paid for, `Rejected` for a
    /// non-positive size or a sell exceeding the long position while short
    /// selling is off, otherwise `Accepted`. Accepted orders are either
    /// scheduled for the next bar or, under `CurrentClose`, filled right away.
    pub fn accept(
        &mut self,
        id: OrderId,
        bar: &Bar,
        bar_index: usize,
        orders: &mut OrderManager,
        events: &mut EventQueue,
    ) -> Result<OrderStatus, OrderError> {
        let order = orders.get(id).ok_or(OrderError::UnknownOrder(id))?;
        let (side, size) = (order.side, order.size);

        if let Some(refusal) = self.check(side, size, bar.close) {
            debug!(order = %id, %side, size, status = %refusal, "order refused at submission");
            orders.transition(id, refusal, bar_index, events)?;
            return Ok(refusal);
        }

        orders.transition(id, OrderStatus::Accepted, bar_index, events)?;
        match self.fill_policy {
            FillPolicy::NextOpen => {
                self.scheduled.push(id);
                Ok(OrderStatus::Accepted)
            }
            FillPolicy::CurrentClose => {
                self.execute(id, bar.close, bar.date, bar_index, orders, events)
            }
        }
    }

    /// Execute every order scheduled for this bar at its open, oldest first.
    pub fn execute_scheduled(
        &mut self,
        bar: &Bar,
        bar_index: usize,
        orders: &mut OrderManager,
        events: &mut EventQueue,
    ) -> Result<(), OrderError> {
        for id in std::mem::take(&mut self.scheduled) {
            self.execute(id, bar.open, bar.date, bar_index, orders, events)?;
        }
        Ok(())
    }

    /// Cancel an order that has not executed yet. Cash and position are untouched.
    pub fn cancel(
        &mut self,
        id: OrderId,
        bar_index: usize,
        orders: &mut OrderManager,
        events: &mut EventQueue,
    ) -> Result<(), OrderError> {
        orders.transition(id, OrderStatus::Cancelled, bar_index, events)?;
        self.scheduled.retain(|&s| s != id);
        debug!(order = %id, bar_index, "order cancelled");
        Ok(())
    }

    /// Cancel everything still scheduled (end of data).
    pub fn cancel_scheduled(
        &mut self,
        bar_index: usize,
        orders: &mut OrderManager,
        events: &mut EventQueue,
    ) -> Result<(), OrderError> {
        for id in self.scheduled.clone() {
            self.cancel(id, bar_index, orders, events)?;
        }
        Ok(())
    }

    /// Returns the refusal status for an order, or `None` if it may proceed.
    fn check(&self, side: OrderSide, size: f64, price: f64) -> Option<OrderStatus> {
        if !(size.is_finite() && size > 0.0) {
            return Some(OrderStatus::Rejected);
        }
        match side {
            OrderSide::Buy => {
                let cost = self.commission_model().buy_cost(price, size);
                (cost > self.cash() + CASH_EPSILON).then_some(OrderStatus::Margin)
            }
            OrderSide::Sell => {
                let long = self.position.size.max(0.0);
                (!self.allow_short && size > long + FLAT_EPSILON).then_some(OrderStatus::Rejected)
            }
        }
    }

    fn execute(
        &mut self,
        id: OrderId,
        price: f64,
        date: NaiveDate,
        bar_index: usize,
        orders: &mut OrderManager,
        events: &mut EventQueue,
    ) -> Result<OrderStatus, OrderError> {
        let order = orders.get(id).ok_or(OrderError::UnknownOrder(id))?;
        let (side, size) = (order.side, order.size);

        // Prices move between submission and execution; re-check at the fill price.
        if let Some(refusal) = self.check(side, size, price) {
            debug!(order = %id, %side, size, price, status = %refusal, "order refused at execution");
            orders.transition(id, refusal, bar_index, events)?;
            return Ok(refusal);
        }

        let (value, commission, closed) = self.apply_fill(side, size, price, bar_index, date);
        debug!(
            order = %id,
            %side,
            size,
            price,
            commission,
            cash = self.cash(),
            "order executed"
        );

        orders.complete(
            id,
            ExecutionInfo {
                bar_index,
                date,
                price,
                size,
                value,
                commission,
            },
            events,
        )?;

        // Trade notifications follow the order notification that caused them.
        if let Some(trade) = closed {
            debug!(trade = %trade.id, pnl = trade.pnl, pnlcomm = trade.pnlcomm, "trade closed");
            events.push_trade(&trade);
        }
        Ok(OrderStatus::Completed)
    }

    /// Apply a fill to cash, position and trade. Returns the reported
    /// execution value, the commission charged and the trade it closed, if any.
    fn apply_fill(
        &mut self,
        side: OrderSide,
        size: f64,
        price: f64,
        bar_index: usize,
        date: NaiveDate,
    ) -> (f64, f64, Option<Trade>) {
        let commission = self.commission_model().commission(price, size);
        let direction = side.sign();
        let cash = self.cash() - direction * price * size - commission;
        self.cash = Some(cash);

        let held = self.position.size;
        // Part of the fill that reduces an opposite position.
        let closing = if held.abs() > FLAT_EPSILON && held.signum() != direction {
            size.min(held.abs())
        } else {
            0.0
        };
        let opening = size - closing;

        let mut value = 0.0;
        let mut closed = None;

        if closing > 0.0 {
            let leg_commission = commission * closing / size;
            let pnl = (price - self.position.price) * closing * held.signum();
            value += self.position.price * closing;

            self.position.size = held + direction * closing;
            if let Some(trade) = self.open_trade.as_mut() {
                trade.realize(pnl);
                trade.charge(leg_commission);
            }
            if self.position.size.abs() <= FLAT_EPSILON {
                self.position = Position::flat();
                if let Some(mut trade) = self.open_trade.take() {
                    trade.close(price, bar_index, date);
                    self.closed_trades.push(trade.clone());
                    closed = Some(trade);
                }
            }
        }

        if opening > FLAT_EPSILON {
            let leg_commission = commission * opening / size;
            value += price * opening;

            let held_abs = self.position.size.abs();
            let new_abs = held_abs + opening;
            self.position.price = (self.position.price * held_abs + price * opening) / new_abs;
            self.position.size += direction * opening;

            match self.open_trade.as_mut() {
                Some(trade) => {
                    trade.charge(leg_commission);
                    trade.size = trade.size.max(new_abs);
                }
                None => {
                    let trade_side = match side {
                        OrderSide::Buy => TradeSide::Long,
                        OrderSide::Sell => TradeSide::Short,
                    };
                    self.open_trade = Some(Trade::open(
                        self.trade_ids.next_trade_id(),
                        trade_side,
                        opening,
                        price,
                        bar_index,
                        date,
                        leg_commission,
                    ));
                }
            }
        }

        (value, commission, closed)
    }
}
