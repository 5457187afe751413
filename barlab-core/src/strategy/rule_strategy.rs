//! Strategy driven by a [`SignalRule`], narrating every step to a [`Journal`].

use super::journal::Journal;
use super::rule::{Holding, Signal, SignalRule};
use super::{BarStamp, Strategy, StrategyContext};
use crate::domain::{Order, OrderId, OrderStatus, Trade};
use crate::error::{OrderError, StrategyError};

/// Runs a signal rule with at most one order in flight.
///
/// Entry orders go through the configured sizer; exits flatten the whole
/// position. While an order is pending no new signal is evaluated.
pub struct RuleStrategy<R, J> {
    rule: R,
    journal: J,
    pending: Option<OrderId>,
    /// Bar index of the latest fill; holding time is counted from here.
    entry_bar: Option<usize>,
    buy_price: Option<f64>,
    buy_commission: Option<f64>,
}

impl<R: SignalRule, J: Journal> RuleStrategy<R, J> {
    pub fn new(rule: R, journal: J) -> Self {
        Self {
            rule,
            journal,
            pending: None,
            entry_bar: None,
            buy_price: None,
            buy_commission: None,
        }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// The order currently in flight, if any.
    pub fn pending(&self) -> Option<OrderId> {
        self.pending
    }

    /// Fill price of the most recent buy.
    pub fn buy_price(&self) -> Option<f64> {
        self.buy_price
    }

    pub fn buy_commission(&self) -> Option<f64> {
        self.buy_commission
    }

    fn claim(&mut self, id: OrderId) -> Result<(), OrderError> {
        if let Some(pending) = self.pending {
            return Err(OrderError::AlreadyPending(pending));
        }
        self.pending = Some(id);
        Ok(())
    }
}

impl<R: SignalRule, J: Journal> Strategy for RuleStrategy<R, J> {
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        let (date, close) = (ctx.bar().date, ctx.bar().close);
        self.journal.record(date, &format!("Close, {close:.2}"));

        if self.pending.is_some() {
            return Ok(());
        }

        let flat = ctx.position().is_flat();
        let holding = match (flat, self.entry_bar) {
            (true, _) => None,
            (false, Some(entry)) => Some(Holding::since(entry, ctx.bar_index())),
            // Position without a recorded fill: nothing this rule can reason about.
            (false, None) => return Ok(()),
        };

        let signal = self.rule.evaluate(&ctx.history(), holding);
        match signal {
            Signal::Buy if flat => {
                self.journal.record(date, &format!("BUY CREATE, {close:.2}"));
                let id = ctx.buy();
                self.claim(id)?;
            }
            Signal::Sell if !flat => {
                self.journal.record(date, &format!("SELL CREATE, {close:.2}"));
                if let Some(id) = ctx.close_position() {
                    self.claim(id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_order(&mut self, order: &Order, stamp: &BarStamp) {
        match order.status {
            OrderStatus::Submitted | OrderStatus::Accepted => return,
            OrderStatus::Completed => {
                if let Some(exec) = &order.executed {
                    self.journal.record(
                        stamp.date,
                        &format!(
                            "{} EXECUTED: price {:.2}, cost {:.2}, commission {:.2}",
                            order.side, exec.price, exec.value, exec.commission
                        ),
                    );
                    if order.is_buy() {
                        self.buy_price = Some(exec.price);
                        self.buy_commission = Some(exec.commission);
                    }
                    self.entry_bar = Some(exec.bar_index);
                }
            }
            OrderStatus::Cancelled | OrderStatus::Margin | OrderStatus::Rejected => {
                self.journal
                    .record(stamp.date, "Order Canceled/Margin/Rejected");
            }
        }

        if self.pending == Some(order.id) {
            self.pending = None;
        }
    }

    fn on_trade(&mut self, trade: &Trade, stamp: &BarStamp) {
        if !trade.is_closed() {
            return;
        }
        self.journal.record(
            stamp.date,
            &format!(
                "OPERATION PROFIT, GROSS {:.2}, NET {:.2}",
                trade.pnl, trade.pnlcomm
            ),
        );
    }
}
