//! Order and trade notifications waiting for the strategy.
//!
//! The broker and order manager push notifications as state changes; the
//! event loop drains the queue synchronously once per bar, before `on_bar`.
//! There are no re-entrant callbacks: nothing reaches the strategy while the
//! engine is mid-update.

use crate::domain::{Order, Trade};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Snapshot of an order right after a state transition.
    Order(Order),
    /// A trade that has just closed.
    Trade(Trade),
}

/// FIFO of pending notifications.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<Notification>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }

    pub fn push_order(&mut self, order: &Order) {
        self.push(Notification::Order(order.clone()));
    }

    pub fn push_trade(&mut self, trade: &Trade) {
        self.push(Notification::Trade(trade.clone()));
    }

    /// Take every queued notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
