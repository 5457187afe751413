//! The order lifecycle state machine.
//!
//! The manager is the central registry for every order of a run. It:
//! - issues order IDs (never reused, so an order cannot be resubmitted)
//! - enforces the lifecycle: Submitted → Accepted → Completed / Cancelled / Margin / Rejected
//! - refuses any mutation once an order is terminal
//! - records an audit entry and queues a notification for every transition
//!
//! The manager does NOT decide prices or check cash; that is the broker's job.
//! It tracks order state only.

use super::events::EventQueue;
use crate::domain::{ExecutionInfo, IdGen, Order, OrderAuditEntry, OrderId, OrderSide, OrderStatus};
use crate::error::OrderError;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct OrderManager {
    /// Every order of the run, keyed (and therefore iterated) by ID.
    orders: BTreeMap<OrderId, Order>,
    id_gen: IdGen,
    /// Orders created since the broker last looked.
    fresh: Vec<OrderId>,
    /// Cancel requests issued by the strategy during the current bar.
    cancel_requests: Vec<OrderId>,
    audit_trail: Vec<OrderAuditEntry>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Creation ───────────────────────────────────────────────────────

    /// Create a new order in `Submitted` state and queue its notification.
    pub fn create(
        &mut self,
        side: OrderSide,
        size: f64,
        bar_index: usize,
        events: &mut EventQueue,
    ) -> OrderId {
        let id = self.id_gen.next_order_id();
        let order = Order::new(id, side, size, bar_index);
        events.push_order(&order);
        self.orders.insert(id, order);
        self.fresh.push(id);
        id
    }

    /// Hand over the orders created since the last call, oldest first.
    pub fn take_fresh(&mut self) -> Vec<OrderId> {
        std::mem::take(&mut self.fresh)
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Move an order to `to`, validating the lifecycle.
    pub fn transition(
        &mut self,
        id: OrderId,
        to: OrderStatus,
        bar_index: usize,
        events: &mut EventQueue,
    ) -> Result<&Order, OrderError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(OrderError::UnknownOrder(id))?;

        let from = order.status;
        if from.is_terminal() {
            return Err(OrderError::Terminal { id, status: from });
        }
        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { id, from, to });
        }

        order.status = to;
        events.push_order(order);
        self.audit_trail.push(OrderAuditEntry {
            order_id: id,
            bar_index,
            from_status: from,
            to_status: to,
        });
        Ok(order)
    }

    /// Record the execution of an order and mark it `Completed`.
    pub fn complete(
        &mut self,
        id: OrderId,
        execution: ExecutionInfo,
        events: &mut EventQueue,
    ) -> Result<&Order, OrderError> {
        let bar_index = execution.bar_index;
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(OrderError::UnknownOrder(id))?;
        if order.status != OrderStatus::Accepted {
            return Err(if order.status.is_terminal() {
                OrderError::Terminal {
                    id,
                    status: order.status,
                }
            } else {
                OrderError::InvalidTransition {
                    id,
                    from: order.status,
                    to: OrderStatus::Completed,
                }
            });
        }
        order.executed = Some(execution);
        self.transition(id, OrderStatus::Completed, bar_index, events)
    }

    // ── Cancellation ───────────────────────────────────────────────────

    /// Ask for an order to be cancelled. Applied by the event loop after
    /// the current `on_bar` returns.
    pub fn request_cancel(&mut self, id: OrderId) -> Result<(), OrderError> {
        let order = self.orders.get(&id).ok_or(OrderError::UnknownOrder(id))?;
        if order.status.is_terminal() {
            return Err(OrderError::Terminal {
                id,
                status: order.status,
            });
        }
        if !self.cancel_requests.contains(&id) {
            self.cancel_requests.push(id);
        }
        Ok(())
    }

    pub fn take_cancel_requests(&mut self) -> Vec<OrderId> {
        std::mem::take(&mut self.cancel_requests)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Orders that have not reached a terminal state.
    pub fn alive(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_alive())
    }

    /// All orders, in creation order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        &self.audit_trail
    }

    /// Consume the manager, returning orders (creation order) and the audit trail.
    pub fn into_parts(self) -> (Vec<Order>, Vec<OrderAuditEntry>) {
        (self.orders.into_values().collect(), self.audit_trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::Notification;
    use chrono::NaiveDate;

    fn execution(bar_index: usize) -> ExecutionInfo {
        ExecutionInfo {
            bar_index,
            date: NaiveDate::from_ymd_opt(2000, 1, 3).unwrap(),
            price: 10.0,
            size: 1.0,
            value: 10.0,
            commission: 0.1,
        }
    }

    fn statuses(events: &mut EventQueue) -> Vec<OrderStatus> {
        events
            .drain()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Order(o) => Some(o.status),
                Notification::Trade(_) => None,
            })
            .collect()
    }

    #[test]
    fn create_assigns_fresh_ids_and_notifies() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let a = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        let b = manager.create(OrderSide::Sell, 1.0, 0, &mut events);
        assert_ne!(a, b);
        assert_eq!(manager.take_fresh(), vec![a, b]);
        assert!(manager.take_fresh().is_empty());
        assert_eq!(
            statuses(&mut events),
            vec![OrderStatus::Submitted, OrderStatus::Submitted]
        );
    }

    #[test]
    fn happy_path_to_completed() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let id = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        manager
            .transition(id, OrderStatus::Accepted, 0, &mut events)
            .unwrap();
        let order = manager.complete(id, execution(1), &mut events).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.executed.as_ref().unwrap().bar_index, 1);

        assert_eq!(
            statuses(&mut events),
            vec![
                OrderStatus::Submitted,
                OrderStatus::Accepted,
                OrderStatus::Completed
            ]
        );
        assert_eq!(manager.audit_trail().len(), 2);
    }

    #[test]
    fn terminal_orders_cannot_change() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let id = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        manager
            .transition(id, OrderStatus::Margin, 0, &mut events)
            .unwrap();
        events.drain();

        let err = manager
            .transition(id, OrderStatus::Accepted, 1, &mut events)
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::Terminal {
                id,
                status: OrderStatus::Margin
            }
        );
        assert!(manager.complete(id, execution(1), &mut events).is_err());
        assert!(manager.request_cancel(id).is_err());
        // No notification follows a terminal one.
        assert!(events.is_empty());
    }

    #[test]
    fn completion_requires_acceptance() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let id = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        assert!(matches!(
            manager.complete(id, execution(0), &mut events),
            Err(OrderError::InvalidTransition { .. })
        ));
        assert!(manager.get(id).unwrap().executed.is_none());
    }

    #[test]
    fn unknown_order_is_reported() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        assert_eq!(
            manager
                .transition(OrderId(99), OrderStatus::Accepted, 0, &mut events)
                .unwrap_err(),
            OrderError::UnknownOrder(OrderId(99))
        );
        assert_eq!(
            manager.request_cancel(OrderId(99)).unwrap_err(),
            OrderError::UnknownOrder(OrderId(99))
        );
    }

    #[test]
    fn cancel_requests_are_deduplicated() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let id = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        manager.request_cancel(id).unwrap();
        manager.request_cancel(id).unwrap();
        assert_eq!(manager.take_cancel_requests(), vec![id]);
        assert!(manager.take_cancel_requests().is_empty());
    }

    #[test]
    fn alive_excludes_terminal_orders() {
        let mut events = EventQueue::new();
        let mut manager = OrderManager::new();
        let a = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        let b = manager.create(OrderSide::Buy, 1.0, 0, &mut events);
        manager
            .transition(a, OrderStatus::Rejected, 0, &mut events)
            .unwrap();
        let alive: Vec<_> = manager.alive().map(|o| o.id).collect();
        assert_eq!(alive, vec![b]);
        assert_eq!(manager.len(), 2);
    }
}
