//! Bar-by-bar event loop, the heart of the backtesting engine.
//!
//! Per bar, with the bar index passed explicitly to every call:
//! 1. Advance the feed
//! 2. Fill orders scheduled for this bar at its open
//! 3. Mark the broker to the close
//! 4. Deliver queued notifications to the strategy
//! 5. `on_bar`
//! 6. Apply cancel requests, then hand new orders to the broker
//! 7. Record the bar's portfolio value
//!
//! When the feed runs dry, still-scheduled orders are cancelled and the queue
//! is drained one last time before `on_stop`.

use super::broker::Broker;
use super::events::{EventQueue, Notification};
use super::state::{EngineState, RunResult};
use crate::data::BarFeed;
use crate::error::BacktestError;
use crate::sizers::Sizer;
use crate::strategy::{BarStamp, Strategy, StrategyContext};
use tracing::{debug, info};

/// Run a backtest over `feed`.
///
/// The broker must have cash and commission configured; its configuration is
/// frozen for the run. Returns on the first strategy error.
pub fn run_backtest(
    mut feed: BarFeed,
    mut broker: Broker,
    strategy: &mut dyn Strategy,
    sizer: &dyn Sizer,
) -> Result<RunResult, BacktestError> {
    broker.start()?;
    let mut state = EngineState::new(broker);
    let starting_value = state.broker.value();
    let name = strategy.name().to_string();

    info!(
        strategy = %name,
        bars = feed.total(),
        cash = starting_value,
        commission = state.broker.commission_rate(),
        fill_policy = ?state.broker.fill_policy(),
        sizer = sizer.name(),
        "backtest started"
    );
    strategy.on_start(&state.snapshot());

    let mut equity_curve = Vec::with_capacity(feed.total());
    let mut last_stamp = None;

    while let Some(bar) = feed.next().cloned() {
        let t = state.bars_seen;
        state.bars_seen += 1;
        let stamp = BarStamp {
            index: t,
            date: bar.date,
        };
        last_stamp = Some(stamp);

        // ─── Fills at the open ───
        state
            .broker
            .execute_scheduled(&bar, t, &mut state.orders, &mut state.events)?;

        // ─── Mark to close ───
        state.broker.mark(bar.close);

        // ─── Notifications ───
        dispatch(strategy, &mut state.events, &stamp);

        // ─── Strategy ───
        {
            let mut ctx = StrategyContext::new(
                t,
                &bar,
                &feed,
                &state.broker,
                &mut state.orders,
                &mut state.events,
                sizer,
            );
            strategy
                .on_bar(&mut ctx)
                .map_err(|source| BacktestError::Strategy {
                    name: name.clone(),
                    bar_index: t,
                    source,
                })?;
        }

        // ─── Order intake ───
        for id in state.orders.take_cancel_requests() {
            state
                .broker
                .cancel(id, t, &mut state.orders, &mut state.events)?;
        }
        for id in state.orders.take_fresh() {
            let alive = state.orders.get(id).is_some_and(|o| o.is_alive());
            if alive {
                state
                    .broker
                    .accept(id, &bar, t, &mut state.orders, &mut state.events)?;
            }
        }

        equity_curve.push(state.verify_value(bar.close));
    }

    if let Some(stamp) = last_stamp {
        let leftover = state.broker.scheduled().len();
        if leftover > 0 {
            debug!(orders = leftover, "cancelling orders left at end of data");
        }
        state
            .broker
            .cancel_scheduled(stamp.index, &mut state.orders, &mut state.events)?;
        dispatch(strategy, &mut state.events, &stamp);
    }
    strategy.on_stop(&state.snapshot());

    let EngineState {
        broker,
        orders,
        bars_seen,
        ..
    } = state;
    let (orders, audit_trail) = orders.into_parts();
    let result = RunResult {
        strategy: name,
        starting_value,
        final_value: broker.value(),
        final_cash: broker.cash(),
        position: *broker.position(),
        open_trade: broker.open_trade().cloned(),
        equity_curve,
        orders,
        trades: broker.closed_trades().to_vec(),
        audit_trail,
        bar_count: bars_seen,
    };

    info!(
        strategy = %result.strategy,
        bars = result.bar_count,
        orders = result.orders.len(),
        trades = result.trades.len(),
        final_value = result.final_value,
        "backtest finished"
    );
    Ok(result)
}

/// Deliver every queued notification, oldest first.
fn dispatch(strategy: &mut dyn Strategy, events: &mut EventQueue, stamp: &BarStamp) {
    for notification in events.drain() {
        match notification {
            Notification::Order(order) => strategy.on_order(&order, stamp),
            Notification::Trade(trade) => strategy.on_trade(&trade, stamp),
        }
    }
}
