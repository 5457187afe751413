//! Parameter sweep over the holding period.
//!
//! Every grid point is an independent run on its own copy of the bars, so the
//! grid fans out over rayon with no shared mutable state.

use barlab_core::domain::Bar;
use barlab_core::error::BacktestError;
use barlab_core::strategy::NullJournal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::BacktestConfig;
use crate::runner::run_backtest_from_bars;

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub hold_bars: usize,
    pub final_value: f64,
    pub net_profit: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub max_drawdown: f64,
}

/// Run one backtest per `hold_bars` value, in parallel.
///
/// Results come back in the order of `hold_bars`. The first failing run
/// aborts the sweep.
pub fn run_sweep(
    base: &BacktestConfig,
    bars: &[Bar],
    hold_bars: &[usize],
) -> Result<Vec<SweepPoint>, BacktestError> {
    info!(points = hold_bars.len(), bars = bars.len(), "sweep started");
    let points = hold_bars
        .par_iter()
        .map(|&hold| {
            let mut config = base.clone();
            config.strategy.hold_bars = hold;
            let result = run_backtest_from_bars(&config, bars.to_vec(), NullJournal)?;
            Ok(SweepPoint {
                hold_bars: hold,
                final_value: result.run.final_value,
                net_profit: result.run.net_profit(),
                trade_count: result.run.trades.len(),
                win_rate: result.metrics.win_rate,
                max_drawdown: result.metrics.max_drawdown,
            })
        })
        .collect::<Result<Vec<_>, BacktestError>>()?;
    info!(points = points.len(), "sweep finished");
    Ok(points)
}

/// The grid point with the highest final value (first wins ties).
pub fn best_point(points: &[SweepPoint]) -> Option<&SweepPoint> {
    points.iter().fold(None, |best: Option<&SweepPoint>, p| match best {
        Some(b) if b.final_value >= p.final_value => Some(b),
        _ => Some(p),
    })
}
