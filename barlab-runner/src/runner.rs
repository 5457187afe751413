//! Backtest runner: wires config, data, strategy and engine together.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the configured CSV, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. Used by sweeps and tests.

use barlab_core::data::{load_csv, BarFeed};
use barlab_core::domain::Bar;
use barlab_core::engine::{run_backtest, RunResult};
use barlab_core::error::BacktestError;
use barlab_core::strategy::{Journal, RuleStrategy};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::BacktestConfig;
use crate::metrics::PerformanceMetrics;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub metrics: PerformanceMetrics,
    pub run: RunResult,
    pub config: BacktestConfig,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BacktestResult {
    pub fn starting_value(&self) -> f64 {
        self.run.starting_value
    }

    pub fn final_value(&self) -> f64 {
        self.run.final_value
    }
}

/// Run a backtest from a `BacktestConfig`, loading bars from its data path.
pub fn run_single_backtest<J: Journal>(
    config: &BacktestConfig,
    journal: J,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let path = config.data_path()?;
    let bars = load_csv(path, &config.data.csv)?;
    debug!(path = %path.display(), bars = bars.len(), "loaded bar file");
    run_backtest_from_bars(config, bars, journal)
}

/// Run a backtest over pre-loaded bars. The config's date window and
/// ordering options are not applied again.
pub fn run_backtest_from_bars<J: Journal>(
    config: &BacktestConfig,
    bars: Vec<Bar>,
    journal: J,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let start_date = bars.first().map(|b| b.date);
    let end_date = bars.last().map(|b| b.date);

    let feed = BarFeed::new(bars)?;
    let broker = config.build_broker()?;
    let sizer = config.build_sizer()?;
    let mut strategy = RuleStrategy::new(config.build_rule()?, journal);

    let run = run_backtest(feed, broker, &mut strategy, &sizer)?;
    let metrics = PerformanceMetrics::compute(&run.equity_curve, &run.trades, run.starting_value);

    Ok(BacktestResult {
        metrics,
        run,
        config: config.clone(),
        start_date,
        end_date,
    })
}
