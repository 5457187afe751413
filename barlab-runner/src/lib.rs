//! Barlab Runner: backtest orchestration on top of `barlab-core`.
//!
//! - TOML configuration with validation
//! - Single-backtest runner with performance metrics
//! - Parallel parameter sweeps

pub mod config;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, BrokerConfig, DataConfig, StrategyConfig};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_bars, run_single_backtest, BacktestResult};
pub use sweep::{best_point, run_sweep, SweepPoint};
