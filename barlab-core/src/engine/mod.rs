//! Backtesting engine: broker, order lifecycle, notifications and the bar loop.

pub mod broker;
pub mod commission;
pub mod events;
pub mod loop_runner;
pub mod order_manager;
pub mod state;

pub use broker::{Broker, FillPolicy};
pub use commission::CommissionModel;
pub use events::{EventQueue, Notification};
pub use loop_runner::run_backtest;
pub use order_manager::OrderManager;
pub use state::{EngineState, RunResult};
