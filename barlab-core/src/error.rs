//! Error taxonomy for a backtest run.
//!
//! `ConfigError` and `FeedError` are fatal and abort a run before or during
//! the bar loop. Insufficient funds is not an error at all: it surfaces as
//! the `Margin` order status. Strategy failures propagate as `StrategyError`.

use crate::domain::{OrderId, OrderStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or missing run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("starting cash was not set before the run")]
    CashNotSet,

    #[error("commission rate was not set before the run")]
    CommissionNotSet,

    #[error("starting cash must be finite and non-negative, got {0}")]
    InvalidCash(f64),

    #[error("commission rate must be finite and non-negative, got {0}")]
    NegativeCommission(f64),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("broker configuration is frozen once the run has started")]
    RunStarted,

    #[error("invalid date window: from {from} is after to {to}")]
    InvalidDateWindow {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    #[error("no data path configured")]
    MissingDataPath,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Malformed, missing or exhausted bar data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("bar dates must be strictly increasing: {previous} followed by {current}")]
    OutOfOrder {
        previous: chrono::NaiveDate,
        current: chrono::NaiveDate,
    },

    #[error("feed contains no bars")]
    Empty,

    #[error("no bar {offset} steps back ({available} bars delivered)")]
    OutOfRange { offset: usize, available: usize },
}

/// Order bookkeeping violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {0} is still pending; a second order cannot be sent")]
    AlreadyPending(OrderId),

    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error("order {id} is terminal ({status}) and cannot change")]
    Terminal { id: OrderId, status: OrderStatus },

    #[error("invalid transition for order {id}: {from} → {to}")]
    InvalidTransition {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Failure raised from inside a strategy callback. Aborts the run.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("{0}")]
    Other(String),
}

/// Top-level error of a backtest run.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("order bookkeeping error: {0}")]
    Order(#[from] OrderError),

    #[error("strategy '{name}' failed at bar {bar_index}: {source}")]
    Strategy {
        name: String,
        bar_index: usize,
        #[source]
        source: StrategyError,
    },
}
