//! Barlab Core: a minimal, deterministic, event-driven backtest engine.
//!
//! This crate contains:
//! - Domain types (bars, orders, positions, trades)
//! - A forward-only bar feed with look-back access and a CSV loader
//! - A simulated broker with proportional commission and margin checks
//! - The order lifecycle state machine with an audit trail
//! - The strategy runtime: callbacks, signal rules, sizers and journals
//! - The bar-by-bar event loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod sizers;
pub mod strategy;
