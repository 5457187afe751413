//! Domain types for barlab

pub mod bar;
pub mod ids;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use ids::{IdGen, OrderId, TradeId};
pub use order::{ExecutionInfo, Order, OrderAuditEntry, OrderSide, OrderStatus};
pub use position::Position;
pub use trade::{Trade, TradeSide, TradeStatus};
