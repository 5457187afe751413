use serde::{Deserialize, Serialize};

/// Net position in the feed's instrument.
///
/// `size` is signed: positive is long, negative is short, zero is flat.
/// `price` is the average entry price of the open size (0.0 when flat).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub size: f64,
    pub price: f64,
}

/// Anything smaller than this is treated as flat.
pub const FLAT_EPSILON: f64 = 1e-10;

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.size.abs() <= FLAT_EPSILON
    }

    pub fn is_long(&self) -> bool {
        self.size > FLAT_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.size < -FLAT_EPSILON
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.size * (current_price - self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_by_default() {
        let pos = Position::flat();
        assert!(pos.is_flat());
        assert!(!pos.is_long());
        assert!(!pos.is_short());
    }

    #[test]
    fn long_market_value_and_pnl() {
        let pos = Position {
            size: 10.0,
            price: 100.0,
        };
        assert!(pos.is_long());
        assert_eq!(pos.market_value(110.0), 1100.0);
        assert_eq!(pos.unrealized_pnl(110.0), 100.0);
    }

    #[test]
    fn short_pnl_gains_when_price_falls() {
        let pos = Position {
            size: -5.0,
            price: 50.0,
        };
        assert!(pos.is_short());
        assert_eq!(pos.unrealized_pnl(40.0), 50.0);
    }
}
