//! Flat percentage-of-notional commission.
//!
//! `commission = rate * price * size`, charged on every fill, both sides.

use crate::error::ConfigError;

/// Flat-rate commission on notional value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionModel {
    /// Fraction of notional, e.g. 0.01 for 1%.
    rate: f64,
}

impl CommissionModel {
    pub fn new(rate: f64) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::NegativeCommission(rate));
        }
        Ok(Self { rate })
    }

    pub fn frictionless() -> Self {
        Self { rate: 0.0 }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Commission for a fill of `size` units at `price`. Size sign is ignored.
    pub fn commission(&self, price: f64, size: f64) -> f64 {
        self.rate * price * size.abs()
    }

    /// Cash needed to buy `size` at `price`, commission included.
    pub fn buy_cost(&self, price: f64, size: f64) -> f64 {
        price * size.abs() + self.commission(price, size)
    }
}
