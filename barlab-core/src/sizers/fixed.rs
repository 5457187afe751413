//! Fixed position sizer.

use crate::domain::{Bar, OrderSide};
use crate::error::ConfigError;
use crate::sizers::Sizer;
use serde::{Deserialize, Serialize};

/// Fixed position sizer.
///
/// Two modes:
/// 1. **Stake**: always trade N units (the default is a stake of 1)
/// 2. **Notional**: always trade $X worth at the current close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedSizer {
    Stake { units: f64 },
    Notional { amount: f64 },
}

impl Default for FixedSizer {
    fn default() -> Self {
        Self::Stake { units: 1.0 }
    }
}

impl FixedSizer {
    pub fn stake(units: f64) -> Result<Self, ConfigError> {
        positive("stake", units)?;
        Ok(Self::Stake { units })
    }

    pub fn notional(amount: f64) -> Result<Self, ConfigError> {
        positive("notional", amount)?;
        Ok(Self::Notional { amount })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be positive, got {value}"),
        })
    }
}

impl Sizer for FixedSizer {
    fn size(&self, _equity: f64, _side: OrderSide, bar: &Bar) -> f64 {
        match self {
            Self::Stake { units } => *units,
            Self::Notional { amount } => {
                if bar.close <= 0.0 {
                    return 0.0;
                }
                amount / bar.close
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Stake { .. } => "FixedStake",
            Self::Notional { .. } => "FixedNotional",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(close: f64) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2000, 1, 3).unwrap(),
            close,
            close,
            close,
            close,
            1000.0,
        )
    }

    #[test]
    fn default_is_one_unit() {
        let sizer = FixedSizer::default();
        assert_eq!(sizer.size(0.0, OrderSide::Buy, &make_bar(50.0)), 1.0);
        assert_eq!(sizer.name(), "FixedStake");
    }

    #[test]
    fn stake_ignores_price_and_side() {
        let sizer = FixedSizer::stake(10.0).unwrap();
        assert_eq!(sizer.size(1e6, OrderSide::Buy, &make_bar(50.0)), 10.0);
        assert_eq!(sizer.size(1e6, OrderSide::Sell, &make_bar(500.0)), 10.0);
    }

    #[test]
    fn notional_converts_at_close() {
        let sizer = FixedSizer::notional(1000.0).unwrap();
        assert_eq!(sizer.size(1e6, OrderSide::Buy, &make_bar(50.0)), 20.0);
        assert_eq!(sizer.name(), "FixedNotional");
    }

    #[test]
    fn non_positive_parameters_are_rejected() {
        assert!(matches!(
            FixedSizer::stake(0.0),
            Err(ConfigError::InvalidParameter { name: "stake", .. })
        ));
        assert!(FixedSizer::notional(-5.0).is_err());
        assert!(FixedSizer::stake(f64::NAN).is_err());
    }
}
