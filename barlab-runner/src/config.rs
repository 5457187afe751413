//! TOML backtest configuration.
//!
//! ```toml
//! [data]
//! path = "data/orcl-2000.csv"
//! from_date = "2000-01-01"
//! to_date = "2000-12-31"
//!
//! [broker]
//! cash = 100000.0
//! commission = 0.001
//!
//! [strategy]
//! stake = 1
//! hold_bars = 5
//! ```
//!
//! Cash and commission have no defaults: a run without them fails with
//! `ConfigError::CashNotSet` / `ConfigError::CommissionNotSet`.
//!
//! Dates are quoted strings (`"2000-01-01"`); a bare TOML date is a parse
//! error. Unknown keys in `[broker]` and `[strategy]` are rejected so a typo
//! cannot silently fall back to a default.

use barlab_core::data::CsvOptions;
use barlab_core::engine::{Broker, FillPolicy};
use barlab_core::error::ConfigError;
use barlab_core::sizers::FixedSizer;
use barlab_core::strategy::DecliningCloses;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub broker: BrokerConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub cash: Option<f64>,
    /// Proportional commission rate (0.001 = 0.1% of notional).
    pub commission: Option<f64>,
    pub allow_short: bool,
    pub fill_policy: FillPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    /// Units per order.
    pub stake: f64,
    /// Trade a fixed dollar amount instead of `stake` units.
    pub notional: Option<f64>,
    /// Consecutive falling closes required for an entry.
    pub streak: usize,
    /// Bars to hold a position before exiting.
    pub hold_bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let rule = DecliningCloses::default();
        Self {
            stake: 1.0,
            notional: None,
            streak: rule.streak,
            hold_bars: rule.hold_bars,
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every setting a run needs, without touching the data file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cash = self.broker.cash.ok_or(ConfigError::CashNotSet)?;
        let commission = self.broker.commission.ok_or(ConfigError::CommissionNotSet)?;
        if !cash.is_finite() || cash < 0.0 {
            return Err(ConfigError::InvalidCash(cash));
        }
        if !commission.is_finite() || commission < 0.0 {
            return Err(ConfigError::NegativeCommission(commission));
        }
        if let (Some(from), Some(to)) = (self.data.csv.from_date, self.data.csv.to_date) {
            if from > to {
                return Err(ConfigError::InvalidDateWindow { from, to });
            }
        }
        self.build_sizer()?;
        self.build_rule()?;
        Ok(())
    }

    pub fn data_path(&self) -> Result<&Path, ConfigError> {
        self.data
            .path
            .as_deref()
            .ok_or(ConfigError::MissingDataPath)
    }

    /// A configured, not yet started, broker.
    pub fn build_broker(&self) -> Result<Broker, ConfigError> {
        let mut broker = Broker::new();
        if let Some(cash) = self.broker.cash {
            broker.set_cash(cash)?;
        }
        if let Some(rate) = self.broker.commission {
            broker.set_commission(rate)?;
        }
        broker.set_allow_short(self.broker.allow_short)?;
        broker.set_fill_policy(self.broker.fill_policy)?;
        Ok(broker)
    }

    pub fn build_sizer(&self) -> Result<FixedSizer, ConfigError> {
        match self.strategy.notional {
            Some(amount) => FixedSizer::notional(amount),
            None => FixedSizer::stake(self.strategy.stake),
        }
    }

    pub fn build_rule(&self) -> Result<DecliningCloses, ConfigError> {
        DecliningCloses::new(self.strategy.streak, self.strategy.hold_bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL: &str = r#"
        [data]
        path = "bars.csv"
        from_date = "2000-01-01"
        to_date = "2000-12-31"
        reverse = true

        [broker]
        cash = 100000.0
        commission = 0.001
        fill_policy = "current_close"

        [strategy]
        stake = 10
        hold_bars = 3
    "#;

    #[test]
    fn parses_full_config() {
        let config = BacktestConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.data.path.as_deref(), Some(Path::new("bars.csv")));
        assert_eq!(
            config.data.csv.from_date,
            NaiveDate::from_ymd_opt(2000, 1, 1)
        );
        assert!(config.data.csv.reverse);
        assert!(config.data.csv.adjust_close);
        assert_eq!(config.broker.cash, Some(100_000.0));
        assert_eq!(config.broker.fill_policy, FillPolicy::CurrentClose);
        assert_eq!(config.strategy.stake, 10.0);
        assert_eq!(config.strategy.streak, 2);
        assert_eq!(config.strategy.hold_bars, 3);
        config.validate().unwrap();
    }

    #[test]
    fn defaults_leave_cash_and_commission_unset() {
        let config = BacktestConfig::from_toml_str("").unwrap();
        assert_eq!(config.broker.cash, None);
        assert_eq!(config.strategy, StrategyConfig::default());
        assert!(matches!(config.validate(), Err(ConfigError::CashNotSet)));
        assert!(matches!(config.data_path(), Err(ConfigError::MissingDataPath)));
    }

    #[test]
    fn commission_is_required() {
        let config = BacktestConfig::from_toml_str("[broker]\ncash = 1000.0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::CommissionNotSet)));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = BacktestConfig::from_toml_str(FULL).unwrap();
        config.broker.commission = Some(-0.1);
        assert!(matches!(config.validate(), Err(ConfigError::NegativeCommission(_))));

        let mut config = BacktestConfig::from_toml_str(FULL).unwrap();
        config.data.csv.from_date = NaiveDate::from_ymd_opt(2001, 1, 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDateWindow { .. })
        ));

        let mut config = BacktestConfig::from_toml_str(FULL).unwrap();
        config.strategy.stake = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "stake", .. })
        ));

        let mut config = BacktestConfig::from_toml_str(FULL).unwrap();
        config.strategy.streak = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            BacktestConfig::from_toml_str("[broker\ncash = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        for text in [
            "[broker]\ncash = 1000.0\ncomission = 0.01\n",
            "[strategy]\nhold_bar = 10\n",
            "[stratgy]\nhold_bars = 10\n",
        ] {
            assert!(
                matches!(BacktestConfig::from_toml_str(text), Err(ConfigError::Parse(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn dates_must_be_quoted() {
        let quoted = BacktestConfig::from_toml_str("[data]\nfrom_date = \"2000-01-01\"\n").unwrap();
        assert_eq!(quoted.data.csv.from_date, NaiveDate::from_ymd_opt(2000, 1, 1));
        assert!(matches!(
            BacktestConfig::from_toml_str("[data]\nfrom_date = 2000-01-01\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = BacktestConfig::load(&path).unwrap();
        assert_eq!(config.broker.commission, Some(0.001));

        let missing = BacktestConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn builds_engine_parts() {
        let config = BacktestConfig::from_toml_str(FULL).unwrap();
        let broker = config.build_broker().unwrap();
        assert_eq!(broker.cash(), 100_000.0);
        assert_eq!(broker.commission_rate(), 0.001);
        assert_eq!(broker.fill_policy(), FillPolicy::CurrentClose);
        assert!(!broker.is_started());
        assert_eq!(config.build_sizer().unwrap(), FixedSizer::Stake { units: 10.0 });
        assert_eq!(config.build_rule().unwrap().hold_bars, 3);
    }
}
