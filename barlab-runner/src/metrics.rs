//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.

use barlab_core::domain::Trade;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_bars_held: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics. `starting_value` anchors the return so the first
    /// bar's move is counted.
    pub fn compute(equity_curve: &[f64], trades: &[Trade], starting_value: f64) -> Self {
        let mut curve = Vec::with_capacity(equity_curve.len() + 1);
        curve.push(starting_value);
        curve.extend_from_slice(equity_curve);
        Self {
            total_return: total_return(&curve),
            max_drawdown: max_drawdown(&curve),
            sharpe: sharpe_ratio(&curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_bars_held: avg_bars_held(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a prior peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from per-bar returns, assuming 252 bars a year
/// and a zero risk-free rate. Returns 0.0 with fewer than two returns or
/// zero variance.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * 252.0_f64.sqrt()
}

/// Win rate: fraction of trades that were winners net of commission.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses, on net pnl.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.pnlcomm > 0.0)
        .map(|t| t.pnlcomm)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnlcomm < 0.0)
        .map(|t| t.pnlcomm.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held() as f64).sum::<f64>() / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}
