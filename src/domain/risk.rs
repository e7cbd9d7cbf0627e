//! Return-distribution risk metrics.
//!
//! Operates on an arbitrary return series: trade PnL percentages, daily
//! returns, or simulated history. Annualization here uses 252 trading
//! days; the simulator's per-trade Sharpe uses calendar-day sqrt(365).
//! The two conventions are intentional and must stay distinct.

use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub portfolio_value: f64,
    pub daily_var: f64,
    pub weekly_var: f64,
    pub monthly_var: f64,
    pub expected_shortfall: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub volatility: f64,
}

/// Compute the full metrics set over a return series. Pure and
/// deterministic: identical input yields bit-identical output. An empty
/// series produces all-zero metrics rather than NaN.
pub fn compute_risk_metrics(returns: &[f64], portfolio_value: f64, confidence: f64) -> RiskMetrics {
    if returns.is_empty() {
        return RiskMetrics {
            portfolio_value,
            daily_var: 0.0,
            weekly_var: 0.0,
            monthly_var: 0.0,
            expected_shortfall: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            calmar_ratio: 0.0,
            max_drawdown: 0.0,
            current_drawdown: 0.0,
            volatility: 0.0,
        };
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let volatility = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    let annualized_mean = mean * TRADING_DAYS_PER_YEAR;

    let daily_var = historical_var(returns, confidence);
    let expected_shortfall = expected_shortfall_below_var(returns, confidence);
    let (max_drawdown, current_drawdown) = drawdowns(returns);

    let sharpe_ratio = if volatility == 0.0 {
        0.0
    } else {
        (annualized_mean - RISK_FREE_RATE) / volatility
    };

    let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino_ratio = if negatives.is_empty() {
        f64::INFINITY
    } else {
        let neg_mean = negatives.iter().sum::<f64>() / negatives.len() as f64;
        let neg_var = negatives.iter().map(|r| (r - neg_mean).powi(2)).sum::<f64>()
            / negatives.len() as f64;
        let downside = neg_var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        if downside == 0.0 {
            0.0
        } else {
            (annualized_mean - RISK_FREE_RATE) / downside
        }
    };

    let calmar_ratio = if max_drawdown == 0.0 {
        0.0
    } else {
        annualized_mean / max_drawdown
    };

    RiskMetrics {
        portfolio_value,
        daily_var,
        weekly_var: daily_var * 7.0f64.sqrt(),
        monthly_var: daily_var * 30.0f64.sqrt(),
        expected_shortfall,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        current_drawdown,
        volatility,
    }
}

/// Ascending-sorted copy of the returns plus the VaR cutoff index at
/// `floor((1 - confidence) * n)`, clamped into range. Both tail
/// statistics read from this so they can never use different cutoffs.
fn sorted_with_cutoff(returns: &[f64], confidence: f64) -> (Vec<f64>, usize) {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = (((1.0 - confidence) * sorted.len() as f64).floor() as usize)
        .min(sorted.len() - 1);
    (sorted, index)
}

/// Historical VaR: the absolute return at the `(1 - confidence)`
/// quantile of the ascending-sorted series.
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let (sorted, index) = sorted_with_cutoff(returns, confidence);
    sorted[index].abs()
}

/// Mean of the tail strictly below the VaR cutoff index; 0 when the
/// tail is empty.
pub fn expected_shortfall_below_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let (sorted, index) = sorted_with_cutoff(returns, confidence);
    let tail = &sorted[..index];
    if tail.is_empty() {
        return 0.0;
    }
    (tail.iter().sum::<f64>() / tail.len() as f64).abs()
}

/// Compound a unit value through the returns; drawdown is the fractional
/// decline from the running peak. Returns (max, current).
fn drawdowns(returns: &[f64]) -> (f64, f64) {
    let mut value = 1.0f64;
    let mut peak = 1.0f64;
    let mut max_drawdown = 0.0f64;
    let mut current_drawdown = 0.0f64;
    for r in returns {
        value *= 1.0 + r;
        if value > peak {
            peak = value;
        }
        current_drawdown = (peak - value) / peak;
        if current_drawdown > max_drawdown {
            max_drawdown = current_drawdown;
        }
    }
    (max_drawdown, current_drawdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_returns_all_zero() {
        let metrics = compute_risk_metrics(&[], 50_000.0, DEFAULT_CONFIDENCE);
        assert_eq!(metrics.portfolio_value, 50_000.0);
        assert_eq!(metrics.daily_var, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.volatility, 0.0);
    }

    #[test]
    fn var_picks_the_quantile() {
        let returns = [-0.05, -0.02, 0.01, 0.03];
        // (1 - 0.95) * 4 = 0.2 → index 0 → worst return.
        assert!((historical_var(&returns, 0.95) - 0.05).abs() < f64::EPSILON);
        // (1 - 0.75) * 4 = 1 → index 1.
        assert!((historical_var(&returns, 0.75) - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn expected_shortfall_means_the_tail() {
        let returns = [-0.05, -0.02, 0.01, 0.03];
        // 95%: cutoff index 0, empty tail.
        assert_eq!(expected_shortfall_below_var(&returns, 0.95), 0.0);
        // 75%: cutoff index 1, tail is [-0.05].
        assert!((expected_shortfall_below_var(&returns, 0.75) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn tail_mean_never_understates_var() {
        // The ES tail sits strictly below the VaR cutoff, so whenever it
        // is non-empty its mean loss is at least the VaR.
        let returns: Vec<f64> = (0..100).map(|i| ((i as f64 * 0.61).sin() - 0.2) / 10.0).collect();
        for confidence in [0.5, 0.75, 0.9, 0.95] {
            let var = historical_var(&returns, confidence);
            let es = expected_shortfall_below_var(&returns, confidence);
            if es > 0.0 {
                assert!(es >= var, "conf {}: es {} < var {}", confidence, es, var);
            }
        }
    }

    #[test]
    fn drawdown_tracks_peak() {
        use approx::assert_relative_eq;

        // 1.0 → 1.1 → 0.55 → 0.66
        let (max, current) = drawdowns(&[0.1, -0.5, 0.2]);
        assert_relative_eq!(max, 0.5, max_relative = 1e-9);
        assert_relative_eq!(current, 0.4, max_relative = 1e-9);
    }

    #[test]
    fn monotonic_gains_have_no_drawdown() {
        let metrics = compute_risk_metrics(&[0.01, 0.02, 0.01], 10_000.0, DEFAULT_CONFIDENCE);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.current_drawdown, 0.0);
        assert_eq!(metrics.calmar_ratio, 0.0);
        assert!(metrics.sortino_ratio.is_infinite());
    }

    #[test]
    fn flat_returns_guard_division() {
        // Zero variance: Sharpe must be 0, not NaN or infinity.
        let metrics = compute_risk_metrics(&[0.01; 10], 10_000.0, DEFAULT_CONFIDENCE);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.volatility, 0.0);
    }

    #[test]
    fn var_horizon_scaling() {
        let returns = [-0.04, -0.01, 0.0, 0.01, 0.02];
        let metrics = compute_risk_metrics(&returns, 10_000.0, DEFAULT_CONFIDENCE);
        assert!((metrics.weekly_var - metrics.daily_var * 7.0f64.sqrt()).abs() < 1e-12);
        assert!((metrics.monthly_var - metrics.daily_var * 30.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn sharpe_sign_follows_excess_return() {
        let losing = compute_risk_metrics(&[-0.02, -0.01, -0.03], 10_000.0, DEFAULT_CONFIDENCE);
        assert!(losing.sharpe_ratio < 0.0);

        let winning = compute_risk_metrics(&[0.02, 0.01, 0.03], 10_000.0, DEFAULT_CONFIDENCE);
        assert!(winning.sharpe_ratio > 0.0);
    }

    #[test]
    fn computation_is_idempotent() {
        let returns: Vec<f64> = (0..50)
            .map(|i| ((i as f64 * 0.37).sin() - 0.1) / 20.0)
            .collect();
        let a = compute_risk_metrics(&returns, 25_000.0, DEFAULT_CONFIDENCE);
        let b = compute_risk_metrics(&returns, 25_000.0, DEFAULT_CONFIDENCE);
        assert_eq!(a, b);
    }
}
