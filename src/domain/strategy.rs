//! Strategy definition: indicators, rules, and risk limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::TradekitError;
use crate::domain::expr_parser::parse_expr;
use crate::domain::indicator::IndicatorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Sell => f.write_str("SELL"),
        }
    }
}

impl FromStr for TradeAction {
    type Err = TradekitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            other => Err(TradekitError::RuleInvalid {
                reason: format!("unknown action '{}', expected BUY or SELL", other),
            }),
        }
    }
}

/// One declarative rule. The condition is data, not code; it is parsed
/// and evaluated in the sandboxed expression interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub condition: String,
    pub action: TradeAction,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSizing {
    Fixed,
    Percentage,
    Kelly,
}

impl FromStr for PositionSizing {
    type Err = TradekitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(PositionSizing::Fixed),
            "percentage" => Ok(PositionSizing::Percentage),
            "kelly" => Ok(PositionSizing::Kelly),
            other => Err(TradekitError::ConfigInvalid {
                section: "risk".into(),
                key: "position_sizing".into(),
                reason: format!("unknown method '{}', expected fixed, percentage, or kelly", other),
            }),
        }
    }
}

/// Position limits and exit thresholds. Percent fields are expressed in
/// percent (5.0 means 5%); `max_position_size` is a fraction of capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_position_size: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_drawdown_pct: f64,
    pub position_sizing: PositionSizing,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_position_size: 0.1,
            stop_loss_pct: 5.0,
            take_profit_pct: 10.0,
            max_drawdown_pct: 20.0,
            position_sizing: PositionSizing::Percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub indicators: Vec<String>,
    pub rules: Vec<StrategyRule>,
    pub risk: RiskConfig,
}

impl Strategy {
    /// Reject a strategy a caller should never run: no rules, malformed
    /// conditions, bad weights, or out-of-range risk limits. Unknown
    /// indicator names are deliberately NOT rejected here; the evaluator
    /// skips and logs them so multi-indicator batches degrade gracefully.
    pub fn validate(&self) -> Result<(), TradekitError> {
        if self.rules.is_empty() {
            return Err(TradekitError::RuleInvalid {
                reason: "strategy has no rules".into(),
            });
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                return Err(TradekitError::RuleInvalid {
                    reason: format!("rule {} weight must be a finite value >= 0", i + 1),
                });
            }
            parse_expr(&rule.condition)?;
        }

        let risk = &self.risk;
        if !(risk.max_position_size > 0.0 && risk.max_position_size <= 1.0) {
            return Err(TradekitError::ConfigInvalid {
                section: "risk".into(),
                key: "max_position_size".into(),
                reason: "must be a fraction in (0, 1]".into(),
            });
        }
        if risk.stop_loss_pct < 0.0 {
            return Err(TradekitError::ConfigInvalid {
                section: "risk".into(),
                key: "stop_loss_pct".into(),
                reason: "must be >= 0".into(),
            });
        }
        if risk.take_profit_pct < 0.0 {
            return Err(TradekitError::ConfigInvalid {
                section: "risk".into(),
                key: "take_profit_pct".into(),
                reason: "must be >= 0".into(),
            });
        }
        if !(0.0..=100.0).contains(&risk.max_drawdown_pct) {
            return Err(TradekitError::ConfigInvalid {
                section: "risk".into(),
                key: "max_drawdown_pct".into(),
                reason: "must be a percentage in [0, 100]".into(),
            });
        }
        Ok(())
    }

    /// Indicator kinds this strategy asks for, skipping names the
    /// library does not know.
    pub fn known_indicators(&self) -> Vec<(String, IndicatorKind)> {
        self.indicators
            .iter()
            .filter_map(|name| IndicatorKind::parse(name).map(|kind| (name.to_uppercase(), kind)))
            .collect()
    }
}
