//! Rule evaluation over computed indicators.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::expr_eval::{eval_condition, Scope};
use crate::domain::expr_parser::parse_expr;
use crate::domain::indicator::{self, rsi, IndicatorKind};
use crate::domain::strategy::{Strategy, StrategyRule, TradeAction};

/// A candidate signal emitted by one matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub action: TradeAction,
    pub strength: f64,
    pub confidence: f64,
}

/// Outcome of evaluating a strategy against a candle series. Skip and
/// failure counts make misconfigured strategies observable without
/// aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub signals: Vec<TradeSignal>,
    pub skipped_indicators: usize,
    pub failed_conditions: usize,
}

/// Evaluate every rule of a strategy at the latest bar of `candles`.
///
/// Indicators are computed over the whole slice and their latest values
/// flattened into a name -> value scope, together with `price` (the
/// latest close). Unknown indicator names are skipped and counted; a
/// condition that fails to parse or evaluate is treated as not met and
/// counted.
pub fn evaluate_signals(strategy: &Strategy, candles: &[Candle]) -> Evaluation {
    let mut evaluation = Evaluation::default();
    let Some(last) = candles.last() else {
        return evaluation;
    };
    let price = last.close;

    let mut vars: HashMap<String, f64> = HashMap::new();
    for name in &strategy.indicators {
        let Some(kind) = IndicatorKind::parse(name) else {
            tracing::warn!(indicator = %name, "unknown indicator, skipping");
            evaluation.skipped_indicators += 1;
            continue;
        };
        let series = indicator::compute(&kind, candles);
        let key = name.trim().to_uppercase();
        if let Some(value) = series.latest() {
            vars.insert(key.clone(), value);
        }
        for (meta_key, meta_values) in &series.metadata {
            if let Some(value) = meta_values.last() {
                vars.insert(format!("{}_{}", key, meta_key.to_uppercase()), *value);
            }
        }
    }

    let scope = Scope::new(&vars, price);
    for rule in &strategy.rules {
        let expr = match parse_expr(&rule.condition) {
            Ok(expr) => expr,
            Err(err) => {
                tracing::warn!(condition = %rule.condition, error = %err, "condition failed to parse");
                evaluation.failed_conditions += 1;
                continue;
            }
        };
        match eval_condition(&expr, &scope) {
            Ok(true) => evaluation.signals.push(make_signal(rule, &vars)),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(condition = %rule.condition, error = %err, "condition failed to evaluate");
                evaluation.failed_conditions += 1;
            }
        }
    }
    evaluation
}

/// Base confidence 0.5, +0.2 when the RSI reading agrees with the
/// action's direction, +0.15 when the MACD histogram's direction does,
/// capped at 1.0. The histogram rather than the line carries the boost:
/// a positive line with a negative histogram is momentum rolling over,
/// not agreement.
fn make_signal(rule: &StrategyRule, vars: &HashMap<String, f64>) -> TradeSignal {
    let mut confidence: f64 = 0.5;
    if let Some(&rsi_value) = vars.get("RSI") {
        let agrees = match rule.action {
            TradeAction::Buy => rsi_value < rsi::OVERSOLD,
            TradeAction::Sell => rsi_value > rsi::OVERBOUGHT,
        };
        if agrees {
            confidence += 0.2;
        }
    }
    if let Some(&histogram) = vars.get("MACD_HISTOGRAM") {
        let agrees = match rule.action {
            TradeAction::Buy => histogram > 0.0,
            TradeAction::Sell => histogram < 0.0,
        };
        if agrees {
            confidence += 0.15;
        }
    }
    TradeSignal {
        action: rule.action,
        strength: rule.weight,
        confidence: confidence.min(1.0),
    }
}

/// Strongest candidate; ties go to the earliest-declared rule.
pub fn best_signal(signals: &[TradeSignal]) -> Option<&TradeSignal> {
    let mut best: Option<&TradeSignal> = None;
    for signal in signals {
        if best.map_or(true, |b| signal.strength > b.strength) {
            best = Some(signal);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use crate::domain::indicator::test_support::make_candles;
    use crate::domain::strategy::test_support::rsi_strategy;
    use crate::domain::strategy::{RiskConfig, StrategyRule};

    use super::*;

    #[test]
    fn oversold_series_emits_one_buy() {
        // A steady decline drives RSI below 30.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let candles = make_candles(&closes);
        let strategy = rsi_strategy();

        let evaluation = evaluate_signals(&strategy, &candles);
        assert_eq!(evaluation.signals.len(), 1);
        assert_eq!(evaluation.skipped_indicators, 0);
        assert_eq!(evaluation.failed_conditions, 0);

        let signal = &evaluation.signals[0];
        assert_eq!(signal.action, TradeAction::Buy);
        assert!((signal.strength - 1.0).abs() < f64::EPSILON);
        assert!(signal.confidence >= 0.7);
    }

    #[test]
    fn overbought_series_emits_one_sell() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);

        let evaluation = evaluate_signals(&rsi_strategy(), &candles);
        assert_eq!(evaluation.signals.len(), 1);
        assert_eq!(evaluation.signals[0].action, TradeAction::Sell);
        assert!(evaluation.signals[0].confidence >= 0.7);
    }

    #[test]
    fn macd_agreement_boosts_confidence() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let candles = make_candles(&closes);
        let strategy = Strategy {
            name: "trend".into(),
            indicators: vec!["MACD".into()],
            rules: vec![StrategyRule {
                condition: "indicators.MACD > 0".into(),
                action: TradeAction::Buy,
                weight: 0.8,
            }],
            risk: RiskConfig::default(),
        };

        let evaluation = evaluate_signals(&strategy, &candles);
        assert_eq!(evaluation.signals.len(), 1);
        // 0.5 base + 0.15: the histogram is positive while the trend
        // accelerates. No RSI in scope.
        assert!((evaluation.signals[0].confidence - 0.65).abs() < 1e-9);
    }

    #[test]
    fn macd_histogram_divergence_withholds_boost() {
        // An uptrend that stalls: the MACD line is still positive at the
        // last bar but the histogram has turned negative, so a BUY gets
        // no momentum boost.
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 * 2.0).collect();
        closes.extend(std::iter::repeat(178.0).take(25));
        let candles = make_candles(&closes);
        let strategy = Strategy {
            name: "stalling-trend".into(),
            indicators: vec!["MACD".into()],
            rules: vec![StrategyRule {
                condition: "indicators.MACD > 0".into(),
                action: TradeAction::Buy,
                weight: 1.0,
            }],
            risk: RiskConfig::default(),
        };

        let evaluation = evaluate_signals(&strategy, &candles);
        assert_eq!(evaluation.signals.len(), 1);
        assert!((evaluation.signals[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_indicator_skipped_and_counted() {
        let mut strategy = rsi_strategy();
        strategy.indicators.push("OBV".into());
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();

        let evaluation = evaluate_signals(&strategy, &make_candles(&closes));
        assert_eq!(evaluation.skipped_indicators, 1);
        assert_eq!(evaluation.signals.len(), 1);
    }

    #[test]
    fn failing_condition_counted_not_fatal() {
        let mut strategy = rsi_strategy();
        strategy.rules.push(StrategyRule {
            condition: "indicators.MISSING > 0".into(),
            action: TradeAction::Buy,
            weight: 0.5,
        });
        strategy.rules.push(StrategyRule {
            condition: "price > >".into(),
            action: TradeAction::Buy,
            weight: 0.5,
        });
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();

        let evaluation = evaluate_signals(&strategy, &make_candles(&closes));
        assert_eq!(evaluation.failed_conditions, 2);
        assert_eq!(evaluation.signals.len(), 1);
    }

    #[test]
    fn metadata_flattened_into_scope() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.9).sin() * 6.0).collect();
        let candles = make_candles(&closes);
        let strategy = Strategy {
            name: "bands".into(),
            indicators: vec!["BB".into()],
            rules: vec![StrategyRule {
                condition: "indicators.BB_LOWER <= indicators.BB && indicators.BB <= indicators.BB_UPPER".into(),
                action: TradeAction::Buy,
                weight: 1.0,
            }],
            risk: RiskConfig::default(),
        };

        let evaluation = evaluate_signals(&strategy, &candles);
        assert_eq!(evaluation.failed_conditions, 0);
        assert_eq!(evaluation.signals.len(), 1);
    }

    #[test]
    fn empty_candles_produce_nothing() {
        let evaluation = evaluate_signals(&rsi_strategy(), &[]);
        assert!(evaluation.signals.is_empty());
    }

    #[test]
    fn best_signal_prefers_strength_then_declaration_order() {
        let signals = vec![
            TradeSignal { action: TradeAction::Buy, strength: 0.5, confidence: 0.5 },
            TradeSignal { action: TradeAction::Sell, strength: 0.9, confidence: 0.5 },
            TradeSignal { action: TradeAction::Buy, strength: 0.9, confidence: 0.9 },
        ];
        let best = best_signal(&signals).unwrap();
        assert_eq!(best.action, TradeAction::Sell);

        assert!(best_signal(&[]).is_none());
    }
}
