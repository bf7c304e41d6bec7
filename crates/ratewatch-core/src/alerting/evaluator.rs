//! Threshold evaluation for exchange-rate readings

use crate::models::{Condition, RateReading, ThresholdConfig, ThresholdDecision};

/// Decides whether a reading breaches the configured thresholds
///
/// Stateless; assumes `thresholds.lower < thresholds.upper`, which
/// [`ThresholdConfig::validate`] guarantees at load time.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    thresholds: ThresholdConfig,
}

impl ThresholdEvaluator {
    /// Create an evaluator for the given thresholds
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    /// Thresholds this evaluator checks against
    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds
    }

    /// Evaluate a reading; values equal to a bound are within range
    pub fn evaluate(&self, rate: &RateReading) -> ThresholdDecision {
        let value = rate.conversion_rate();

        let (condition, threshold) = if value > self.thresholds.upper {
            (Condition::AboveUpper, self.thresholds.upper)
        } else if value < self.thresholds.lower {
            (Condition::BelowLower, self.thresholds.lower)
        } else {
            return ThresholdDecision::NoAction;
        };

        ThresholdDecision::Notify {
            condition,
            message: format_alert_message(rate, condition, threshold),
        }
    }
}

/// Format alert message
fn format_alert_message(rate: &RateReading, condition: Condition, threshold: f64) -> String {
    let verb = match condition {
        Condition::AboveUpper => "rose above the upper threshold",
        Condition::BelowLower => "fell below the lower threshold",
    };

    format!(
        "{} rate {:.4} {} of {:.4}",
        rate.pair(),
        rate.conversion_rate(),
        verb,
        threshold
    )
}
