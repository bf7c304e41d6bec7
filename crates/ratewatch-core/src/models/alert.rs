//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which threshold a rate breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Rate rose above the upper threshold
    AboveUpper,
    /// Rate fell below the lower threshold
    BelowLower,
}

impl Condition {
    /// Human-readable label used in messages and emails
    pub fn label(self) -> &'static str {
        match self {
            Self::AboveUpper => "above upper threshold",
            Self::BelowLower => "below lower threshold",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AboveUpper => f.write_str("above_upper"),
            Self::BelowLower => f.write_str("below_lower"),
        }
    }
}

/// Result of evaluating a reading against the thresholds
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdDecision {
    /// Rate is within range (bounds inclusive)
    NoAction,
    /// Rate breached a bound
    Notify {
        /// Breached bound
        condition: Condition,
        /// Human-readable description
        message: String,
    },
}

impl ThresholdDecision {
    /// Breached condition, if any
    pub fn condition(&self) -> Option<Condition> {
        match self {
            Self::NoAction => None,
            Self::Notify { condition, .. } => Some(*condition),
        }
    }
}

/// Record of the last successful notification for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Condition the notification was sent for
    pub condition: Condition,
    /// When it was sent
    pub sent_at: DateTime<Utc>,
}

/// A rendered alert ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    /// Condition that triggered the alert
    pub condition: Condition,
    /// Email subject line
    pub subject: String,
    /// Plain-text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
}

/// Successful dispatch result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Alert was delivered
    Sent {
        /// Number of delivery attempts used (1 or 2)
        attempts: u32,
    },
    /// Cooldown for this condition has not elapsed; nothing was sent
    Suppressed,
}

/// How a single check cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The rate provider returned no data
    Skipped,
    /// Rate is inside the configured range
    WithinRange,
    /// An alert was delivered
    Sent,
    /// An alert was due but the cooldown suppressed it
    Suppressed,
    /// Delivery failed after the retry
    DeliveryFailed,
    /// The cycle panicked before finishing
    Aborted,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Skipped => "skipped",
            Self::WithinRange => "within_range",
            Self::Sent => "sent",
            Self::Suppressed => "suppressed",
            Self::DeliveryFailed => "delivery_failed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}
