//! Exchange-rate data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single observed conversion rate for a currency pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateReading {
    base_currency: String,
    target_currency: String,
    conversion_rate: f64,
    observed_at: DateTime<Utc>,
    source: String,
}

impl RateReading {
    /// Build a reading, rejecting malformed currency codes and non-positive rates
    pub fn new(
        base_currency: impl Into<String>,
        target_currency: impl Into<String>,
        conversion_rate: f64,
        observed_at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Result<Self> {
        let base_currency = base_currency.into();
        let target_currency = target_currency.into();

        validate_currency_code(&base_currency)?;
        validate_currency_code(&target_currency)?;

        if !conversion_rate.is_finite() || conversion_rate <= 0.0 {
            return Err(Error::validation(format!(
                "conversion rate must be a positive number, got {conversion_rate}"
            )));
        }

        Ok(Self {
            base_currency,
            target_currency,
            conversion_rate,
            observed_at,
            source: source.into(),
        })
    }

    /// Base currency code (e.g. "USD")
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Target currency code (e.g. "CNY")
    pub fn target_currency(&self) -> &str {
        &self.target_currency
    }

    /// Units of target currency per one unit of base currency
    pub fn conversion_rate(&self) -> f64 {
        self.conversion_rate
    }

    /// When the rate was fetched
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Name of the data provider
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Pair in "BASE/TARGET" form
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base_currency, self.target_currency)
    }
}

/// Upper and lower alert bounds for the conversion rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Rates strictly above this trigger an alert
    pub upper: f64,
    /// Rates strictly below this trigger an alert
    pub lower: f64,
}

impl ThresholdConfig {
    /// Create a validated threshold pair
    pub fn new(upper: f64, lower: f64) -> Result<Self> {
        let thresholds = Self { upper, lower };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check that both bounds are finite and `lower < upper`
    pub fn validate(&self) -> Result<()> {
        if !self.upper.is_finite() || !self.lower.is_finite() {
            return Err(Error::config("thresholds must be finite numbers"));
        }
        if self.lower >= self.upper {
            return Err(Error::config(format!(
                "lower threshold ({}) must be less than upper threshold ({})",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Check for a three-letter uppercase ISO 4217 style code
pub fn validate_currency_code(code: &str) -> Result<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "currency code must be three uppercase letters, got '{code}'"
        )))
    }
}
