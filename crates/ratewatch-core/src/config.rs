//! Configuration management for RateWatch
//!
//! Sources are layered: built-in defaults, then an optional file (TOML,
//! YAML or JSON, picked by extension), then `RATEWATCH__`-prefixed
//! environment variables such as `RATEWATCH__THRESHOLDS__UPPER=7.35`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ::config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{validate_currency_code, ThresholdConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RATEWATCH";

/// Valid polling interval range in hours
pub const POLLING_INTERVAL_RANGE: std::ops::RangeInclusive<u32> = 1..=24;

const REDACTED: &str = "********";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Rate provider configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Alert thresholds
    pub thresholds: ThresholdConfig,

    /// Polling schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Alerting configuration
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Email delivery configuration
    #[serde(default)]
    pub email: EmailConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the ExchangeRate-API v6 endpoint
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Currency being converted from
    pub base_currency: String,
    /// Currency being converted to
    pub target_currency: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: String::new(),
            base_currency: "USD".to_string(),
            target_currency: "CNY".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Polling schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Hours between checks (1-24)
    pub polling_interval_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            polling_interval_hours: 1,
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Minimum minutes between two notifications for the same condition
    pub cooldown_minutes: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 60,
        }
    }
}

/// SMTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP port (465 selects implicit TLS)
    pub smtp_port: u16,
    /// Use STARTTLS on ports other than 465
    pub tls: bool,
    /// SMTP username
    pub username: Option<String>,
    /// SMTP password
    pub password: Option<String>,
    /// Sender address, optionally with display name
    pub from: String,
    /// Recipient addresses
    pub to: Vec<String>,
}

impl EmailConfig {
    /// Check the settings needed to actually send mail
    ///
    /// Not part of [`Config::validate`]: commands that never send mail run
    /// without an `[email]` section.
    pub fn validate(&self) -> Result<()> {
        if self.smtp_host.trim().is_empty() {
            return Err(Error::config("email.smtp_host is required"));
        }
        if self.from.trim().is_empty() {
            return Err(Error::config("email.from is required"));
        }
        if self.to.is_empty() {
            return Err(Error::config("email.to needs at least one recipient"));
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            tls: true,
            username: None,
            password: None,
            from: String::new(),
            to: Vec::new(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive
    pub level: String,
    /// Log format
    pub format: LogFormat,
    /// Directory for daily-rolling log files; stdout only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load configuration, reading environment overrides from `env` instead of the process
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("email.to")
            .try_parsing(true)
            .source(env);

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the monitor relies on
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if !POLLING_INTERVAL_RANGE.contains(&self.schedule.polling_interval_hours) {
            return Err(Error::config(format!(
                "polling_interval_hours must be between 1 and 24, got {}",
                self.schedule.polling_interval_hours
            )));
        }

        if self.api.api_key.trim().is_empty() {
            return Err(Error::config("api.api_key is required"));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config(format!("api.base_url is not a valid URL: {e}")))?;
        validate_currency_code(&self.api.base_currency)
            .and_then(|()| validate_currency_code(&self.api.target_currency))
            .map_err(|e| Error::config(e.to_string()))?;
        if !(1..=120).contains(&self.api.timeout_seconds) {
            return Err(Error::config(format!(
                "api.timeout_seconds must be between 1 and 120, got {}",
                self.api.timeout_seconds
            )));
        }

        Ok(())
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.api.api_key.is_empty() {
            config.api.api_key = REDACTED.to_string();
        }
        if config.email.password.is_some() {
            config.email.password = Some(REDACTED.to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const VALID_TOML: &str = r#"
[api]
api_key = "test-key"
base_currency = "USD"
target_currency = "CNY"

[thresholds]
upper = 7.35
lower = 7.05

[schedule]
polling_interval_hours = 2

[email]
smtp_host = "smtp.example.com"
from = "RateWatch <alerts@example.com>"
to = ["treasury@example.com"]
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_load_file_with_defaults() {
        let file = write_config(VALID_TOML);
        let config = Config::load_with_env(Some(file.path()), env(&[])).unwrap();

        assert_eq!(config.thresholds, ThresholdConfig { upper: 7.35, lower: 7.05 });
        assert_eq!(config.schedule.polling_interval_hours, 2);
        assert_eq!(config.alerting.cooldown_minutes, 60);
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(VALID_TOML);
        let config = Config::load_with_env(
            Some(file.path()),
            env(&[
                ("RATEWATCH__THRESHOLDS__UPPER", "7.5"),
                ("RATEWATCH__ALERTING__COOLDOWN_MINUTES", "15"),
                ("RATEWATCH__EMAIL__TO", "a@example.com,b@example.com"),
            ]),
        )
        .unwrap();

        assert_eq!(config.thresholds.upper, 7.5);
        assert_eq!(config.alerting.cooldown_minutes, 15);
        assert_eq!(config.email.to, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_environment_only() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("RATEWATCH__API__API_KEY", "k"),
                ("RATEWATCH__THRESHOLDS__UPPER", "1.2"),
                ("RATEWATCH__THRESHOLDS__LOWER", "1.0"),
                ("RATEWATCH__EMAIL__FROM", "alerts@example.com"),
                ("RATEWATCH__EMAIL__TO", "ops@example.com"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_currency, "USD");
        assert_eq!(config.email.to, vec!["ops@example.com"]);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let file = write_config(&VALID_TOML.replace("lower = 7.05", "lower = 7.35"));
        let err = Config::load_with_env(Some(file.path()), env(&[])).unwrap_err();
        assert!(err.to_string().contains("must be less than"), "got: {err}");
    }

    #[test]
    fn test_rejects_polling_interval_out_of_range() {
        for hours in ["0", "25"] {
            let file = write_config(VALID_TOML);
            let err = Config::load_with_env(
                Some(file.path()),
                env(&[("RATEWATCH__SCHEDULE__POLLING_INTERVAL_HOURS", hours)]),
            )
            .unwrap_err();
            assert!(err.to_string().contains("between 1 and 24"), "got: {err}");
        }
    }

    #[test]
    fn test_rejects_missing_thresholds() {
        let file = write_config(&VALID_TOML.replace("[thresholds]\nupper = 7.35\nlower = 7.05\n", ""));
        assert!(Config::load_with_env(Some(file.path()), env(&[])).is_err());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let cases = [
            ("api_key = \"test-key\"", "api_key = \"\"", "api_key"),
            ("base_currency = \"USD\"", "base_currency = \"usd\"", "three uppercase"),
        ];
        for (from, to, expected) in cases {
            let file = write_config(&VALID_TOML.replace(from, to));
            let err = Config::load_with_env(Some(file.path()), env(&[])).unwrap_err();
            assert!(err.to_string().contains(expected), "got: {err}");
        }
    }

    #[test]
    fn test_email_section_is_optional() {
        let without_email = VALID_TOML
            .split("[email]")
            .next()
            .unwrap_or_default()
            .to_string();
        let file = write_config(&without_email);
        let config = Config::load_with_env(Some(file.path()), env(&[])).unwrap();

        assert!(config.email.to.is_empty());
        let err = config.email.validate().unwrap_err();
        assert!(err.to_string().contains("email.from"), "got: {err}");
    }

    #[test]
    fn test_email_validate() {
        let file = write_config(VALID_TOML);
        let mut config = Config::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert!(config.email.validate().is_ok());

        config.email.to.clear();
        let err = config.email.validate().unwrap_err();
        assert!(err.to_string().contains("recipient"), "got: {err}");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_with_env(Some(Path::new("/nonexistent/ratewatch.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let file = write_config(VALID_TOML);
        let mut config = Config::load_with_env(Some(file.path()), env(&[])).unwrap();
        config.email.password = Some("hunter2".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.api.api_key, REDACTED);
        assert_eq!(redacted.email.password.as_deref(), Some(REDACTED));
        assert_eq!(redacted.thresholds, config.thresholds);
    }
}
