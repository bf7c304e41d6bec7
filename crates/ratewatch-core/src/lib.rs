//! # RateWatch
//!
//! Currency exchange-rate monitor with email alerts.
//!
//! RateWatch polls an exchange-rate API on a fixed schedule, compares the
//! rate with an upper and a lower threshold, and emails an alert when one is
//! crossed. Alerts for the same condition are rate-limited by a cooldown.
//!
//! ## Architecture
//!
//! - **Fetcher**: HTTP client for the rate provider
//! - **Alerting**: threshold evaluation, cooldown cache and email delivery
//! - **Scheduler**: immediate check on startup, then cron-driven checks
//!
//! ## Quick Start
//!
//! ```bash
//! # Check once and print the outcome
//! ratewatch --config ratewatch.toml check
//!
//! # Monitor until Ctrl+C
//! ratewatch --config ratewatch.toml run
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod scheduler;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertDispatcher, AlertSender, NotificationCache, ThresholdEvaluator};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::fetcher::RateFetcher;
    pub use crate::models::*;
    pub use crate::scheduler::{CheckCycle, CheckCycleOrchestrator};
}
