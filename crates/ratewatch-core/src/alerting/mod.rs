//! Alerting system for RateWatch
//!
//! Threshold evaluation, per-condition cooldowns and email delivery.

mod cache;
mod dispatcher;
mod evaluator;
mod notifier;
mod template;

pub use cache::NotificationCache;
pub use dispatcher::{AlertDispatcher, RETRY_BACKOFF};
pub use evaluator::ThresholdEvaluator;
pub use notifier::{AlertSender, LogAlertSender, NotificationError, SmtpAlertSender};
pub use template::build_payload;
