//! Cooldown-gated alert delivery with a single retry

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{AlertPayload, Condition, DispatchOutcome, RateReading, ThresholdConfig};

use super::cache::NotificationCache;
use super::notifier::{AlertSender, NotificationError};
use super::template::build_payload;

/// Fixed wait between the first failed delivery and the retry
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Sends threshold alerts, honouring the per-condition cooldown
pub struct AlertDispatcher {
    cache: Arc<NotificationCache>,
    sender: Arc<dyn AlertSender>,
    clock: Arc<dyn Clock>,
    thresholds: ThresholdConfig,
    cooldown_minutes: u64,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(
        cache: Arc<NotificationCache>,
        sender: Arc<dyn AlertSender>,
        clock: Arc<dyn Clock>,
        thresholds: ThresholdConfig,
        cooldown_minutes: u64,
    ) -> Self {
        Self {
            cache,
            sender,
            clock,
            thresholds,
            cooldown_minutes,
        }
    }

    /// Deliver an alert for `condition` unless it is in cooldown
    ///
    /// A failed delivery is retried exactly once after [`RETRY_BACKOFF`]; a
    /// sender that panics counts as a failed delivery. The cache is only
    /// updated after a successful delivery.
    pub async fn dispatch(&self, rate: &RateReading, condition: Condition) -> Result<DispatchOutcome> {
        if !self.cache.can_send(condition, self.cooldown_minutes) {
            info!(
                condition = %condition,
                cooldown_minutes = self.cooldown_minutes,
                last_sent = ?self.cache.last_sent(condition),
                "Notification suppressed by cooldown"
            );
            return Ok(DispatchOutcome::Suppressed);
        }

        let payload = build_payload(rate, condition, &self.thresholds, self.clock.now());
        let channel = self.sender.channel_name();

        let attempts = match self.attempt(&payload).await {
            Ok(()) => 1,
            Err(first) => {
                warn!(
                    channel,
                    condition = %condition,
                    error = %first,
                    retry_in_secs = RETRY_BACKOFF.as_secs(),
                    "Alert delivery failed, retrying"
                );

                tokio::time::sleep(RETRY_BACKOFF).await;

                match self.attempt(&payload).await {
                    Ok(()) => 2,
                    Err(second) => {
                        error!(
                            channel,
                            condition = %condition,
                            error = %second,
                            "Alert delivery failed after retry"
                        );
                        return Err(Error::delivery(2, second.to_string()));
                    }
                }
            }
        };

        self.cache.record(condition);
        self.cache.cleanup(self.cooldown_minutes);

        debug!(channel, condition = %condition, attempts, "Alert delivered");
        Ok(DispatchOutcome::Sent { attempts })
    }

    async fn attempt(&self, payload: &AlertPayload) -> std::result::Result<(), NotificationError> {
        AssertUnwindSafe(self.sender.send(payload))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(NotificationError::Panicked(panic_message(&*panic))))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::ScriptedSender;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics on the first `panics` calls, then succeeds
    struct PanickingSender {
        panics: usize,
        calls: AtomicUsize,
    }

    impl PanickingSender {
        fn new(panics: usize) -> Self {
            Self {
                panics,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl AlertSender for PanickingSender {
        async fn send(&self, _payload: &AlertPayload) -> std::result::Result<(), NotificationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.panics {
                panic!("smtp client bug");
            }
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "panicking"
        }
    }

    fn panicking_dispatcher(panics: usize) -> (Arc<PanickingSender>, Arc<NotificationCache>, AlertDispatcher) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let cache = Arc::new(NotificationCache::new(clock.clone()));
        let sender = Arc::new(PanickingSender::new(panics));
        let dispatcher = AlertDispatcher::new(
            cache.clone(),
            sender.clone(),
            clock,
            ThresholdConfig::new(8.5, 8.0).unwrap(),
            60,
        );
        (sender, cache, dispatcher)
    }

    struct Harness {
        clock: Arc<ManualClock>,
        cache: Arc<NotificationCache>,
        sender: Arc<ScriptedSender>,
        dispatcher: AlertDispatcher,
    }

    fn harness(results: &[bool]) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let cache = Arc::new(NotificationCache::new(clock.clone()));
        let sender = Arc::new(ScriptedSender::new(results));
        let dispatcher = AlertDispatcher::new(
            cache.clone(),
            sender.clone(),
            clock.clone(),
            ThresholdConfig::new(8.5, 8.0).unwrap(),
            60,
        );
        Harness {
            clock,
            cache,
            sender,
            dispatcher,
        }
    }

    fn reading(value: f64) -> RateReading {
        RateReading::new("USD", "CNY", value, Utc::now(), "test").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_records_condition() {
        let h = harness(&[true]);

        let outcome = h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent { attempts: 1 });
        assert_eq!(h.sender.attempts(), 1);
        assert!(h.cache.last_sent(Condition::AboveUpper).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_backoff_then_suppress() {
        let h = harness(&[false, true]);

        let started = tokio::time::Instant::now();
        let outcome = h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent { attempts: 2 });
        assert_eq!(h.sender.attempts(), 2);
        assert!(started.elapsed() >= RETRY_BACKOFF);
        assert!(!h.cache.can_send(Condition::AboveUpper, 60));

        // Within cooldown: no send attempt at all
        let outcome = h.dispatcher.dispatch(&reading(8.7), Condition::AboveUpper).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Suppressed);
        assert_eq!(h.sender.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conditions_have_independent_cooldowns() {
        let h = harness(&[]);

        h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();
        let outcome = h.dispatcher.dispatch(&reading(7.9), Condition::BelowLower).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent { attempts: 1 });
        assert_eq!(h.sender.attempts(), 2);
        assert!(h.sender.sent.lock()[1].subject.contains("below lower threshold"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_failure_is_reported_and_not_recorded() {
        let h = harness(&[false, false]);

        let result = h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await;

        assert!(matches!(result, Err(Error::Delivery { attempts: 2, .. })));
        assert_eq!(h.sender.attempts(), 2);
        assert!(h.cache.is_empty());
        assert!(h.cache.can_send(Condition::AboveUpper, 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_again_after_cooldown() {
        let h = harness(&[]);

        h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(60));
        let outcome = h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent { attempts: 1 });
        assert_eq!(h.sender.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_payload_uses_dispatch_time() {
        let h = harness(&[]);
        h.clock.advance(chrono::Duration::minutes(7));

        h.dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();

        let sent = h.sender.sent.lock();
        assert!(sent[0].text_body.contains("2024-06-01T09:07:00+00:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_panic_is_retried() {
        let (sender, cache, dispatcher) = panicking_dispatcher(1);

        let started = tokio::time::Instant::now();
        let outcome = dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent { attempts: 2 });
        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= RETRY_BACKOFF);
        assert!(cache.last_sent(Condition::AboveUpper).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_panicking_twice_is_delivery_failure() {
        let (_, cache, dispatcher) = panicking_dispatcher(2);

        let result = dispatcher.dispatch(&reading(8.6), Condition::AboveUpper).await;

        match result {
            Err(Error::Delivery { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert!(message.contains("smtp client bug"), "got: {message}");
            }
            other => panic!("expected delivery failure, got {other:?}"),
        }
        assert!(cache.is_empty());
    }
}
