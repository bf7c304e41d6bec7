//! In-memory collaborators shared by unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

use crate::alerting::{AlertSender, NotificationError};
use crate::fetcher::RateFetcher;
use crate::models::{AlertPayload, RateReading};

/// Sender that replays scripted results and records every attempt
#[derive(Default)]
pub(crate) struct ScriptedSender {
    results: Mutex<VecDeque<bool>>,
    pub(crate) sent: Mutex<Vec<AlertPayload>>,
}

impl ScriptedSender {
    pub(crate) fn new(results: &[bool]) -> Self {
        Self {
            results: Mutex::new(results.iter().copied().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait::async_trait]
impl AlertSender for ScriptedSender {
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        self.sent.lock().push(payload.clone());
        // Succeed once the script runs out
        if self.results.lock().pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(NotificationError::SmtpError("connection refused".to_string()))
        }
    }

    fn channel_name(&self) -> &str {
        "scripted"
    }
}

/// Fetcher that replays scripted rates; `None` entries and an empty script yield no data
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    rates: Mutex<VecDeque<Option<f64>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new(rates: &[Option<f64>]) -> Self {
        Self {
            rates: Mutex::new(rates.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RateFetcher for ScriptedFetcher {
    async fn fetch_current_rate(&self) -> Option<RateReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = self.rates.lock().pop_front().flatten()?;
        RateReading::new("USD", "CNY", value, Utc::now(), "scripted").ok()
    }

    fn source(&self) -> &str {
        "scripted"
    }
}

/// Fetcher that panics on its first call and reports `rate` afterwards
pub(crate) struct PanicOnceFetcher {
    rate: f64,
    calls: AtomicUsize,
}

impl PanicOnceFetcher {
    pub(crate) fn new(rate: f64) -> Self {
        Self {
            rate,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RateFetcher for PanicOnceFetcher {
    async fn fetch_current_rate(&self) -> Option<RateReading> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("malformed provider response");
        }
        RateReading::new("USD", "CNY", self.rate, Utc::now(), "panic-once").ok()
    }

    fn source(&self) -> &str {
        "panic-once"
    }
}
