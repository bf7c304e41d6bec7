//! Per-condition notification cooldown tracking

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::models::{Condition, NotificationRecord};

/// Remembers when each condition was last notified
///
/// Holds at most one record per [`Condition`]. State lives in memory only
/// and is lost on restart.
pub struct NotificationCache {
    records: Mutex<HashMap<Condition, NotificationRecord>>,
    clock: Arc<dyn Clock>,
}

impl NotificationCache {
    /// Create an empty cache reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Whether a notification for `condition` is allowed now
    ///
    /// True when nothing was sent yet, or when at least `cooldown_minutes`
    /// have passed since the last send (the boundary itself is allowed).
    pub fn can_send(&self, condition: Condition, cooldown_minutes: u64) -> bool {
        let records = self.records.lock();
        let Some(record) = records.get(&condition) else {
            return true;
        };

        let elapsed = self.clock.now() - record.sent_at;
        elapsed >= cooldown(cooldown_minutes)
    }

    /// Mark `condition` as notified at the current time
    pub fn record(&self, condition: Condition) {
        let sent_at = self.clock.now();
        self.records
            .lock()
            .insert(condition, NotificationRecord { condition, sent_at });

        debug!(condition = %condition, sent_at = %sent_at, "Recorded notification");
    }

    /// Drop records whose cooldown has fully elapsed, returning how many were removed
    pub fn cleanup(&self, cooldown_minutes: u64) -> usize {
        let now = self.clock.now();
        let window = cooldown(cooldown_minutes);

        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| now - record.sent_at < window);
        let removed = before - records.len();

        if removed > 0 {
            debug!(removed, remaining = records.len(), "Cleaned up notification records");
        }

        removed
    }

    /// Time of the last successful notification for `condition`
    pub fn last_sent(&self, condition: Condition) -> Option<DateTime<Utc>> {
        self.records.lock().get(&condition).map(|r| r.sent_at)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are held
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn cooldown(minutes: u64) -> Duration {
    // chrono panics past i64::MAX milliseconds
    let minutes = i64::try_from(minutes).unwrap_or(i64::MAX).min(i64::MAX / 60_000);
    Duration::minutes(minutes)
}
