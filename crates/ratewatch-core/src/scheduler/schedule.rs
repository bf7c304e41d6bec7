//! Cron schedule derived from the polling interval

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{Error, Result};

/// Longest supported interval (one day)
const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

/// Recurring check schedule
///
/// Intervals under an hour fire every N minutes. Longer intervals fire at
/// the top of every Nth hour of the day. When N does not divide 24 the
/// firings stay on fixed clock hours (e.g. 5h fires at 00, 05, 10, 15, 20),
/// so the gap across midnight is shorter than N.
#[derive(Clone)]
pub struct CheckSchedule {
    interval_minutes: u32,
    expression: String,
    schedule: Schedule,
}

impl CheckSchedule {
    /// Schedule for a polling interval in whole hours
    pub fn from_interval_hours(hours: u32) -> Result<Self> {
        Self::from_interval_minutes(hours.saturating_mul(60))
    }

    /// Schedule for a polling interval in minutes
    pub fn from_interval_minutes(minutes: u32) -> Result<Self> {
        if minutes == 0 || minutes > MAX_INTERVAL_MINUTES {
            return Err(Error::Schedule(format!(
                "interval must be between 1 and {MAX_INTERVAL_MINUTES} minutes, got {minutes}"
            )));
        }

        let expression = if minutes < 60 {
            format!("*/{minutes} * * * *")
        } else {
            match minutes / 60 {
                24 => "0 0 * * *".to_string(),
                hours => format!("0 */{hours} * * *"),
            }
        };

        // The cron crate wants a leading seconds field
        let schedule = Schedule::from_str(&format!("0 {expression}"))
            .map_err(|e| Error::Schedule(format!("invalid cron expression '{expression}': {e}")))?;

        Ok(Self {
            interval_minutes: minutes,
            expression,
            schedule,
        })
    }

    /// Five-field cron expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Configured interval in minutes
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    /// Whether firings are evenly spaced over a day
    pub fn is_exact(&self) -> bool {
        if self.interval_minutes < 60 {
            60 % self.interval_minutes == 0
        } else {
            24 % (self.interval_minutes / 60) == 0
        }
    }

    /// First firing strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

impl fmt::Debug for CheckSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckSchedule")
            .field("interval_minutes", &self.interval_minutes)
            .field("expression", &self.expression)
            .finish()
    }
}
