//! Check-cycle scheduling
//!
//! The orchestrator runs one check as soon as it starts, then one per
//! firing of a cron schedule derived from the polling interval. Cycles run
//! one after another on a single background task; a failing or panicking
//! cycle is logged and the schedule carries on.

mod cycle;
mod schedule;

pub use cycle::CheckCycle;
pub use schedule::CheckSchedule;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::POLLING_INTERVAL_RANGE;
use crate::error::{Error, Result};
use crate::models::CycleOutcome;

enum RunState {
    Stopped,
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
}

/// Drives check cycles on the configured schedule
pub struct CheckCycleOrchestrator {
    cycle: Arc<CheckCycle>,
    schedule: CheckSchedule,
    clock: Arc<dyn Clock>,
    state: Mutex<RunState>,
}

impl CheckCycleOrchestrator {
    /// Create an orchestrator; fails when the interval is outside 1-24 hours
    pub fn new(
        polling_interval_hours: u32,
        cycle: CheckCycle,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !POLLING_INTERVAL_RANGE.contains(&polling_interval_hours) {
            return Err(Error::config(format!(
                "polling interval must be between 1 and 24 hours, got {polling_interval_hours}"
            )));
        }

        let schedule = CheckSchedule::from_interval_hours(polling_interval_hours)?;
        if !schedule.is_exact() {
            warn!(
                interval_hours = polling_interval_hours,
                cron = schedule.expression(),
                "Interval does not divide 24; checks fire at fixed clock hours"
            );
        }

        Ok(Self {
            cycle: Arc::new(cycle),
            schedule,
            clock,
            state: Mutex::new(RunState::Stopped),
        })
    }

    /// Derived check schedule
    pub fn schedule(&self) -> &CheckSchedule {
        &self.schedule
    }

    /// Whether the recurring schedule is active
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), RunState::Running { .. })
    }

    /// Run one check cycle now, outside the schedule
    pub async fn execute_check(&self) -> CycleOutcome {
        run_isolated(self.cycle.clone()).await
    }

    /// Start monitoring: one immediate check, then the recurring schedule
    ///
    /// Returns once the immediate check has finished. Both run on the
    /// monitor task, so dropping this future does not cancel the check.
    /// Does nothing if already running.
    pub async fn start(&self) {
        let startup_done = {
            let mut state = self.state.lock();
            if let RunState::Running { .. } = *state {
                info!("Orchestrator already running");
                return;
            }

            info!(
                cron = self.schedule.expression(),
                interval_minutes = self.schedule.interval_minutes(),
                "Starting rate monitor"
            );

            let cancel = CancellationToken::new();
            let (done_tx, done_rx) = oneshot::channel();
            let task = tokio::spawn(run_monitor(
                self.cycle.clone(),
                self.schedule.clone(),
                self.clock.clone(),
                cancel.clone(),
                done_tx,
            ));
            *state = RunState::Running { cancel, task };
            done_rx
        };

        if startup_done.await.is_err() {
            warn!("Monitor task exited before the startup check completed");
        }
    }

    /// Stop scheduling further checks
    ///
    /// A cycle already in progress, including the startup check and any
    /// retry backoff, is left to finish; await the returned handle to wait
    /// for it. Does nothing if already stopped.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let previous = std::mem::replace(&mut *self.state.lock(), RunState::Stopped);
        match previous {
            RunState::Stopped => {
                info!("Orchestrator already stopped");
                None
            }
            RunState::Running { cancel, task } => {
                cancel.cancel();
                info!("Rate monitor stopped");
                Some(task)
            }
        }
    }
}

/// Run a cycle on its own task so a panic cannot take down the caller
async fn run_isolated(cycle: Arc<CheckCycle>) -> CycleOutcome {
    match tokio::spawn(async move { cycle.run().await }).await {
        Ok(outcome) => {
            debug!(outcome = %outcome, "Check cycle finished");
            outcome
        }
        Err(e) => {
            error!(error = %e, "Check cycle aborted");
            CycleOutcome::Aborted
        }
    }
}

async fn run_monitor(
    cycle: Arc<CheckCycle>,
    schedule: CheckSchedule,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    startup_done: oneshot::Sender<()>,
) {
    run_isolated(cycle.clone()).await;
    // start() may have been dropped
    let _ = startup_done.send(());

    if cancel.is_cancelled() {
        debug!("Stopped during startup check; not scheduling");
        return;
    }

    run_schedule(cycle, schedule, clock, cancel).await;
}

async fn run_schedule(
    cycle: Arc<CheckCycle>,
    schedule: CheckSchedule,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) {
    let mut last_firing: Option<DateTime<Utc>> = None;

    loop {
        let now = clock.now();
        // Never before the last firing, even if the wall clock stepped back
        let from = last_firing.map_or(now, |last| last.max(now));
        let Some(next) = schedule.next_after(from) else {
            error!(cron = schedule.expression(), "Schedule has no upcoming firing");
            break;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(next_run = %next, wait_secs = wait.as_secs(), "Next check scheduled");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }

        last_firing = Some(next);
        run_isolated(cycle.clone()).await;
    }

    debug!("Schedule loop exited");
}
