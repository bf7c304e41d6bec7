//! A single fetch → evaluate → dispatch pass

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::alerting::{AlertDispatcher, ThresholdEvaluator};
use crate::fetcher::RateFetcher;
use crate::models::{CycleOutcome, DispatchOutcome, ThresholdDecision};

/// Everything one check cycle needs
pub struct CheckCycle {
    fetcher: Arc<dyn RateFetcher>,
    evaluator: ThresholdEvaluator,
    dispatcher: Arc<AlertDispatcher>,
}

impl CheckCycle {
    /// Create a new check cycle
    pub fn new(
        fetcher: Arc<dyn RateFetcher>,
        evaluator: ThresholdEvaluator,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            fetcher,
            evaluator,
            dispatcher,
        }
    }

    /// Run one cycle; every failure is logged and folded into the outcome
    pub async fn run(&self) -> CycleOutcome {
        let span = info_span!("check_cycle", cycle_id = %Uuid::new_v4());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> CycleOutcome {
        let Some(rate) = self.fetcher.fetch_current_rate().await else {
            warn!(source = self.fetcher.source(), "No rate data available, skipping check");
            return CycleOutcome::Skipped;
        };

        let thresholds = self.evaluator.thresholds();
        let (condition, message) = match self.evaluator.evaluate(&rate) {
            ThresholdDecision::NoAction => {
                info!(
                    pair = %rate.pair(),
                    rate = rate.conversion_rate(),
                    lower = thresholds.lower,
                    upper = thresholds.upper,
                    "Rate within range"
                );
                return CycleOutcome::WithinRange;
            }
            ThresholdDecision::Notify { condition, message } => (condition, message),
        };

        warn!(condition = %condition, %message, "Threshold breached");

        match self.dispatcher.dispatch(&rate, condition).await {
            Ok(DispatchOutcome::Sent { attempts }) => {
                info!(condition = %condition, attempts, "Alert sent");
                CycleOutcome::Sent
            }
            Ok(DispatchOutcome::Suppressed) => CycleOutcome::Suppressed,
            Err(e) => {
                error!(condition = %condition, error = %e, "Alert could not be delivered");
                CycleOutcome::DeliveryFailed
            }
        }
    }
}
