//! Exchange-rate providers
//!
//! A [`RateFetcher`] never fails loudly: every transport, HTTP or parse
//! problem is logged and reported as "no data" so the caller can skip the
//! cycle.

mod exchangerate_api;

pub use exchangerate_api::ExchangeRateApiFetcher;

use crate::models::RateReading;

/// Source of current exchange rates
#[async_trait::async_trait]
pub trait RateFetcher: Send + Sync {
    /// Fetch the current rate, or `None` when no usable data could be obtained
    async fn fetch_current_rate(&self) -> Option<RateReading>;

    /// Provider name recorded on each reading
    fn source(&self) -> &str;
}
