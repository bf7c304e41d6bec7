//! ExchangeRate-API v6 client (`/pair/{base}/{target}` endpoint)

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::RateReading;

use super::RateFetcher;

const SOURCE: &str = "exchangerate-api";

/// Pair conversion response body
#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    target_code: Option<String>,
    #[serde(default)]
    conversion_rate: Option<f64>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

/// Fetches one currency pair from ExchangeRate-API
pub struct ExchangeRateApiFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    base_currency: String,
    target_currency: String,
    clock: Arc<dyn Clock>,
}

impl ExchangeRateApiFetcher {
    /// Create a fetcher with the configured request timeout
    pub fn new(config: &ApiConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("ratewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            base_currency: config.base_currency.clone(),
            target_currency: config.target_currency.clone(),
            clock,
        })
    }

    fn pair_url(&self) -> String {
        format!(
            "{}/{}/pair/{}/{}",
            self.base_url, self.api_key, self.base_currency, self.target_currency
        )
    }

    fn pair(&self) -> String {
        format!("{}/{}", self.base_currency, self.target_currency)
    }

    fn parse(&self, body: PairResponse) -> Option<RateReading> {
        if body.result != "success" {
            warn!(
                pair = %self.pair(),
                result = %body.result,
                error_type = body.error_type.as_deref().unwrap_or("unknown"),
                "Rate provider returned an error"
            );
            return None;
        }

        let Some(rate) = body.conversion_rate else {
            warn!(pair = %self.pair(), "Rate provider response has no conversion_rate");
            return None;
        };

        let base = body.base_code.unwrap_or_else(|| self.base_currency.clone());
        let target = body.target_code.unwrap_or_else(|| self.target_currency.clone());

        match RateReading::new(base, target, rate, self.clock.now(), SOURCE) {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!(pair = %self.pair(), error = %e, "Rejected rate from provider");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl RateFetcher for ExchangeRateApiFetcher {
    async fn fetch_current_rate(&self) -> Option<RateReading> {
        debug!(pair = %self.pair(), "Fetching exchange rate");

        let response = match self.client.get(self.pair_url()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    pair = %self.pair(),
                    timeout = e.is_timeout(),
                    // without_url keeps the API key out of the logs
                    error = %e.without_url(),
                    "Rate request failed"
                );
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(pair = %self.pair(), status = %status, "Rate provider returned non-success status");
            return None;
        }

        let body: PairResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(pair = %self.pair(), error = %e.without_url(), "Malformed rate response");
                return None;
            }
        };

        let reading = self.parse(body)?;
        info!(
            pair = %reading.pair(),
            rate = reading.conversion_rate(),
            "Fetched exchange rate"
        );
        Some(reading)
    }

    fn source(&self) -> &str {
        SOURCE
    }
}
