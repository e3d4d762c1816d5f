use analysis_core::AnalysisError;
use reqwest::Client;

use crate::http::{send_with_retry, HttpConfig};
use crate::normalize::OhlcvRow;
use crate::symbols::product_id;

const BASE_URL: &str = "https://api.exchange.coinbase.com";
const DAY_SECS: u32 = 86_400;
const DEFAULT_LIMIT: usize = 250;

/// Daily crypto candles from the Coinbase Exchange public API
#[derive(Clone)]
pub struct CoinbaseClient {
    client: Client,
    config: HttpConfig,
    base_url: String,
    limit: usize,
}

impl CoinbaseClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: config.build_client(),
            config,
            base_url: BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Number of most recent candles kept (the endpoint returns at most 300)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fetch daily candles for a `BASE/QUOTE` pair. An unknown product yields no rows.
    pub async fn daily_candles(&self, pair: &str) -> Result<Vec<OhlcvRow>, AnalysisError> {
        let url = format!("{}/products/{}/candles", self.base_url, product_id(pair));

        let response = send_with_retry(
            &self.client,
            self.client.get(&url).query(&[("granularity", DAY_SECS)]),
            &self.config,
            "Coinbase",
            None,
        )
        .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if status.as_u16() == 404 {
            tracing::info!("Coinbase has no product {}", pair);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        parse_candles(&body, self.limit)
    }
}

impl Default for CoinbaseClient {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

/// Candles arrive newest first as `[time, low, high, open, close, volume]`
/// with `time` in epoch seconds. Keeps the `limit` most recent.
pub fn parse_candles(body: &str, limit: usize) -> Result<Vec<OhlcvRow>, AnalysisError> {
    let raw: Vec<[f64; 6]> =
        serde_json::from_str(body).map_err(|e| AnalysisError::InvalidData(format!("Coinbase candles: {}", e)))?;

    let mut rows: Vec<OhlcvRow> = raw
        .into_iter()
        .map(|[time, low, high, open, close, volume]| OhlcvRow {
            timestamp_ms: (time as i64) * 1000,
            open,
            high,
            low,
            close,
            volume,
        })
        .collect();

    rows.sort_by_key(|r| std::cmp::Reverse(r.timestamp_ms));
    rows.truncate(limit);
    Ok(rows)
}
