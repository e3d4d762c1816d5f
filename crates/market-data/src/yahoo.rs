use analysis_core::AnalysisError;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::http::{send_with_retry, HttpConfig};
use crate::normalize::ColumnarFrame;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Daily stock history from the Yahoo chart endpoint
#[derive(Clone)]
pub struct YahooChartClient {
    client: Client,
    config: HttpConfig,
    base_url: String,
    range: String,
}

impl YahooChartClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: config.build_client(),
            config,
            base_url: CHART_URL.to_string(),
            range: "2y".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lookback passed as Yahoo's `range` parameter (e.g. `1y`, `2y`, `5y`)
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// Fetch daily bars. An unknown symbol yields an empty frame.
    pub async fn daily_chart(&self, symbol: &str) -> Result<ColumnarFrame, AnalysisError> {
        let url = format!("{}/{}", self.base_url, symbol);

        let response = send_with_retry(
            &self.client,
            self.client.get(&url).query(&[
                ("range", self.range.as_str()),
                ("interval", "1d"),
                ("events", "div,splits"),
            ]),
            &self.config,
            "Yahoo",
            None,
        )
        .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if status.as_u16() == 404 {
            tracing::info!("Yahoo has no chart for {}", symbol);
            return Ok(ColumnarFrame::default());
        }
        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        parse_chart(&body)
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Map a chart payload to a columnar frame with Yahoo's own column names.
pub fn parse_chart(body: &str) -> Result<ColumnarFrame, AnalysisError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::InvalidData(format!("Yahoo chart: {}", e)))?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(ColumnarFrame::default());
        }
        return Err(AnalysisError::ApiError(format!(
            "Yahoo {}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(ColumnarFrame::default());
    };

    let timestamps = result
        .timestamp
        .iter()
        .map(|&ts| {
            DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| AnalysisError::InvalidData(format!("Invalid timestamp {}", ts)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let mut frame = ColumnarFrame::new(timestamps)
        .with_column(["Open"], quote.open)
        .with_column(["High"], quote.high)
        .with_column(["Low"], quote.low)
        .with_column(["Close"], quote.close)
        .with_column(["Volume"], quote.volume);

    if let Some(adj) = result.indicators.adjclose.into_iter().next() {
        frame = frame.with_column(["Adj Close"], adj.adjclose);
    }

    Ok(frame)
}
