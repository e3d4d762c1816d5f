use analysis_core::{AnalysisError, Financials, FundamentalsSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::http::{send_with_retry, HttpConfig, RateLimiter};

const BASE_URL: &str = "https://api.polygon.io";

/// Company financials from Polygon's filings endpoint
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    config: HttpConfig,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// `rate_limit` is requests per minute; the free tier allows 5.
    pub fn new(api_key: String, rate_limit: usize, config: HttpConfig) -> Self {
        Self {
            api_key,
            client: config.build_client(),
            config,
            base_url: BASE_URL.to_string(),
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Get company financials, most recent filing first
    pub async fn get_financials(&self, symbol: &str, limit: u32) -> Result<Vec<Financials>, AnalysisError> {
        let url = format!("{}/vX/reference/financials", self.base_url);

        let response = send_with_retry(
            &self.client,
            self.client.get(&url).query(&[
                ("ticker", symbol),
                ("timeframe", "quarterly"),
                ("order", "desc"),
                ("sort", "filing_date"),
                ("limit", &limit.to_string()),
                ("apiKey", &self.api_key),
            ]),
            &self.config,
            "Polygon",
            Some(&self.rate_limiter),
        )
        .await?;

        if !response.status().is_success() {
            // Plans without filings access answer 401/403; treat as no data
            if response.status().as_u16() == 403 || response.status().as_u16() == 401 {
                return Ok(Vec::new());
            }
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        parse_financials(symbol, &body)
    }
}

#[async_trait]
impl FundamentalsSource for PolygonClient {
    async fn latest_financials(&self, symbol: &str) -> Result<Option<Financials>, AnalysisError> {
        Ok(self.get_financials(symbol, 1).await?.into_iter().next())
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialResult>,
}

#[derive(Debug, Deserialize)]
struct FinancialResult {
    #[serde(default)]
    fiscal_period: String,
    #[serde(default)]
    fiscal_year: String,
    financials: FinancialStatements,
}

#[derive(Debug, Deserialize)]
struct FinancialStatements {
    #[serde(default)]
    income_statement: HashMap<String, serde_json::Value>,
}

fn statement_value(statement: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
    statement.get(key).and_then(|v| v.get("value")).and_then(|v| v.as_f64())
}

pub fn parse_financials(symbol: &str, body: &str) -> Result<Vec<Financials>, AnalysisError> {
    let fin_response: FinancialsResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidData(format!("Polygon financials: {}", e)))?;

    Ok(fin_response
        .results
        .into_iter()
        .map(|r| {
            let income = r.financials.income_statement;
            Financials {
                symbol: symbol.to_string(),
                fiscal_period: r.fiscal_period,
                fiscal_year: r.fiscal_year.parse().unwrap_or(0),
                revenue: statement_value(&income, "revenues"),
                gross_profit: statement_value(&income, "gross_profit"),
                operating_income: statement_value(&income, "operating_income_loss"),
                net_income: statement_value(&income, "net_income_loss"),
            }
        })
        .collect())
}
