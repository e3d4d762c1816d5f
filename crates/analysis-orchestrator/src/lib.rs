use analysis_core::{
    AnalysisError, AssetType, BarSource, FetchedSeries, Financials, FundamentalHealth, FundamentalsSource,
    RiskParameters, TradeReport, WarningKind,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fundamental_analysis::FundamentalAnalysisEngine;
use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod policy;

pub use analyzer::TradeAnalyzer;
pub use policy::recommend;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// One report request as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub symbol: String,
    pub asset_type: AssetType,
    pub account_balance: f64,
    pub risk_percent: f64,
}

/// Fetch → analyze → (optionally) enrich with fundamentals.
pub struct ReportOrchestrator<S: BarSource> {
    source: S,
    analyzer: TradeAnalyzer,
    fundamental_analyzer: FundamentalAnalysisEngine,
    fundamentals_source: Option<Box<dyn FundamentalsSource>>,
    /// Fetched series per (symbol, asset type, UTC day); `None` when disabled
    series_cache: Option<DashMap<String, CacheEntry<FetchedSeries>>>,
}

impl<S: BarSource> ReportOrchestrator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            analyzer: TradeAnalyzer::new(),
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            fundamentals_source: None,
            series_cache: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: TradeAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Attach a filings provider; stock reports then carry a fundamentals signal
    pub fn with_fundamentals(mut self, source: Box<dyn FundamentalsSource>) -> Self {
        self.fundamentals_source = Some(source);
        self
    }

    /// Reuse fetched bars for repeat requests on the same UTC day
    pub fn with_cache(mut self) -> Self {
        self.series_cache = Some(DashMap::new());
        self
    }

    pub fn analyzer(&self) -> &TradeAnalyzer {
        &self.analyzer
    }

    pub async fn generate(&self, request: &ReportRequest) -> Result<TradeReport, AnalysisError> {
        let symbol = request.symbol.trim();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidSymbol("symbol must not be empty".to_string()));
        }
        let params = RiskParameters::new(request.account_balance, request.risk_percent)?;

        tracing::info!("Generating report for {} ({})", symbol, request.asset_type);

        let (fetched, financials) = tokio::join!(
            self.get_series(symbol, request.asset_type),
            self.get_financials(symbol, request.asset_type),
        );
        let fetched = fetched?;

        let mut report = self
            .analyzer
            .analyze(&fetched.symbol, request.asset_type, &fetched.series, &params)?;

        if let Some(assessment) = financials.as_ref().and_then(|f| self.fundamental_analyzer.assess(f)) {
            if assessment.health == FundamentalHealth::Weak {
                report.recommendation.warnings.insert(WarningKind::WeakFundamentals);
            }
            report.fundamentals = Some(assessment);
        }

        Ok(report)
    }

    async fn get_series(&self, symbol: &str, asset_type: AssetType) -> Result<FetchedSeries, AnalysisError> {
        let Some(cache) = &self.series_cache else {
            return self.source.fetch_daily(symbol, asset_type).await;
        };

        let today = Utc::now().date_naive();
        let cache_key = format!("{}:{}:{}", symbol.to_uppercase(), asset_type, today);
        if let Some(entry) = cache.get(&cache_key) {
            tracing::debug!("Cache hit for {} (cached {})", cache_key, entry.cached_at);
            return Ok(entry.data.clone());
        }

        let fetched = self.source.fetch_daily(symbol, asset_type).await?;

        cache.retain(|_, entry| entry.cached_at.date_naive() == today);
        cache.insert(cache_key, CacheEntry {
            data: fetched.clone(),
            cached_at: Utc::now(),
        });

        Ok(fetched)
    }

    /// Filings are best effort: failures are logged and the report goes out without them.
    async fn get_financials(&self, symbol: &str, asset_type: AssetType) -> Option<Financials> {
        if asset_type == AssetType::Crypto {
            return None;
        }
        let source = self.fundamentals_source.as_ref()?;

        match source.latest_financials(&symbol.to_uppercase()).await {
            Ok(financials) => financials,
            Err(e) => {
                tracing::warn!("Fundamentals lookup failed for {}: {}", symbol, e);
                None
            }
        }
    }
}
