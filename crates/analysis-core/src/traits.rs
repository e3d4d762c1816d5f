use async_trait::async_trait;
use crate::{AnalysisError, AssetType, Financials, PriceSeries};

/// A normalized series together with the symbol it was finally fetched under
/// (crypto symbols gain a quote currency on the way).
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub symbol: String,
    pub series: PriceSeries,
}

/// Trait for daily price history providers
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Fetch and normalize recent daily bars. Implementations must return
    /// `AnalysisError::EmptySeries` when the vendor has no rows for the symbol.
    async fn fetch_daily(&self, symbol: &str, asset_type: AssetType) -> Result<FetchedSeries, AnalysisError>;
}

/// Trait for company filings providers
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    /// Latest reported period for a stock ticker, or `None` when the provider
    /// has nothing for it.
    async fn latest_financials(&self, symbol: &str) -> Result<Option<Financials>, AnalysisError>;
}
