pub mod coinbase;
pub mod http;
pub mod normalize;
pub mod polygon;
pub mod symbols;
pub mod yahoo;

pub use coinbase::CoinbaseClient;
pub use http::HttpConfig;
pub use normalize::{normalize, Column, ColumnarFrame, OhlcvRow, RawSeries};
pub use polygon::PolygonClient;
pub use symbols::{normalize_crypto_symbol, normalize_stock_symbol};
pub use yahoo::YahooChartClient;

use analysis_core::{AnalysisError, AssetType, BarSource, FetchedSeries};
use async_trait::async_trait;

/// Daily bars for stocks (Yahoo) and crypto pairs (Coinbase) behind one source
#[derive(Clone)]
pub struct MarketDataClient {
    yahoo: YahooChartClient,
    coinbase: CoinbaseClient,
    quote_currency: String,
}

impl MarketDataClient {
    pub fn new(config: HttpConfig, quote_currency: impl Into<String>) -> Self {
        Self {
            yahoo: YahooChartClient::new(config.clone()),
            coinbase: CoinbaseClient::new(config),
            quote_currency: quote_currency.into(),
        }
    }

    pub fn from_clients(yahoo: YahooChartClient, coinbase: CoinbaseClient, quote_currency: impl Into<String>) -> Self {
        Self {
            yahoo,
            coinbase,
            quote_currency: quote_currency.into(),
        }
    }

    pub fn quote_currency(&self) -> &str {
        &self.quote_currency
    }
}

#[async_trait]
impl BarSource for MarketDataClient {
    async fn fetch_daily(&self, symbol: &str, asset_type: AssetType) -> Result<FetchedSeries, AnalysisError> {
        let (symbol, raw) = match asset_type {
            AssetType::Stock => {
                let symbol = normalize_stock_symbol(symbol)?;
                let frame = self.yahoo.daily_chart(&symbol).await?;
                (symbol, RawSeries::Columnar(frame))
            }
            AssetType::Crypto => {
                let pair = normalize_crypto_symbol(symbol, &self.quote_currency)?;
                let rows = self.coinbase.daily_candles(&pair).await?;
                (pair, RawSeries::Rows(rows))
            }
        };

        tracing::info!("Fetched {} rows for {} ({})", raw.row_count(), symbol, asset_type);
        let series = normalize(&symbol, &raw)?;
        Ok(FetchedSeries { symbol, series })
    }
}
