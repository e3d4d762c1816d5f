use analysis_core::{AnalysisError, AssetType, PriceSeries, RiskParameters, TradeReport};
use risk_manager::{PositionSizer, SizingConfig};
use technical_analysis::{classify_annotated, EngineConfig, IndicatorEngine};

use crate::policy;

/// Engine → classifier → sizing → policy over an already normalized series.
///
/// Holds no state between calls, so one analyzer can serve any number of
/// requests.
#[derive(Debug, Clone, Default)]
pub struct TradeAnalyzer {
    engine: IndicatorEngine,
    sizer: PositionSizer,
}

impl TradeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(engine: EngineConfig, sizing: SizingConfig) -> Self {
        Self {
            engine: IndicatorEngine::with_config(engine),
            sizer: PositionSizer::with_config(sizing),
        }
    }

    pub fn engine_config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn sizing_config(&self) -> &SizingConfig {
        self.sizer.config()
    }

    pub fn analyze(
        &self,
        symbol: &str,
        asset_type: AssetType,
        series: &PriceSeries,
        params: &RiskParameters,
    ) -> Result<TradeReport, AnalysisError> {
        if series.is_empty() {
            return Err(AnalysisError::EmptySeries { symbol: symbol.to_string() });
        }

        let indicators = self.engine.compute(series)?;
        let latest = indicators.latest().ok_or(AnalysisError::InsufficientHistory {
            required: self.engine.config().min_history(),
            available: series.len(),
        })?;

        let price = latest.bar.close;
        let snapshot = latest.indicators;
        let signals = classify_annotated(latest);

        // Deep-value setups aim for the mean, everything else for the range top
        let target = if signals.is_mean_reversion_candidate {
            snapshot.ema200
        } else {
            snapshot.resistance20
        };
        let sizing = self.sizer.calculate(price, snapshot.atr14, target, params)?;
        let recommendation = policy::recommend(&signals, &snapshot, price, &sizing);

        tracing::info!(
            "{} at {:.2}: {} ({} warnings)",
            symbol,
            price,
            recommendation.action,
            recommendation.warnings.len()
        );

        Ok(TradeReport {
            symbol: symbol.to_string(),
            asset_type,
            as_of: latest.bar.timestamp,
            price,
            snapshot,
            signals,
            sizing,
            recommendation,
            fundamentals: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Action, PriceBar};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn params() -> RiskParameters {
        RiskParameters::new(10_000.0, 1.0).unwrap()
    }

    #[test]
    fn test_steady_uptrend() {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64 * 0.5).collect();
        let report = TradeAnalyzer::new()
            .analyze("ACME", AssetType::Stock, &series_from_closes(&closes), &params())
            .unwrap();

        assert_eq!(report.price, *closes.last().unwrap());
        assert_eq!(report.as_of, series_from_closes(&closes).last().unwrap().timestamp);
        assert!(report.signals.is_bullish_regime);
        // no losses in the window
        assert_eq!(report.snapshot.rsi14, 100.0);
        assert!(report.signals.is_overbought);
        // price never reaches the trailing high (close + 1)
        assert_eq!(report.recommendation.action, Action::Reduce);
        assert_relative_eq!(report.sizing.risk_amount, 100.0);
        assert!(report.fundamentals.is_none());
    }

    #[test]
    fn test_steady_downtrend() {
        let closes: Vec<f64> = (0..260).map(|i| 300.0 - i as f64 * 0.5).collect();
        let report = TradeAnalyzer::new()
            .analyze("ACME", AssetType::Stock, &series_from_closes(&closes), &params())
            .unwrap();

        assert!(!report.signals.is_bullish_regime);
        assert_eq!(report.snapshot.rsi14, 0.0);
        // the EMA lags about 21% above price
        assert!(report.signals.is_mean_reversion_candidate);
        assert_eq!(report.sizing.target_price, report.snapshot.ema200);
        assert_eq!(report.recommendation.action, Action::SpeculativeReversal);
    }

    #[test]
    fn test_empty_series() {
        let err = TradeAnalyzer::new()
            .analyze("ZZZZINVALID", AssetType::Stock, &PriceSeries::default(), &params())
            .unwrap_err();
        assert_eq!(err, AnalysisError::EmptySeries { symbol: "ZZZZINVALID".to_string() });
    }

    #[test]
    fn test_short_history() {
        let closes = vec![50.0; 120];
        let err = TradeAnalyzer::new()
            .analyze("ACME", AssetType::Stock, &series_from_closes(&closes), &params())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { required: 200, available: 120 }));
    }

    #[test]
    fn test_short_warmup_config() {
        let closes = vec![50.0; 120];
        let engine = EngineConfig { ema_warmup: 0, ..EngineConfig::default() };
        let report = TradeAnalyzer::with_config(engine, SizingConfig::default())
            .analyze("ACME", AssetType::Crypto, &series_from_closes(&closes), &params())
            .unwrap();
        assert_eq!(report.asset_type, AssetType::Crypto);
        assert_relative_eq!(report.snapshot.ema200, 50.0);
    }
}
