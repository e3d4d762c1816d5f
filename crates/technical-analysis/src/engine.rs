use analysis_core::{AnalysisError, AnnotatedBar, IndicatorSnapshot, PriceSeries};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Window lengths used by the indicator engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rsi_period: usize,
    pub ema_span: usize,
    pub atr_period: usize,
    pub range_window: usize,
    pub volume_window: usize,
    /// Bars of EMA history required before a row is usable. The EMA itself is
    /// defined from the first bar; 0 accepts it immediately.
    pub ema_warmup: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_span: 200,
            atr_period: 14,
            range_window: 20,
            volume_window: 20,
            ema_warmup: 200,
        }
    }
}

impl EngineConfig {
    /// Shortest series that yields at least one fully populated row
    pub fn min_history(&self) -> usize {
        [
            self.rsi_period + 1,
            self.atr_period,
            self.range_window,
            self.volume_window,
            self.ema_warmup,
            1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

/// Bars that carry a complete indicator snapshot, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    bars: Vec<AnnotatedBar>,
}

impl IndicatorSeries {
    pub fn bars(&self) -> &[AnnotatedBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&AnnotatedBar> {
        self.bars.last()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: EngineConfig,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Annotate every bar with its indicator snapshot and drop the warm-up prefix.
    pub fn compute(&self, series: &PriceSeries) -> Result<IndicatorSeries, AnalysisError> {
        let cfg = &self.config;
        let bars = series.bars();
        let closes = series.closes();

        let rsi_values = rsi(&closes, cfg.rsi_period);
        let ema_values = ema(&closes, cfg.ema_span);
        let atr_values = atr(bars, cfg.atr_period);
        let support_values = support(bars, cfg.range_window);
        let resistance_values = resistance(bars, cfg.range_window);
        let volume_ratios = volume_ratio(bars, cfg.volume_window);

        let annotated: Vec<AnnotatedBar> = bars
            .iter()
            .enumerate()
            .filter(|(i, _)| i + 1 >= cfg.ema_warmup)
            .filter_map(|(i, bar)| {
                Some(AnnotatedBar {
                    bar: *bar,
                    indicators: IndicatorSnapshot {
                        rsi14: rsi_values[i]?,
                        ema200: *ema_values.get(i)?,
                        atr14: atr_values[i]?,
                        support20: support_values[i]?,
                        resistance20: resistance_values[i]?,
                        volume_ratio20: volume_ratios[i]?,
                    },
                })
            })
            .collect();

        if annotated.is_empty() {
            return Err(AnalysisError::InsufficientHistory {
                required: cfg.min_history(),
                available: bars.len(),
            });
        }

        tracing::debug!(
            "Indicator engine kept {} of {} bars (warm-up {})",
            annotated.len(),
            bars.len(),
            bars.len() - annotated.len()
        );

        Ok(IndicatorSeries { bars: annotated })
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}
