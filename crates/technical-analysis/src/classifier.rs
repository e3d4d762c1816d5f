use analysis_core::{AnnotatedBar, IndicatorSnapshot, PriceBar, Signals};

pub const MEAN_REVERSION_EMA_DISTANCE_PCT: f64 = -20.0;
pub const OVERSOLD_RSI: f64 = 30.0;
pub const OVERBOUGHT_RSI: f64 = 70.0;
pub const CONSOLIDATION_WIDTH_PCT: f64 = 5.0;
pub const VOLUME_SURGE_RATIO: f64 = 1.5;

/// Percent distance of `price` from the 200 EMA; 0 when the EMA is not positive.
pub fn ema_distance_pct(price: f64, ema200: f64) -> f64 {
    if ema200 > 0.0 {
        (price - ema200) / ema200 * 100.0
    } else {
        0.0
    }
}

/// Width of the support/resistance band relative to support.
/// A non-positive support makes the band unbounded.
pub fn range_width_pct(support20: f64, resistance20: f64) -> f64 {
    if support20 > 0.0 {
        (resistance20 - support20) / support20 * 100.0
    } else {
        f64::INFINITY
    }
}

/// Derive the regime, structure, momentum and volume flags for one bar.
pub fn classify(bar: &PriceBar, snapshot: &IndicatorSnapshot) -> Signals {
    let ema_distance = ema_distance_pct(bar.close, snapshot.ema200);
    let range_width = range_width_pct(snapshot.support20, snapshot.resistance20);
    let is_oversold = snapshot.rsi14 < OVERSOLD_RSI;

    Signals {
        ema_distance_pct: ema_distance,
        range_width_pct: range_width,
        is_bullish_regime: bar.close > snapshot.ema200,
        is_mean_reversion_candidate: ema_distance < MEAN_REVERSION_EMA_DISTANCE_PCT && is_oversold,
        is_consolidating: range_width < CONSOLIDATION_WIDTH_PCT,
        is_overbought: snapshot.rsi14 > OVERBOUGHT_RSI,
        is_oversold,
        is_volume_surge: snapshot.volume_ratio20 > VOLUME_SURGE_RATIO,
    }
}

pub fn classify_annotated(annotated: &AnnotatedBar) -> Signals {
    classify(&annotated.bar, &annotated.indicators)
}
