use analysis_core::PriceBar;
use std::collections::VecDeque;

/// Simple Moving Average, aligned with the input (`None` until the window fills)
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 {
        return result;
    }

    let mut sum = 0.0;
    for (i, &value) in data.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= data[i - period];
        }
        if i + 1 >= period {
            result[i] = Some(sum / period as f64);
        }
    }
    result
}

/// Exponential Moving Average with `alpha = 2 / (span + 1)`, seeded by the first value.
/// Defined for every input element.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || data.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    let mut prev = data[0];
    result.push(prev);

    for &value in &data[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        result.push(prev);
    }

    result
}

/// Relative Strength Index from simple (not Wilder-smoothed) averages of gains and
/// losses over the trailing `period` price changes.
///
/// A window with no losses reads 100, a window with no movement at all reads 50.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    let mut gains = vec![0.0; closes.len()];
    let mut losses = vec![0.0; closes.len()];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    // Non-zero counts keep the zero-loss check exact despite running-sum drift
    let mut gain_count = 0usize;
    let mut loss_count = 0usize;

    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
            gain_sum += change;
            gain_count += 1;
        } else if change < 0.0 {
            losses[i] = -change;
            loss_sum -= change;
            loss_count += 1;
        }

        if i > period {
            let old = i - period;
            if gains[old] > 0.0 {
                gain_sum -= gains[old];
                gain_count -= 1;
            }
            if losses[old] > 0.0 {
                loss_sum -= losses[old];
                loss_count -= 1;
            }
        }

        if i >= period {
            let avg_gain = if gain_count == 0 { 0.0 } else { gain_sum.max(0.0) / period as f64 };
            let avg_loss = if loss_count == 0 { 0.0 } else { loss_sum.max(0.0) / period as f64 };

            let value = if loss_count == 0 {
                if gain_count == 0 { 50.0 } else { 100.0 }
            } else {
                100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
            };
            result[i] = Some(value.clamp(0.0, 100.0));
        }
    }

    result
}

/// True Range per bar. The first bar has no previous close and uses `high - low`.
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let high_low = bar.high - bar.low;
            if i == 0 {
                return high_low;
            }
            let prev_close = bars[i - 1].close;
            let high_close = (bar.high - prev_close).abs();
            let low_close = (bar.low - prev_close).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect()
}

/// Average True Range as a simple trailing mean of true range.
///
/// Never negative, and exactly 0 when every true range in the window is 0.
pub fn atr(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let ranges = true_range(bars);
    let mut result = vec![None; ranges.len()];
    if period == 0 {
        return result;
    }

    let mut sum = 0.0;
    // Running-sum drift would otherwise leave a residue once the window goes flat
    let mut nonzero = 0usize;
    for (i, &range) in ranges.iter().enumerate() {
        sum += range;
        if range != 0.0 {
            nonzero += 1;
        }
        if i >= period {
            let old = ranges[i - period];
            sum -= old;
            if old != 0.0 {
                nonzero -= 1;
            }
        }
        if i + 1 >= period {
            let mean = if nonzero == 0 { 0.0 } else { (sum / period as f64).max(0.0) };
            result[i] = Some(mean);
        }
    }
    result
}

fn rolling_extreme(data: &[f64], period: usize, keep: fn(f64, f64) -> bool) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 {
        return result;
    }

    // Indices whose values are monotonic under `keep`; the front is the window extreme
    let mut window: VecDeque<usize> = VecDeque::with_capacity(period);
    for (i, &value) in data.iter().enumerate() {
        while let Some(&back) = window.back() {
            if keep(value, data[back]) {
                window.pop_back();
            } else {
                break;
            }
        }
        window.push_back(i);

        while let Some(&front) = window.front() {
            if front + period <= i {
                window.pop_front();
            } else {
                break;
            }
        }

        if i + 1 >= period {
            result[i] = window.front().map(|&idx| data[idx]);
        }
    }
    result
}

/// Trailing minimum including the current element
pub fn rolling_min(data: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_extreme(data, period, |new, old| new <= old)
}

/// Trailing maximum including the current element
pub fn rolling_max(data: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_extreme(data, period, |new, old| new >= old)
}

/// Support level: trailing minimum low
pub fn support(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    rolling_min(&lows, period)
}

/// Resistance level: trailing maximum high
pub fn resistance(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    rolling_max(&highs, period)
}

/// Current volume over the trailing average volume (window includes the current bar).
/// A zero average yields 0.
pub fn volume_ratio(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    sma(&volumes, period)
        .into_iter()
        .zip(&volumes)
        .map(|(avg, &volume)| {
            avg.map(|avg| if avg > 0.0 { volume / avg } else { 0.0 })
        })
        .collect()
}
