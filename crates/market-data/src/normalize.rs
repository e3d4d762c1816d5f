//! Vendor payloads → canonical `PriceSeries`.
//!
//! Two raw shapes are accepted: a columnar frame (timestamp index plus named,
//! possibly multi-level columns, as chart APIs and dataframe exports produce) and
//! exchange-style OHLCV rows.

use analysis_core::{AnalysisError, PriceBar, PriceSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named column of a columnar frame. `name` holds every header level,
/// outermost first (e.g. `["Adj Close", "AAPL"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: Vec<String>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<Column>,
}

impl ColumnarFrame {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self { timestamps, columns: Vec::new() }
    }

    pub fn with_column<I, S>(mut self, name: I, values: Vec<Option<f64>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.push(Column {
            name: name.into_iter().map(Into::into).collect(),
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Exchange-style candle: millisecond epoch timestamp and OHLCV values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawSeries {
    Columnar(ColumnarFrame),
    Rows(Vec<OhlcvRow>),
}

impl RawSeries {
    pub fn row_count(&self) -> usize {
        match self {
            RawSeries::Columnar(frame) => frame.timestamps.len(),
            RawSeries::Rows(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

/// Collapse a (multi-level) header to its first level and match it loosely:
/// case, spaces and underscores are ignored.
fn field_of(name: &[String]) -> Option<Field> {
    let key: String = name
        .first()?
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match key.as_str() {
        "open" | "o" => Some(Field::Open),
        "high" | "h" => Some(Field::High),
        "low" | "l" => Some(Field::Low),
        "close" | "c" => Some(Field::Close),
        "adjclose" | "adjustedclose" => Some(Field::AdjClose),
        "volume" | "v" => Some(Field::Volume),
        _ => None,
    }
}

struct Fields<'a> {
    open: &'a [Option<f64>],
    high: &'a [Option<f64>],
    low: &'a [Option<f64>],
    close: Option<&'a [Option<f64>]>,
    adj_close: Option<&'a [Option<f64>]>,
    volume: &'a [Option<f64>],
}

fn column(frame: &ColumnarFrame, field: Field) -> Result<Option<&[Option<f64>]>, AnalysisError> {
    let rows = frame.timestamps.len();
    match frame.columns.iter().find(|c| field_of(&c.name) == Some(field)) {
        Some(column) if column.values.len() != rows => Err(AnalysisError::InvalidData(format!(
            "Column {:?} has {} values for {} timestamps",
            column.name,
            column.values.len(),
            rows
        ))),
        Some(column) => Ok(Some(column.values.as_slice())),
        None => Ok(None),
    }
}

fn required_column(frame: &ColumnarFrame, field: Field) -> Result<&[Option<f64>], AnalysisError> {
    column(frame, field)?.ok_or_else(|| AnalysisError::InvalidData(format!("Missing {:?} column", field)))
}

fn select_fields(frame: &ColumnarFrame) -> Result<Fields<'_>, AnalysisError> {
    let close = column(frame, Field::Close)?;
    let adj_close = column(frame, Field::AdjClose)?;
    if close.is_none() && adj_close.is_none() {
        return Err(AnalysisError::InvalidData("Missing Close column".to_string()));
    }

    Ok(Fields {
        open: required_column(frame, Field::Open)?,
        high: required_column(frame, Field::High)?,
        low: required_column(frame, Field::Low)?,
        close,
        adj_close,
        volume: required_column(frame, Field::Volume)?,
    })
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn frame_bars(frame: &ColumnarFrame) -> Result<Vec<PriceBar>, AnalysisError> {
    let fields = select_fields(frame)?;
    let mut bars = Vec::with_capacity(frame.timestamps.len());
    let mut skipped = 0usize;

    for (i, &timestamp) in frame.timestamps.iter().enumerate() {
        let raw_close = fields.close.and_then(|c| finite(c[i]));
        let adj_close = fields.adj_close.and_then(|c| finite(c[i]));

        // Adjusted close wins when the column exists. Open/high/low are scaled by the
        // same factor so the bar stays internally consistent.
        let (close, factor) = match (fields.adj_close.is_some(), adj_close, raw_close) {
            (true, Some(adj), Some(raw)) if raw > 0.0 => (Some(adj), adj / raw),
            (true, adj, _) => (adj, 1.0),
            (false, _, raw) => (raw, 1.0),
        };

        let values = (
            finite(fields.open[i]),
            finite(fields.high[i]),
            finite(fields.low[i]),
            close,
            finite(fields.volume[i]),
        );
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = values else {
            skipped += 1;
            continue;
        };

        let (open, high, low) = if factor == 1.0 {
            (open, high, low)
        } else {
            let open = open * factor;
            // Rescaling can move high/low by an ulp past open/close
            (open, (high * factor).max(open).max(close), (low * factor).min(open).min(close))
        };
        bars.push(PriceBar::new(timestamp, open, high, low, close, volume)?);
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} rows with missing values", skipped);
    }
    Ok(bars)
}

fn row_bars(rows: &[OhlcvRow]) -> Result<Vec<PriceBar>, AnalysisError> {
    let mut bars = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        let values = [row.open, row.high, row.low, row.close, row.volume];
        if values.iter().any(|v| !v.is_finite()) {
            skipped += 1;
            continue;
        }
        let timestamp = DateTime::from_timestamp_millis(row.timestamp_ms).ok_or_else(|| {
            AnalysisError::InvalidData(format!("Invalid timestamp {}", row.timestamp_ms))
        })?;
        bars.push(PriceBar::new(timestamp, row.open, row.high, row.low, row.close, row.volume)?);
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} candles with non-finite values", skipped);
    }
    Ok(bars)
}

/// Normalize a vendor series into ascending, de-duplicated daily bars.
///
/// Fails with `EmptySeries` when nothing usable is left, and with `InvalidData`
/// when the payload is malformed or a bar breaks the OHLC invariants.
pub fn normalize(symbol: &str, raw: &RawSeries) -> Result<PriceSeries, AnalysisError> {
    if raw.row_count() == 0 {
        return Err(AnalysisError::EmptySeries { symbol: symbol.to_string() });
    }

    let mut bars = match raw {
        RawSeries::Columnar(frame) => frame_bars(frame)?,
        RawSeries::Rows(rows) => row_bars(rows)?,
    };

    // Stable sort, then keep the last bar seen for each timestamp
    bars.sort_by_key(|b| b.timestamp);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => deduped.push(bar),
        }
    }

    if deduped.is_empty() {
        return Err(AnalysisError::EmptySeries { symbol: symbol.to_string() });
    }

    tracing::debug!("Normalized {} bars for {}", deduped.len(), symbol);
    PriceSeries::new(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn frame() -> ColumnarFrame {
        ColumnarFrame::new(vec![day(0), day(1), day(2)])
            .with_column(["Open"], col(&[10.0, 11.0, 12.0]))
            .with_column(["High"], col(&[11.0, 12.5, 13.0]))
            .with_column(["Low"], col(&[9.5, 10.5, 11.5]))
            .with_column(["Close"], col(&[10.5, 12.0, 12.5]))
            .with_column(["Volume"], col(&[100.0, 200.0, 300.0]))
    }

    #[test]
    fn test_columnar_uses_raw_close_without_adjusted() {
        let series = normalize("ACME", &RawSeries::Columnar(frame())).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.5, 12.0, 12.5]);
        assert_eq!(series.bars()[1].volume, 200.0);
    }

    #[test]
    fn test_adjusted_close_preferred_and_bar_rescaled() {
        let frame = frame().with_column(["Adj Close"], col(&[5.25, 6.0, 6.25]));
        let series = normalize("ACME", &RawSeries::Columnar(frame)).unwrap();

        assert_eq!(series.closes(), vec![5.25, 6.0, 6.25]);
        let first = series.bars()[0];
        assert!((first.high - 5.5).abs() < 1e-12);
        assert!((first.low - 4.75).abs() < 1e-12);
        assert!((first.open - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_multi_level_headers_collapse() {
        let ts = vec![day(0), day(1)];
        let frame = ColumnarFrame::new(ts)
            .with_column(["open", "AAPL"], col(&[10.0, 11.0]))
            .with_column(["HIGH", "AAPL"], col(&[11.0, 12.0]))
            .with_column(["Low", "AAPL"], col(&[9.0, 10.0]))
            .with_column(["Close", "AAPL"], col(&[10.0, 11.0]))
            .with_column(["adj_close", "AAPL"], col(&[10.0, 11.0]))
            .with_column(["Volume", "AAPL"], col(&[1.0, 2.0]))
            .with_column(["Dividends", "AAPL"], col(&[0.0, 0.0]));
        let series = normalize("AAPL", &RawSeries::Columnar(frame)).unwrap();
        assert_eq!(series.closes(), vec![10.0, 11.0]);
    }

    #[test]
    fn test_rows_sorted_ascending_and_deduplicated() {
        let row = |t: i64, close: f64| OhlcvRow {
            timestamp_ms: day(t).timestamp_millis(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        };
        let raw = RawSeries::Rows(vec![row(2, 30.0), row(0, 10.0), row(1, 20.0), row(2, 31.0)]);
        let series = normalize("BTC/USD", &raw).unwrap();

        assert_eq!(series.closes(), vec![10.0, 20.0, 31.0]);
        assert!(series.bars().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_empty_source_is_empty_series() {
        let err = normalize("ZZZZINVALID", &RawSeries::Columnar(ColumnarFrame::default())).unwrap_err();
        assert_eq!(err, AnalysisError::EmptySeries { symbol: "ZZZZINVALID".to_string() });

        let err = normalize("ZZZZ/USD", &RawSeries::Rows(vec![])).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptySeries { .. }));
    }

    #[test]
    fn test_all_null_rows_is_empty_series() {
        let frame = ColumnarFrame::new(vec![day(0)])
            .with_column(["Open"], vec![None])
            .with_column(["High"], vec![None])
            .with_column(["Low"], vec![None])
            .with_column(["Close"], vec![None])
            .with_column(["Volume"], vec![None]);
        assert!(matches!(
            normalize("ACME", &RawSeries::Columnar(frame)),
            Err(AnalysisError::EmptySeries { .. })
        ));
    }

    #[test]
    fn test_null_rows_skipped() {
        let mut f = frame();
        f.columns[3].values[1] = None;
        let series = normalize("ACME", &RawSeries::Columnar(f)).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_missing_column_is_invalid() {
        let mut f = frame();
        f.columns.retain(|c| c.name[0] != "Volume");
        assert!(matches!(
            normalize("ACME", &RawSeries::Columnar(f)),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_column_length_mismatch_is_invalid() {
        let mut f = frame();
        f.columns[0].values.pop();
        assert!(normalize("ACME", &RawSeries::Columnar(f)).is_err());
    }

    #[test]
    fn test_inconsistent_bar_is_invalid() {
        let mut f = frame();
        f.columns[1].values[0] = Some(8.0); // high below low
        assert!(matches!(
            normalize("ACME", &RawSeries::Columnar(f)),
            Err(AnalysisError::InvalidData(_))
        ));
    }
}
