use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// Asset class the price history is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" | "equity" => Ok(AssetType::Stock),
            "crypto" => Ok(AssetType::Crypto),
            other => Err(AnalysisError::InvalidData(format!("Unknown asset type: {}", other))),
        }
    }
}

/// OHLCV bar for one trading session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Build a bar, rejecting non-finite values, inverted ranges and negative volume.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, AnalysisError> {
        let bar = Self { timestamp, open, high, low, close, volume };
        bar.validate()?;
        Ok(bar)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData(format!(
                "Non-finite value in bar at {}",
                self.timestamp
            )));
        }
        if self.high < self.open.max(self.close).max(self.low)
            || self.low > self.open.min(self.close).min(self.high)
        {
            return Err(AnalysisError::InvalidData(format!(
                "Bar at {} violates low <= open/close <= high (o={}, h={}, l={}, c={})",
                self.timestamp, self.open, self.high, self.low, self.close
            )));
        }
        if self.volume < 0.0 {
            return Err(AnalysisError::InvalidData(format!(
                "Negative volume in bar at {}",
                self.timestamp
            )));
        }
        Ok(())
    }
}

/// Bars in strictly increasing timestamp order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        for bar in &bars {
            bar.validate()?;
        }
        if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(AnalysisError::InvalidData(format!(
                "Bars out of order or duplicated: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }
}

impl TryFrom<Vec<PriceBar>> for PriceSeries {
    type Error = AnalysisError;

    fn try_from(bars: Vec<PriceBar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<PriceBar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

/// Derived indicator values for one bar. Every field is populated; bars
/// without full history never get a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi14: f64,
    pub ema200: f64,
    pub atr14: f64,
    pub support20: f64,
    pub resistance20: f64,
    pub volume_ratio20: f64,
}

/// A bar together with its indicator snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBar {
    pub bar: PriceBar,
    pub indicators: IndicatorSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    Consolidation,
    WideRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumZone {
    Oversold,
    Neutral,
    Overbought,
}

/// Classifier output for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Percent distance of close from the 200 EMA
    pub ema_distance_pct: f64,
    /// Percent width of the 20-bar support/resistance band
    pub range_width_pct: f64,
    pub is_bullish_regime: bool,
    pub is_mean_reversion_candidate: bool,
    pub is_consolidating: bool,
    pub is_overbought: bool,
    pub is_oversold: bool,
    pub is_volume_surge: bool,
}

impl Signals {
    pub fn regime(&self) -> Regime {
        if self.is_bullish_regime {
            Regime::Bullish
        } else {
            Regime::Bearish
        }
    }

    pub fn structure(&self) -> Structure {
        if self.is_consolidating {
            Structure::Consolidation
        } else {
            Structure::WideRange
        }
    }

    pub fn momentum(&self) -> MomentumZone {
        if self.is_oversold {
            MomentumZone::Oversold
        } else if self.is_overbought {
            MomentumZone::Overbought
        } else {
            MomentumZone::Neutral
        }
    }
}

/// Account balance and percent of it put at risk on one trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRiskParameters")]
pub struct RiskParameters {
    account_balance: f64,
    risk_percent: f64,
}

#[derive(Deserialize)]
struct RawRiskParameters {
    account_balance: f64,
    risk_percent: f64,
}

impl TryFrom<RawRiskParameters> for RiskParameters {
    type Error = AnalysisError;

    fn try_from(raw: RawRiskParameters) -> Result<Self, Self::Error> {
        Self::new(raw.account_balance, raw.risk_percent)
    }
}

impl RiskParameters {
    pub fn new(account_balance: f64, risk_percent: f64) -> Result<Self, AnalysisError> {
        if !account_balance.is_finite() || account_balance <= 0.0 {
            return Err(AnalysisError::InvalidRiskParameters(format!(
                "account balance must be positive, got {}",
                account_balance
            )));
        }
        if !risk_percent.is_finite() || risk_percent <= 0.0 || risk_percent > 100.0 {
            return Err(AnalysisError::InvalidRiskParameters(format!(
                "risk percent must be in (0, 100], got {}",
                risk_percent
            )));
        }
        Ok(Self { account_balance, risk_percent })
    }

    pub fn account_balance(&self) -> f64 {
        self.account_balance
    }

    pub fn risk_percent(&self) -> f64 {
        self.risk_percent
    }
}

/// Position sizing for one trade idea
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    pub risk_amount: f64,
    pub stop_price: f64,
    pub stop_distance: f64,
    /// Set when the raw stop distance was below the minimum and the floor was used instead
    pub stop_clamped: bool,
    /// Set when the raw stop distance was zero or negative (zero or negative ATR)
    pub stop_degenerate: bool,
    pub position_size: f64,
    pub position_value: f64,
    pub target_price: f64,
    /// Percent move from entry to target
    pub target_pct: f64,
    pub potential_profit: f64,
    pub reward_risk_ratio: f64,
}

/// Directional bias of an action, used by renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    PullbackBuy,
    BreakoutBuy,
    Reduce,
    MonitorTrend,
    SpeculativeReversal,
    MonitorWashout,
    Avoid,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::PullbackBuy => "Buy: pullback in uptrend",
            Action::BreakoutBuy => "Buy: momentum breakout",
            Action::Reduce => "Reduce: overbought / profit-taking",
            Action::MonitorTrend => "Monitor: trend healthy",
            Action::SpeculativeReversal => "Speculative buy: deep-value reversal",
            Action::MonitorWashout => "Monitor: extreme washout",
            Action::Avoid => "Avoid: downtrend/weakness",
        }
    }

    pub fn bias(&self) -> Bias {
        match self {
            Action::PullbackBuy | Action::BreakoutBuy | Action::SpeculativeReversal => Bias::Bullish,
            Action::Reduce | Action::Avoid => Bias::Bearish,
            Action::MonitorTrend | Action::MonitorWashout => Bias::Neutral,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    Overextended,
    BlowOffTop,
    FloorForming,
    PoorRewardRisk,
    DegenerateStop,
    WeakFundamentals,
    StopFloored,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            WarningKind::Overextended => "danger: overextended",
            WarningKind::BlowOffTop => "caution: possible blow-off top",
            WarningKind::FloorForming => "opportunity: floor forming",
            WarningKind::PoorRewardRisk => "poor value: reward below risk",
            WarningKind::DegenerateStop => "data: zero or negative ATR, stop clamped",
            WarningKind::WeakFundamentals => "fundamentals: weak margins",
            WarningKind::StopFloored => "note: stop widened to minimum distance",
        }
    }

    pub fn bias(&self) -> Bias {
        match self {
            WarningKind::FloorForming => Bias::Bullish,
            WarningKind::StopFloored => Bias::Neutral,
            _ => Bias::Bearish,
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub warnings: BTreeSet<WarningKind>,
}

/// Company financials for one reporting period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub symbol: String,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
}

/// Revenue and margins (percent of revenue) derived from filings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub revenue: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundamentalHealth {
    Healthy,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsAssessment {
    pub figures: Fundamentals,
    pub health: FundamentalHealth,
}

/// Structured result handed to report renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    pub symbol: String,
    pub asset_type: AssetType,
    pub as_of: DateTime<Utc>,
    pub price: f64,
    pub snapshot: IndicatorSnapshot,
    pub signals: Signals,
    pub sizing: SizingResult,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub fundamentals: Option<FundamentalsAssessment>,
}
