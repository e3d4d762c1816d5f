use analysis_core::{AnalysisError, RiskParameters, SizingResult};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::models::SizingConfig;

/// Fixed-fractional position sizing with an ATR-based safety stop.
///
/// The dollar amount at risk is `balance * risk% / 100`; the position is sized so
/// that hitting the stop loses exactly that amount.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new() -> Self {
        Self::with_config(SizingConfig::default())
    }

    pub fn with_config(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Dollar amount put at risk, computed in decimal so round inputs stay exact.
    pub fn risk_amount(&self, params: &RiskParameters) -> f64 {
        let balance = params.account_balance();
        let percent = params.risk_percent();

        Decimal::from_f64(balance)
            .zip(Decimal::from_f64(percent))
            .and_then(|(b, p)| b.checked_mul(p))
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|v| v.to_f64())
            .unwrap_or(balance * percent / 100.0)
    }

    /// Size a long entry at `price` with a stop `stop_atr_multiple * atr` below it,
    /// aiming for `target_price`.
    pub fn calculate(
        &self,
        price: f64,
        atr: f64,
        target_price: f64,
        params: &RiskParameters,
    ) -> Result<SizingResult, AnalysisError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(AnalysisError::InvalidData(format!("entry price must be positive, got {}", price)));
        }
        if !atr.is_finite() || !target_price.is_finite() {
            return Err(AnalysisError::InvalidData("non-finite ATR or target price".to_string()));
        }

        let risk_amount = self.risk_amount(params);
        let stop_price = price - atr * self.config.stop_atr_multiple;

        let raw_distance = price - stop_price;
        let stop_degenerate = atr <= 0.0 || raw_distance <= 0.0;
        let stop_clamped = raw_distance < self.config.min_stop_distance;
        if stop_degenerate {
            if self.config.strict {
                return Err(AnalysisError::DegenerateStopDistance { stop_distance: raw_distance });
            }
            tracing::warn!(
                "Stop distance {:.6} from ATR {} is not positive, clamping to {}",
                raw_distance,
                atr,
                self.config.min_stop_distance
            );
        } else if stop_clamped {
            tracing::debug!(
                "Stop distance {:.6} below floor {}, widening",
                raw_distance,
                self.config.min_stop_distance
            );
        }
        let stop_distance = raw_distance.max(self.config.min_stop_distance);

        let position_size = risk_amount / stop_distance;
        let position_value = position_size * price;
        let potential_profit = position_size * (target_price - price);
        let target_pct = (target_price - price) / price * 100.0;
        let reward_risk_ratio = potential_profit / risk_amount;

        tracing::debug!(
            "Sized {:.4} units at {:.2}: stop {:.2}, target {:.2}, R/R {:.2}",
            position_size,
            price,
            stop_price,
            target_price,
            reward_risk_ratio
        );

        Ok(SizingResult {
            risk_amount,
            stop_price,
            stop_distance,
            stop_clamped,
            stop_degenerate,
            position_size,
            position_value,
            target_price,
            target_pct,
            potential_profit,
            reward_risk_ratio,
        })
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new()
    }
}
