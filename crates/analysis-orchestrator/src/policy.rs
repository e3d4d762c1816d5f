use analysis_core::{Action, IndicatorSnapshot, Recommendation, Signals, SizingResult, WarningKind};
use std::collections::BTreeSet;

pub const PULLBACK_RSI_LOW: f64 = 30.0;
pub const PULLBACK_RSI_HIGH: f64 = 45.0;
pub const PULLBACK_MIN_REWARD_RISK: f64 = 2.0;
pub const BREAKOUT_VOLUME_RATIO: f64 = 1.3;
pub const WASHOUT_RSI: f64 = 20.0;

pub const OVEREXTENDED_EMA_DISTANCE_PCT: f64 = 40.0;
pub const BLOW_OFF_VOLUME_RATIO: f64 = 2.0;
pub const BLOW_OFF_RSI: f64 = 60.0;

/// Pick the action for the latest bar. Rules are checked in order and the
/// first match wins.
pub fn decide_action(signals: &Signals, snapshot: &IndicatorSnapshot, price: f64, sizing: &SizingResult) -> Action {
    let rsi = snapshot.rsi14;

    if signals.is_bullish_regime {
        if rsi > PULLBACK_RSI_LOW && rsi < PULLBACK_RSI_HIGH && sizing.reward_risk_ratio >= PULLBACK_MIN_REWARD_RISK {
            Action::PullbackBuy
        } else if price >= snapshot.resistance20 && snapshot.volume_ratio20 > BREAKOUT_VOLUME_RATIO {
            Action::BreakoutBuy
        } else if signals.is_overbought {
            Action::Reduce
        } else {
            Action::MonitorTrend
        }
    } else if signals.is_mean_reversion_candidate {
        Action::SpeculativeReversal
    } else if rsi < WASHOUT_RSI {
        Action::MonitorWashout
    } else {
        Action::Avoid
    }
}

/// Warnings are independent of the action and of each other.
pub fn collect_warnings(signals: &Signals, snapshot: &IndicatorSnapshot, sizing: &SizingResult) -> BTreeSet<WarningKind> {
    let mut warnings = BTreeSet::new();

    if signals.ema_distance_pct > OVEREXTENDED_EMA_DISTANCE_PCT {
        warnings.insert(WarningKind::Overextended);
    }
    if snapshot.volume_ratio20 > BLOW_OFF_VOLUME_RATIO && snapshot.rsi14 > BLOW_OFF_RSI {
        warnings.insert(WarningKind::BlowOffTop);
    }
    if signals.is_oversold && signals.is_volume_surge {
        warnings.insert(WarningKind::FloorForming);
    }
    if sizing.potential_profit > 0.0 && sizing.potential_profit < sizing.risk_amount {
        warnings.insert(WarningKind::PoorRewardRisk);
    }
    if sizing.stop_degenerate {
        warnings.insert(WarningKind::DegenerateStop);
    } else if sizing.stop_clamped {
        warnings.insert(WarningKind::StopFloored);
    }

    warnings
}

pub fn recommend(signals: &Signals, snapshot: &IndicatorSnapshot, price: f64, sizing: &SizingResult) -> Recommendation {
    Recommendation {
        action: decide_action(signals, snapshot, price, sizing),
        warnings: collect_warnings(signals, snapshot, sizing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{PriceBar, RiskParameters};
    use chrono::Utc;
    use risk_manager::PositionSizer;
    use technical_analysis::classify;

    struct Case {
        bar: PriceBar,
        snapshot: IndicatorSnapshot,
    }

    impl Case {
        fn new(close: f64, ema200: f64, rsi14: f64, resistance20: f64, volume_ratio20: f64) -> Self {
            Self {
                bar: PriceBar {
                    timestamp: Utc::now(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000.0,
                },
                snapshot: IndicatorSnapshot {
                    rsi14,
                    ema200,
                    atr14: 2.0,
                    support20: close * 0.9,
                    resistance20,
                    volume_ratio20,
                },
            }
        }

        fn atr(mut self, atr14: f64) -> Self {
            self.snapshot.atr14 = atr14;
            self
        }

        fn run(&self) -> (Signals, SizingResult, Recommendation) {
            let signals = classify(&self.bar, &self.snapshot);
            let target = if signals.is_mean_reversion_candidate {
                self.snapshot.ema200
            } else {
                self.snapshot.resistance20
            };
            let params = RiskParameters::new(10_000.0, 1.0).unwrap();
            let sizing = PositionSizer::new()
                .calculate(self.bar.close, self.snapshot.atr14, target, &params)
                .unwrap();
            let rec = recommend(&signals, &self.snapshot, self.bar.close, &sizing);
            (signals, sizing, rec)
        }
    }

    #[test]
    fn test_pullback_needs_reward_risk() {
        // stop 96, target 105: R/R = 5 / 4
        let (signals, sizing, rec) = Case::new(100.0, 90.0, 40.0, 105.0, 1.4).run();
        assert!(signals.is_bullish_regime);
        assert_eq!(sizing.stop_price, 96.0);
        assert!(sizing.reward_risk_ratio < 2.0);
        assert_eq!(rec.action, Action::MonitorTrend);

        // target 110: R/R = 10 / 4
        let (_, sizing, rec) = Case::new(100.0, 90.0, 40.0, 110.0, 1.4).run();
        assert!(sizing.reward_risk_ratio >= 2.0);
        assert_eq!(rec.action, Action::PullbackBuy);
        assert_eq!(rec.action.label(), "Buy: pullback in uptrend");
        assert!(rec.warnings.is_empty());
    }

    #[test]
    fn test_deep_value_reversal() {
        let (signals, _, rec) = Case::new(50.0, 70.0, 25.0, 55.0, 1.0).run();
        assert!((signals.ema_distance_pct + 28.571).abs() < 1e-3);
        assert!(signals.is_mean_reversion_candidate);
        assert_eq!(rec.action.label(), "Speculative buy: deep-value reversal");
    }

    #[test]
    fn test_breakout_on_volume() {
        let (_, _, rec) = Case::new(106.0, 90.0, 60.0, 105.0, 1.31).run();
        assert_eq!(rec.action, Action::BreakoutBuy);

        let (_, _, rec) = Case::new(106.0, 90.0, 60.0, 105.0, 1.3).run();
        assert_eq!(rec.action, Action::MonitorTrend);
    }

    #[test]
    fn test_overbought_reduces() {
        let (_, _, rec) = Case::new(100.0, 90.0, 75.0, 120.0, 1.0).run();
        assert_eq!(rec.action, Action::Reduce);
    }

    #[test]
    fn test_bearish_branches() {
        // -10% from the EMA is not deep enough for a reversal
        let (_, _, rec) = Case::new(90.0, 100.0, 15.0, 95.0, 1.0).run();
        assert_eq!(rec.action, Action::MonitorWashout);

        let (_, _, rec) = Case::new(90.0, 100.0, 35.0, 95.0, 1.0).run();
        assert_eq!(rec.action, Action::Avoid);
        assert_eq!(rec.action.label(), "Avoid: downtrend/weakness");
    }

    #[test]
    fn test_price_at_ema_is_bearish() {
        let (signals, _, _) = Case::new(100.0, 100.0, 50.0, 105.0, 1.0).run();
        assert!(!signals.is_bullish_regime);
    }

    #[test]
    fn test_overextended_and_blow_off_warnings() {
        let (_, _, rec) = Case::new(150.0, 100.0, 65.0, 160.0, 2.5).run();
        assert!(rec.warnings.contains(&WarningKind::Overextended));
        assert!(rec.warnings.contains(&WarningKind::BlowOffTop));
    }

    #[test]
    fn test_floor_forming_warning() {
        let (_, _, rec) = Case::new(90.0, 100.0, 25.0, 95.0, 1.6).run();
        assert!(rec.warnings.contains(&WarningKind::FloorForming));

        // RSI of exactly 30 is not oversold
        let (_, _, rec) = Case::new(90.0, 100.0, 30.0, 95.0, 1.6).run();
        assert!(!rec.warnings.contains(&WarningKind::FloorForming));
    }

    #[test]
    fn test_poor_reward_risk_warning() {
        // stop distance 4, target +2: profit is half the risk
        let (_, sizing, rec) = Case::new(100.0, 90.0, 50.0, 102.0, 1.0).run();
        assert!(sizing.potential_profit > 0.0 && sizing.potential_profit < sizing.risk_amount);
        assert!(rec.warnings.contains(&WarningKind::PoorRewardRisk));

        // target below price: no profit, no warning
        let (_, _, rec) = Case::new(100.0, 90.0, 50.0, 99.0, 1.0).run();
        assert!(!rec.warnings.contains(&WarningKind::PoorRewardRisk));
    }

    #[test]
    fn test_zero_atr_flags_degenerate_stop() {
        let (_, sizing, rec) = Case::new(100.0, 90.0, 50.0, 105.0, 1.0).atr(0.0).run();
        assert!(sizing.stop_clamped && sizing.stop_degenerate);
        assert!(rec.warnings.contains(&WarningKind::DegenerateStop));
        assert!(!rec.warnings.contains(&WarningKind::StopFloored));
    }

    #[test]
    fn test_tiny_positive_atr_is_floored_not_degenerate() {
        // 2 x 0.004 = 0.008 is below the 0.01 floor but still a real stop
        let (_, sizing, rec) = Case::new(100.0, 90.0, 50.0, 105.0, 1.0).atr(0.004).run();
        assert!(sizing.stop_clamped && !sizing.stop_degenerate);
        assert!(rec.warnings.contains(&WarningKind::StopFloored));
        assert!(!rec.warnings.contains(&WarningKind::DegenerateStop));
    }

    #[test]
    fn test_deterministic() {
        let case = Case::new(100.0, 90.0, 40.0, 110.0, 2.2);
        let (signals, sizing, first) = case.run();
        for _ in 0..10 {
            assert_eq!(recommend(&signals, &case.snapshot, case.bar.close, &sizing), first);
        }
    }
}
