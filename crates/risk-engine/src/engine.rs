use decision_core::SetupState;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{PositionSizing, RiskMetrics, RiskParameters};

const LIQUIDITY_BASELINE_SHARES: f64 = 500_000.0;
const LOW_VOLUME_FLOOR_SHARES: f64 = 200_000.0;
const LOW_VOLUME_SIZE_CAP_PCT: f64 = 1.0;
const VOLATILITY_CAP_STOP_PCT: f64 = 0.05;
const VOLATILITY_CAP_SCALAR: f64 = 0.5;
const EARNINGS_LOCK_WINDOW_DAYS: i64 = 21;

/// Stateless position sizer. Every call is pure: no portfolio state, no
/// database, no prior positions — sizing is derived entirely from the
/// candidate setup passed in.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    params: RiskParameters,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskParameters::default())
    }
}

impl RiskEngine {
    pub fn new(params: RiskParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    /// Computes position size as a percentage of notional capital, respecting
    /// the risk budget, dynamic liquidity, hard volatility ceiling, and an
    /// earnings-proximity lock.
    pub fn calculate_position_size(
        &self,
        setup_state: SetupState,
        price: f64,
        risk_per_share: f64,
        avg_volume_20d: Option<f64>,
        days_to_earnings: Option<i64>,
    ) -> PositionSizing {
        if risk_per_share <= 0.0 || price <= 0.0 {
            return PositionSizing {
                position_size_pct: 0.0,
                capital_at_risk_pct: 0.0,
            };
        }

        let mut max_position = self.params.max_position_pct;
        if setup_state == SetupState::Degraded {
            max_position *= self.params.degraded_position_cap;
        }

        // 1. Risk-based sizing: size such that max_capital_risk_pct of capital
        // is at stake if the stop is hit.
        let sl_pct = risk_per_share / price;
        let position_by_risk = self.params.max_capital_risk_pct / sl_pct;
        let mut size = max_position.min(position_by_risk);

        // 2. Dynamic liquidity: scale down toward a 500k-share baseline, with
        // a hard 1% ceiling for thin names.
        if let Some(adv) = avg_volume_20d {
            let liquidity_factor = (adv / LIQUIDITY_BASELINE_SHARES).min(1.0);
            size *= liquidity_factor;
            if adv < LOW_VOLUME_FLOOR_SHARES {
                size = size.min(LOW_VOLUME_SIZE_CAP_PCT);
            }
        }

        // 3. Hard volatility cap.
        if sl_pct > VOLATILITY_CAP_STOP_PCT {
            size *= VOLATILITY_CAP_SCALAR;
        }

        // 4. Earnings lock: linear decay from full size at 21 days out to
        // zero the day of the print.
        if let Some(days) = days_to_earnings {
            if (0..=EARNINGS_LOCK_WINDOW_DAYS).contains(&days) {
                let earnings_factor = days as f64 / EARNINGS_LOCK_WINDOW_DAYS as f64;
                size *= earnings_factor;
                debug!(days, earnings_factor, "earnings lock engaged");
            }
        }

        let capital_at_risk_pct = self.capital_at_risk(size, risk_per_share, price);
        PositionSizing {
            position_size_pct: size,
            capital_at_risk_pct,
        }
    }

    /// `position_size_pct · (risk_per_share/price)`, rounded to basis points.
    pub fn capital_at_risk(&self, position_size_pct: f64, risk_per_share: f64, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        let size = Decimal::try_from(position_size_pct).unwrap_or_default();
        let ratio = Decimal::try_from(risk_per_share / price).unwrap_or_default();
        (size * ratio).round_dp(4).to_f64().unwrap_or(0.0)
    }

    /// Precise, citation-ready figures for one candidate setup: what a
    /// narrative can quote verbatim without re-deriving it.
    pub fn precise_metrics(
        &self,
        price: f64,
        position_size_pct: f64,
        stop_loss: Option<f64>,
        atr: f64,
    ) -> RiskMetrics {
        let risk_per_share = stop_loss.map(|sl| (price - sl).abs()).unwrap_or(0.0);
        let stop_loss_pct = if price > 0.0 {
            risk_per_share / price * 100.0
        } else {
            0.0
        };
        RiskMetrics {
            position_size_pct: round2(position_size_pct),
            capital_at_risk_pct: self.capital_at_risk(position_size_pct, risk_per_share, price),
            risk_per_share: round2(risk_per_share),
            stop_loss_pct: round2(stop_loss_pct),
            atr_percent: if price > 0.0 {
                round2(atr / price * 100.0)
            } else {
                0.0
            },
            stop_distance_in_atr: if atr > 0.0 {
                round2(risk_per_share / atr)
            } else {
                0.0
            },
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskEngine {
        RiskEngine::default()
    }

    #[test]
    fn caps_size_to_risk_budget() {
        let sizing = engine().calculate_position_size(SetupState::Valid, 100.0, 1.0, None, None);
        // sl_pct = 0.01, position_by_risk = 0.5/0.01 = 50, clamped by max_position_pct=5
        assert!((sizing.position_size_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn degraded_setup_halves_cap() {
        let sizing =
            engine().calculate_position_size(SetupState::Degraded, 100.0, 1.0, None, None);
        assert!((sizing.position_size_pct - 2.5).abs() < 1e-9);
    }

    #[test]
    fn thin_liquidity_caps_size_at_one_percent() {
        let sizing = engine().calculate_position_size(
            SetupState::Valid,
            100.0,
            1.0,
            Some(100_000.0),
            None,
        );
        assert!(sizing.position_size_pct <= 1.0);
    }

    #[test]
    fn wide_stop_triggers_volatility_cap() {
        let sizing = engine().calculate_position_size(SetupState::Valid, 100.0, 10.0, None, None);
        // sl_pct=0.10 > 0.05, so the 0.5x volatility scalar applies on top of
        // the risk-based size (0.5/0.10=5, equal to max_position_pct).
        assert!((sizing.position_size_pct - 2.5).abs() < 1e-9);
    }

    #[test]
    fn earnings_lock_decays_linearly() {
        let full = engine().calculate_position_size(SetupState::Valid, 100.0, 1.0, None, None);
        let locked =
            engine().calculate_position_size(SetupState::Valid, 100.0, 1.0, None, Some(7));
        assert!((locked.position_size_pct - full.position_size_pct * 7.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn earnings_outside_window_has_no_effect() {
        let full = engine().calculate_position_size(SetupState::Valid, 100.0, 1.0, None, None);
        let later =
            engine().calculate_position_size(SetupState::Valid, 100.0, 1.0, None, Some(30));
        assert!((later.position_size_pct - full.position_size_pct).abs() < 1e-9);
    }

    #[test]
    fn zero_risk_per_share_yields_zero_size() {
        let sizing = engine().calculate_position_size(SetupState::Valid, 100.0, 0.0, None, None);
        assert_eq!(sizing.position_size_pct, 0.0);
        assert_eq!(sizing.capital_at_risk_pct, 0.0);
    }

    #[test]
    fn precise_metrics_round_trip() {
        let m = engine().precise_metrics(100.0, 2.5, Some(95.0), 3.0);
        assert!((m.risk_per_share - 5.0).abs() < 1e-9);
        assert!((m.stop_loss_pct - 5.0).abs() < 1e-9);
        assert!((m.atr_percent - 3.0).abs() < 1e-9);
        assert!((m.stop_distance_in_atr - 1.67).abs() < 0.01);
    }
}
