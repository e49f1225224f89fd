use decision_core::{
    DecisionState, FundamentalData, Horizon, MarketContext, SetupQuality, SetupState, Technicals,
    TradingDecision, VolatilityRisk,
};
use governor::{DataIntegrity, Governor};
use risk_engine::RiskEngine;
use scoring_engine::ScoringEngine;

const BASE_CONFIDENCE: f64 = 80.0;
const LOW_CONFLUENCE_PENALTY: f64 = 30.0;
const MODERATE_CONFLUENCE_PENALTY: f64 = 10.0;
const HIGH_CONFLUENCE_BONUS: f64 = 10.0;
const HIGH_VOLATILITY_PENALTY: f64 = 10.0;
const THIN_CONSENSUS_PENALTY: f64 = 15.0;
const WAIT_OVERALL_THRESHOLD: f64 = 20.0;
const ACCEPT_CONFIDENCE_THRESHOLD: f64 = 70.0;
const ATR_STOP_MULTIPLE: f64 = 2.0;
const ATR_NEAR_TARGET_MULTIPLE: f64 = 2.0;
const ATR_FAR_TARGET_MULTIPLE: f64 = 4.0;
const ENTRY_ZONE_BAND: f64 = 0.01;
const MIN_RISK_REWARD_RATIO: f64 = 1.0;
const DEFAULT_ATR_FRACTION_OF_PRICE: f64 = 0.01;

/// Composes `Governor`, `ScoringEngine`, and `RiskEngine` into one
/// authoritative `TradingDecision` for a single horizon. Holds no state of
/// its own across calls.
pub struct TradingSystem {
    governor: Governor,
    scoring: ScoringEngine,
    risk: RiskEngine,
}

impl Default for TradingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingSystem {
    pub fn new() -> Self {
        Self {
            governor: Governor::new(),
            scoring: ScoringEngine::new(),
            risk: RiskEngine::default(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn decide(
        &self,
        horizon: Horizon,
        technicals: &Technicals,
        context: Option<&MarketContext>,
        fundamentals: Option<&FundamentalData>,
        financials: Option<&decision_core::Financials>,
        ticker: &str,
        price: f64,
        avg_volume_20d: Option<f64>,
    ) -> TradingDecision {
        let veto = self
            .governor
            .get_veto_state(technicals, context, financials, ticker);
        let setup_state = match veto.data_integrity {
            DataIntegrity::Invalid => SetupState::Invalid,
            DataIntegrity::Degraded => SetupState::Degraded,
            DataIntegrity::Valid => SetupState::Valid,
        };

        if veto.data_integrity == DataIntegrity::Invalid {
            return reject(
                horizon,
                setup_state,
                vec!["RULE_0_DATA_INTEGRITY: rsi or macd_histogram unavailable".to_string()],
            );
        }

        let mut violations = veto.violations.clone();
        if veto.is_untradeable_regime {
            violations.push(
                "REGIME_CAPITAL_SHREDDER: atr_percent>3.0 and adx<20".to_string(),
            );
        }
        if !violations.is_empty() {
            return reject(horizon, setup_state, violations);
        }

        let signal = self.scoring.score(technicals);
        let days_to_earnings = context.and_then(|c| c.next_earnings.as_ref()).map(|e| e.days_away);

        let mut confidence = BASE_CONFIDENCE;
        if signal.confluence_score < 4 {
            confidence -= LOW_CONFLUENCE_PENALTY;
        } else if signal.confluence_score < 6 {
            confidence -= MODERATE_CONFLUENCE_PENALTY;
        }
        if signal.confluence_score >= 8 {
            confidence += HIGH_CONFLUENCE_BONUS;
        }
        if signal.volatility_risk == VolatilityRisk::High {
            confidence -= HIGH_VOLATILITY_PENALTY;
        }
        if let Some(ctx) = context {
            if ctx.consensus.is_some() && ctx.analyst_ratings.is_empty() {
                confidence -= THIN_CONSENSUS_PENALTY;
            }
        }
        confidence = confidence.clamp(0.0, 100.0);

        if signal.overall.value.abs() < WAIT_OVERALL_THRESHOLD
            || confidence < ACCEPT_CONFIDENCE_THRESHOLD
        {
            return wait(horizon, setup_state, confidence, signal.reason.clone());
        }

        let atr = technicals.atr.filter(|a| *a > 0.0).unwrap_or(price * DEFAULT_ATR_FRACTION_OF_PRICE);
        let stop_loss = price - ATR_STOP_MULTIPLE * atr;
        let near_target = price + ATR_NEAR_TARGET_MULTIPLE * atr;
        let far_target = price + ATR_FAR_TARGET_MULTIPLE * atr;
        let entry_zone = (price * (1.0 - ENTRY_ZONE_BAND), price * (1.0 + ENTRY_ZONE_BAND));

        let risk_per_share = price - stop_loss;
        let risk_reward_ratio = if risk_per_share > 0.0 {
            (far_target - price) / risk_per_share
        } else {
            0.0
        };

        if risk_reward_ratio < MIN_RISK_REWARD_RATIO {
            return reject(
                horizon,
                setup_state,
                vec!["MATH_INVALID_RR: risk_reward_ratio below 1.0".to_string()],
            );
        }

        let sizing = self.risk.calculate_position_size(
            setup_state,
            price,
            risk_per_share,
            avg_volume_20d,
            days_to_earnings,
        );

        let setup_quality = if confidence >= 85.0 {
            SetupQuality::High
        } else if confidence >= 75.0 {
            SetupQuality::Medium
        } else {
            SetupQuality::Low
        };

        let _ = fundamentals;

        TradingDecision {
            horizon,
            decision_state: DecisionState::Accept,
            setup_state,
            confidence,
            primary_reason: signal.reason,
            violation_rules: Vec::new(),
            position_size_pct: sizing.position_size_pct,
            max_capital_at_risk: sizing.capital_at_risk_pct,
            risk_reward_ratio,
            entry_zone: Some(entry_zone),
            stop_loss: Some(stop_loss),
            take_profit: Some(far_target),
            tp_targets: vec![near_target, far_target],
            setup_quality: Some(setup_quality),
        }
    }
}

/// Builds a REJECT decision directly, bypassing Governor/Scoring/RiskEngine
/// entirely — for a caller that has already short-circuited a ticker (e.g.
/// the pre-screen) before any pricing work ran.
pub fn reject(horizon: Horizon, setup_state: SetupState, violations: Vec<String>) -> TradingDecision {
    let primary_reason = violations.first().cloned().unwrap_or_else(|| "REJECT".to_string());
    TradingDecision {
        horizon,
        decision_state: DecisionState::Reject,
        setup_state,
        confidence: 0.0,
        primary_reason,
        violation_rules: violations,
        position_size_pct: 0.0,
        max_capital_at_risk: 0.0,
        risk_reward_ratio: 0.0,
        entry_zone: None,
        stop_loss: None,
        take_profit: None,
        tp_targets: Vec::new(),
        setup_quality: None,
    }
}

fn wait(
    horizon: Horizon,
    setup_state: SetupState,
    confidence: f64,
    reason: String,
) -> TradingDecision {
    TradingDecision {
        horizon,
        decision_state: DecisionState::Wait,
        setup_state,
        confidence,
        primary_reason: reason,
        violation_rules: Vec::new(),
        position_size_pct: 0.0,
        max_capital_at_risk: 0.0,
        risk_reward_ratio: 0.0,
        entry_zone: None,
        stop_loss: None,
        take_profit: None,
        tp_targets: Vec::new(),
        setup_quality: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decision_core::TrendStructure;

    fn strong_bullish_technicals() -> Technicals {
        Technicals {
            rsi: Some(65.0),
            macd_histogram: Some(0.5),
            ema_50: Some(105.0),
            ema_200: Some(95.0),
            adx: Some(28.0),
            atr: Some(2.0),
            atr_percent: Some(1.5),
            cci: Some(50.0),
            volume_ratio: Some(1.1),
            trend_structure: Some(TrendStructure::Bullish),
            last_close: Some(100.0),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_integrity_rejects_with_rule_zero() {
        let t = Technicals::default();
        let decision = TradingSystem::new().decide(
            Horizon::Swing,
            &t,
            None,
            None,
            None,
            "AAPL",
            100.0,
            None,
        );
        assert_eq!(decision.decision_state, DecisionState::Reject);
        assert!(decision.violation_rules[0].starts_with("RULE_0_DATA_INTEGRITY"));
        assert!(decision.is_internally_consistent());
    }

    #[test]
    fn chop_zone_regime_is_rejected() {
        let t = Technicals {
            adx: Some(10.0),
            atr_percent: Some(4.0),
            ..strong_bullish_technicals()
        };
        let decision = TradingSystem::new().decide(
            Horizon::Swing,
            &t,
            None,
            None,
            None,
            "AAPL",
            100.0,
            None,
        );
        assert_eq!(decision.decision_state, DecisionState::Reject);
        assert!(decision.is_internally_consistent());
    }

    #[test]
    fn strong_bullish_setup_is_accepted_with_consistent_levels() {
        let t = strong_bullish_technicals();
        let decision = TradingSystem::new().decide(
            Horizon::Swing,
            &t,
            None,
            None,
            None,
            "AAPL",
            100.0,
            Some(1_000_000.0),
        );
        assert_eq!(decision.decision_state, DecisionState::Accept);
        assert!(decision.stop_loss.unwrap() < 100.0);
        assert!(decision.take_profit.unwrap() > 100.0);
        assert!(decision.risk_reward_ratio >= 1.0);
        assert!(decision.is_internally_consistent());
    }

    #[test]
    fn weak_confluence_results_in_wait() {
        let t = Technicals {
            rsi: Some(50.0),
            macd_histogram: Some(0.0),
            ema_50: Some(100.0),
            adx: Some(10.0),
            atr_percent: Some(1.0),
            cci: Some(0.0),
            volume_ratio: Some(1.0),
            ..Default::default()
        };
        let decision = TradingSystem::new().decide(
            Horizon::Swing,
            &t,
            None,
            None,
            None,
            "AAPL",
            100.0,
            None,
        );
        assert_eq!(decision.decision_state, DecisionState::Wait);
        assert!(decision.is_internally_consistent());
    }

    #[test]
    fn accept_decision_always_satisfies_invariant() {
        let t = strong_bullish_technicals();
        let decision = TradingSystem::new().decide(
            Horizon::Intraday,
            &t,
            None,
            None,
            None,
            "AAPL",
            250.0,
            Some(2_000_000.0),
        );
        if decision.decision_state == DecisionState::Accept {
            assert!(decision.is_internally_consistent());
        }
    }
}
