use decision_core::{DecisionState, HorizonNarrative, NarrativeBlock, TradingDecision};

const LOW_CONFIDENCE_WAIT_THRESHOLD: f64 = 30.0;

/// Whether the primary decision should skip the external model entirely
/// and receive a fixed template narrative instead of spending a call on
/// it. A rejected trade or a low-confidence wait carries nothing for a
/// model to usefully narrate.
pub fn should_bypass(primary: &TradingDecision) -> bool {
    match primary.decision_state {
        DecisionState::Reject => true,
        DecisionState::Wait => primary.confidence < LOW_CONFIDENCE_WAIT_THRESHOLD,
        DecisionState::Accept => false,
    }
}

/// Builds the static narrative for a bypassed decision, without any
/// network call. Every horizon gets the same null perspective — there is
/// nothing horizon-specific to say about a trade that never happens.
pub fn deterministic_narrative(ticker: &str, primary: &TradingDecision) -> NarrativeBlock {
    let reason = if primary.violation_rules.is_empty() {
        primary.primary_reason.clone()
    } else {
        primary.violation_rules.join("; ")
    };

    let null_perspective = HorizonNarrative {
        action: format!("{:?}", primary.decision_state).to_uppercase(),
        confidence: 0.0,
        entry: Some(0.0),
        target: Some(0.0),
        stop: Some(0.0),
        signals: Vec::new(),
        rationale: format!("System Veto: {reason}"),
    };

    NarrativeBlock {
        executive_summary: format!(
            "AUTOMATED REJECTION: {reason}\n\nGovernor blocked trading on {ticker}. Reason: {reason}."
        ),
        intraday: null_perspective.clone(),
        swing: null_perspective.clone(),
        positional: null_perspective.clone(),
        longterm: null_perspective,
        options_fno: Some("NONE / DATA_ABSENT: Locked.".to_string()),
        market_sentiment: Some("Deterministic Neutral".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decision_core::Horizon;

    fn decision(state: DecisionState, confidence: f64) -> TradingDecision {
        TradingDecision {
            horizon: Horizon::Swing,
            decision_state: state,
            setup_state: decision_core::SetupState::Valid,
            confidence,
            primary_reason: "insider sell cluster".to_string(),
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

    #[test]
    fn rejected_decisions_always_bypass() {
        assert!(should_bypass(&decision(DecisionState::Reject, 0.0)));
    }

    #[test]
    fn low_confidence_wait_bypasses() {
        assert!(should_bypass(&decision(DecisionState::Wait, 10.0)));
    }

    #[test]
    fn confident_wait_does_not_bypass() {
        assert!(!should_bypass(&decision(DecisionState::Wait, 60.0)));
    }

    #[test]
    fn accepted_decisions_never_bypass() {
        assert!(!should_bypass(&decision(DecisionState::Accept, 90.0)));
    }

    #[test]
    fn deterministic_narrative_zeroes_every_horizon() {
        let block = deterministic_narrative("ACME", &decision(DecisionState::Reject, 0.0));
        assert_eq!(block.intraday.confidence, 0.0);
        assert_eq!(block.longterm.entry, Some(0.0));
        assert!(block.executive_summary.starts_with("AUTOMATED REJECTION"));
    }
}
