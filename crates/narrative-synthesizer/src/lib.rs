pub mod bypass;
pub mod client;
pub mod coerce;
pub mod error;
pub mod prompt;

pub use bypass::{deterministic_narrative, should_bypass};
pub use client::{HttpNarrativeClient, NarrativeConfig};
pub use error::{MLError, MLResult};
pub use prompt::{build_prompt, NarrativeRequest};

use decision_core::{AnalysisError, NarrativeBlock, NarrativeClient, TradingDecision};

/// Produces the narrative block for a ticker's primary decision: a fixed
/// template when the decision doesn't warrant a model call, otherwise a
/// prompt built from the gathered request and sent to the injected client.
pub async fn narrate(
    ticker: &str,
    primary_decision: &TradingDecision,
    request: &NarrativeRequest<'_>,
    client: &dyn NarrativeClient,
) -> Result<NarrativeBlock, AnalysisError> {
    if should_bypass(primary_decision) {
        return Ok(deterministic_narrative(ticker, primary_decision));
    }

    let prompt = build_prompt(request);
    client.synthesize(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use decision_core::{AnalysisMode, DecisionState, Horizon, HorizonNarrative, SetupState};

    struct StubClient;

    #[async_trait]
    impl NarrativeClient for StubClient {
        async fn synthesize(&self, _prompt: &str) -> Result<NarrativeBlock, AnalysisError> {
            let h = HorizonNarrative {
                action: "BUY".to_string(),
                confidence: 70.0,
                entry: Some(10.0),
                target: Some(12.0),
                stop: Some(9.0),
                signals: vec!["RSI oversold".to_string()],
                rationale: "Strong setup.".to_string(),
            };
            Ok(NarrativeBlock {
                executive_summary: "Bullish".to_string(),
                intraday: h.clone(),
                swing: h.clone(),
                positional: h.clone(),
                longterm: h,
                options_fno: None,
                market_sentiment: Some("Greedy".to_string()),
            })
        }
    }

    fn decision(state: DecisionState, confidence: f64) -> TradingDecision {
        TradingDecision {
            horizon: Horizon::Swing,
            decision_state: state,
            setup_state: SetupState::Valid,
            confidence,
            primary_reason: "regime shredder".to_string(),
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

    fn request<'a>(ticker: &'a str) -> NarrativeRequest<'a> {
        NarrativeRequest {
            ticker,
            mode: AnalysisMode::Full,
            current_price: 50.0,
            data_confidence: 80.0,
            technicals: None,
            algo_signal: None,
            horizon_decisions: &[],
            fundamentals: None,
            market_context: None,
            news_headlines: &[],
        }
    }

    #[tokio::test]
    async fn rejected_decision_never_reaches_the_client() {
        let result = narrate("ACME", &decision(DecisionState::Reject, 0.0), &request("ACME"), &StubClient)
            .await
            .unwrap();
        assert!(result.executive_summary.starts_with("AUTOMATED REJECTION"));
    }

    #[tokio::test]
    async fn accepted_decision_calls_through_to_the_client() {
        let result = narrate("ACME", &decision(DecisionState::Accept, 85.0), &request("ACME"), &StubClient)
            .await
            .unwrap();
        assert_eq!(result.executive_summary, "Bullish");
    }
}
