use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use decision_core::{
    AnalysisError, AnalysisMode, Bar, ConsensusRating, ContextProvider, DataProvider,
    DecisionState, Financials, HorizonNarrative, InsiderTransaction, MarketContext,
    NarrativeBlock, NarrativeClient, NewsArticle,
};
use fundamental_analysis::RawFundamentalData;
use orchestrator::{FundamentalsSource, NewsSource, Orchestrator};

struct StubData {
    fail_positional: bool,
}

#[async_trait]
impl DataProvider for StubData {
    async fn fetch_price_history(
        &self,
        _ticker: &str,
        interval: &str,
        _period: &str,
    ) -> Result<Vec<Bar>, AnalysisError> {
        if interval == "1d" && self.fail_positional {
            return Err(AnalysisError::SensorError("vendor unavailable".to_string()));
        }
        Ok(make_bars(60))
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

fn make_bars(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;
    for i in 0..n {
        let delta = ((i % 7) as f64 - 3.0) * 0.4;
        price = (price + delta).max(10.0);
        bars.push(Bar {
            timestamp: Utc::now() - Duration::days((n - i) as i64),
            open: price - 0.2,
            high: price + 0.5,
            low: price - 0.5,
            close: price,
            volume: 1_000_000.0 + (i as f64) * 1_000.0,
            vwap: Some(price),
        });
    }
    bars
}

struct StubContext {
    insider_sells: usize,
}

#[async_trait]
impl ContextProvider for StubContext {
    async fn fetch_context(&self, _ticker: &str) -> Result<MarketContext, AnalysisError> {
        let mut activity = Vec::new();
        for i in 0..self.insider_sells {
            activity.push(InsiderTransaction {
                insider: format!("exec-{i}"),
                relation: Some("Officer".to_string()),
                transaction_type: "Sell".to_string(),
                shares: 10_000.0,
                value: Some(500_000.0),
                date: Utc::now() - Duration::days(5),
            });
        }
        Ok(MarketContext {
            analyst_ratings: Vec::new(),
            consensus: Some(ConsensusRating {
                consensus_rating: Some("Buy".to_string()),
                consensus_price_target: Some(150.0),
                high_price_target: Some(180.0),
                low_price_target: Some(120.0),
                buy_count: Some(10),
                hold_count: Some(2),
                sell_count: Some(1),
                contributors: Some(13),
            }),
            price_target: Some(150.0),
            next_earnings: None,
            insider_activity: activity,
            option_sentiment: None,
        })
    }
}

struct StubFundamentals {
    /// When set, produces a single quarter whose Sloan ratio trips R5
    /// (accrual-quality) without going through the context-only pre-screen.
    poor_earnings_quality: bool,
}

#[async_trait]
impl FundamentalsSource for StubFundamentals {
    async fn fetch(&self, _ticker: &str) -> Result<(RawFundamentalData, Vec<Financials>), AnalysisError> {
        let financials = if self.poor_earnings_quality {
            vec![Financials {
                symbol: "ACME".to_string(),
                fiscal_period: "Q1".to_string(),
                fiscal_year: 2026,
                revenue: None,
                gross_profit: None,
                operating_income: None,
                net_income: Some(100.0),
                eps: None,
                total_assets: Some(100.0),
                total_liabilities: None,
                shareholders_equity: None,
                cash_flow_operating: Some(0.0),
                cash_flow_investing: None,
                cash_flow_financing: None,
            }]
        } else {
            Vec::new()
        };
        Ok((RawFundamentalData::default(), financials))
    }
}

struct StubNews;

#[async_trait]
impl NewsSource for StubNews {
    async fn fetch(&self, _ticker: &str) -> Result<Vec<NewsArticle>, AnalysisError> {
        Ok(Vec::new())
    }
}

/// Counts every real call through to the narrative backend, so tests can
/// assert a deterministic bypass never reached the network.
#[derive(Clone)]
struct CountingClient {
    calls: Arc<AtomicUsize>,
}

impl CountingClient {
    fn new() -> Self {
        Self { calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl NarrativeClient for CountingClient {
    async fn synthesize(&self, _prompt: &str) -> Result<NarrativeBlock, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let horizon = HorizonNarrative {
            action: "HOLD".to_string(),
            confidence: 50.0,
            entry: Some(100.0),
            target: Some(110.0),
            stop: Some(95.0),
            signals: vec!["trend_up".to_string()],
            rationale: "stub".to_string(),
        };
        Ok(NarrativeBlock {
            executive_summary: "stub summary".to_string(),
            intraday: horizon.clone(),
            swing: horizon.clone(),
            positional: horizon.clone(),
            longterm: horizon,
            options_fno: None,
            market_sentiment: None,
        })
    }
}

#[tokio::test]
async fn terminal_failure_when_positional_bars_missing() {
    let orchestrator = Orchestrator::new(
        StubData { fail_positional: true },
        StubContext { insider_sells: 0 },
        StubFundamentals { poor_earnings_quality: false },
        StubNews,
        CountingClient::new(),
    );

    let result = orchestrator.analyze("ACME", AnalysisMode::Full, false).await;
    assert!(matches!(result, Err(AnalysisError::TechnicalPipelineFailed(_))));
}

#[tokio::test]
async fn insider_sell_pre_screen_rejects_across_every_horizon() {
    let client = CountingClient::new();
    let orchestrator = Orchestrator::new(
        StubData { fail_positional: false },
        StubContext { insider_sells: 5 },
        StubFundamentals { poor_earnings_quality: false },
        StubNews,
        client.clone(),
    );

    let response = orchestrator
        .analyze("ACME", AnalysisMode::Full, false)
        .await
        .expect("a rejected ticker is still a successful analysis");

    assert_eq!(response.execution.action, DecisionState::Reject);
    assert!(!response.execution.authorized);
    assert!(response
        .execution
        .vetoes
        .iter()
        .any(|v| v.contains("INSIDER_SELLS")));
    assert!(response.execution.risk_limits.is_internally_consistent());
    assert!((0.0..=100.0).contains(&response.system.confidence));
    // Rejection always bypasses the narrative backend, force_ai or not.
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn forced_ai_on_rejected_ticker_produces_deterministic_narrative() {
    let client = CountingClient::new();
    let orchestrator = Orchestrator::new(
        StubData { fail_positional: false },
        StubContext { insider_sells: 0 },
        StubFundamentals { poor_earnings_quality: true },
        StubNews,
        client.clone(),
    );

    let response = orchestrator
        .analyze("ACME", AnalysisMode::Full, true)
        .await
        .expect("a rejected ticker is still a successful analysis");

    assert_eq!(response.system.engine_logic, "HYBRID");
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);

    let ai = response.ai_analysis.expect("forced ai should populate a narrative");
    assert_eq!(ai.swing.entry, Some(0.0));
    assert_eq!(ai.swing.target, Some(0.0));
    assert_eq!(ai.swing.stop, Some(0.0));
    assert_eq!(ai.swing.action, "REJECT");
}

#[tokio::test]
async fn response_satisfies_core_invariants_on_a_clean_read() {
    let orchestrator = Orchestrator::new(
        StubData { fail_positional: false },
        StubContext { insider_sells: 0 },
        StubFundamentals { poor_earnings_quality: false },
        StubNews,
        CountingClient::new(),
    );

    let response = orchestrator
        .analyze("ACME", AnalysisMode::Full, false)
        .await
        .expect("analysis should succeed");

    assert!((0.0..=100.0).contains(&response.system.confidence));
    assert!(response.execution.risk_limits.is_internally_consistent());
    for support in &response.levels.support {
        assert!(*support <= response.levels.current + 0.01);
    }
    for resistance in &response.levels.resistance {
        assert!(*resistance >= response.levels.current - 0.01);
    }
    if let Some(ai) = &response.ai_analysis {
        for horizon in [&ai.intraday, &ai.swing, &ai.positional, &ai.longterm] {
            assert!(horizon.confidence <= response.system.confidence + 0.01);
        }
    }
}

#[tokio::test]
async fn rate_limiter_throttles_excess_requests_within_the_same_window() {
    let orchestrator = Orchestrator::new(
        StubData { fail_positional: false },
        StubContext { insider_sells: 5 },
        StubFundamentals { poor_earnings_quality: false },
        StubNews,
        CountingClient::new(),
    );

    for _ in 0..60 {
        let _ = orchestrator.analyze("ACME", AnalysisMode::Full, false).await;
    }
    let result = orchestrator.analyze("ACME", AnalysisMode::Full, false).await;
    assert!(matches!(result, Err(AnalysisError::ProviderThrottled(_))));
}
