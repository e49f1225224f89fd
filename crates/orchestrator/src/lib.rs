pub mod rate_limiter;

pub use rate_limiter::RateLimiter;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use decision_core::{
    AlgoSignal, AnalysisError, AnalysisMode, ContextBlock, ContextProvider, DataProvider,
    DataStateTaxonomy, DecisionState, ExecutionBlock, Financials, Horizon, HumanInsightBlock,
    LevelsBlock, MarketContext, NarrativeClient, NewsArticle, NewsIntelligence, ResponseMeta,
    Response, Scenarios, SetupState, SignalComponents, SignalsBlock, SystemBlock, Technicals,
    TradingDecision, Urgency,
};
use fundamental_analysis::{FundamentalAnalysisEngine, FundamentalReadout, RawFundamentalData};
use governor::{DataIntegrity, Governor, RejectionTracker};
use narrative_synthesizer::{narrate, should_bypass, NarrativeRequest};
use news_aggregator::NewsAggregator;
use scoring_engine::ScoringEngine;
use sha2::{Digest, Sha256};
use technical_analysis::IndicatorEngine;
use trading_system::TradingSystem;

const GLOBAL_FAN_OUT_DEADLINE: StdDuration = StdDuration::from_secs(30);
const NARRATIVE_FAST_PATH_ELAPSED_SECS: i64 = 6;
const NARRATIVE_SIGNAL_STRENGTH_FLOOR: f64 = 0.15;
const AUTHORIZATION_CONFIDENCE_FLOOR: f64 = 40.0;
const DEGRADED_CONFIDENCE_CAP: f64 = 40.0;
const MISSING_DATUM_PENALTY: f64 = 0.15;
const REGIME_VALUATION_ADX_CEILING: f64 = 20.0;
const REGIME_VALUATION_PREMIUM: f64 = 1.04;
const SLA_THRESHOLD_MS: u64 = 5000;
const RESPONSE_VERSION: &str = "1.0.0";

/// Per-ticker fundamentals fetch, kept as a narrow seam distinct from
/// `decision_core::DataProvider` since its payload (`RawFundamentalData` +
/// quarterly `Financials`) belongs to `fundamental-analysis`, not the base
/// crate every sensor depends on.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<(RawFundamentalData, Vec<Financials>), AnalysisError>;
}

/// Per-ticker news fetch, mirroring `FundamentalsSource`'s role: a seam
/// whose payload (`NewsArticle`) is a `decision-core` type but whose
/// fetch mechanics (source fan-out, vendor auth) are out of this core's
/// scope.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<Vec<NewsArticle>, AnalysisError>;
}

struct HorizonBars {
    intraday: Result<Vec<decision_core::Bar>, AnalysisError>,
    swing: Result<Vec<decision_core::Bar>, AnalysisError>,
    positional: Result<Vec<decision_core::Bar>, AnalysisError>,
    longterm: Result<Vec<decision_core::Bar>, AnalysisError>,
}

fn interval_for(horizon: Horizon) -> &'static str {
    match horizon {
        Horizon::Intraday => "5m",
        Horizon::Swing => "1h",
        Horizon::Positional => "1d",
        Horizon::LongTerm => "1wk",
    }
}

fn period_for(horizon: Horizon) -> &'static str {
    match horizon {
        Horizon::Intraday | Horizon::Swing => "60d",
        Horizon::Positional | Horizon::LongTerm => "1y",
    }
}

/// Composes every sensor and engine into the single `analyze` entry
/// point. Generic over its data sources so the whole pipeline can be
/// driven by deterministic stubs in tests without a live vendor.
pub struct Orchestrator<D, C, F, NW, N>
where
    D: DataProvider,
    C: ContextProvider,
    F: FundamentalsSource,
    NW: NewsSource,
    N: NarrativeClient,
{
    data: D,
    context: C,
    fundamentals_source: F,
    news_source: NW,
    narrative: N,
    fundamental_engine: FundamentalAnalysisEngine,
    news_aggregator: NewsAggregator,
    trading_system: TradingSystem,
    scoring: ScoringEngine,
    governor: Governor,
    rate_limiter: RateLimiter,
}

impl<D, C, F, NW, N> Orchestrator<D, C, F, NW, N>
where
    D: DataProvider,
    C: ContextProvider,
    F: FundamentalsSource,
    NW: NewsSource,
    N: NarrativeClient,
{
    pub fn new(data: D, context: C, fundamentals_source: F, news_source: NW, narrative: N) -> Self {
        Self {
            data,
            context,
            fundamentals_source,
            news_source,
            narrative,
            fundamental_engine: FundamentalAnalysisEngine::new(),
            news_aggregator: NewsAggregator::new(),
            trading_system: TradingSystem::new(),
            scoring: ScoringEngine::new(),
            governor: Governor::new(),
            rate_limiter: RateLimiter::default(),
        }
    }

    pub async fn analyze(&self, ticker: &str, mode: AnalysisMode, force_ai: bool) -> Result<Response, AnalysisError> {
        if !self.rate_limiter.try_acquire().await {
            return Err(AnalysisError::ProviderThrottled(format!(
                "rate limit exceeded for {ticker}"
            )));
        }

        let request_start = tokio::time::Instant::now();
        let wants_fundamentals = !matches!(mode, AnalysisMode::Intraday | AnalysisMode::Execution);

        // Context-only pre-screen (R1+R4), run before any pricing work so a
        // clearly-rejected ticker never pays for a technicals/fundamentals pull.
        let context_result = self.context.fetch_context(ticker).await;
        let pre_screen = self.governor.pre_screen(context_result.as_ref().ok());
        if pre_screen.has_violations() {
            return Ok(pre_screen_response(ticker, pre_screen, context_result.ok(), request_start));
        }

        let fan_out = async {
            tokio::join!(
                self.data.fetch_price_history(ticker, interval_for(Horizon::Intraday), period_for(Horizon::Intraday)),
                self.data.fetch_price_history(ticker, interval_for(Horizon::Swing), period_for(Horizon::Swing)),
                self.data.fetch_price_history(ticker, interval_for(Horizon::Positional), period_for(Horizon::Positional)),
                self.data.fetch_price_history(ticker, interval_for(Horizon::LongTerm), period_for(Horizon::LongTerm)),
                fetch_fundamentals_if_wanted(&self.fundamentals_source, ticker, wants_fundamentals),
                self.news_source.fetch(ticker),
            )
        };

        let (intraday, swing, positional, longterm, fundamentals_result, news_result) =
            tokio::time::timeout(GLOBAL_FAN_OUT_DEADLINE, fan_out)
                .await
                .map_err(|_| AnalysisError::TechnicalPipelineFailed(format!("sensor fan-out exceeded {GLOBAL_FAN_OUT_DEADLINE:?}")))?;

        let bars = HorizonBars { intraday, swing, positional, longterm };

        // A missing technical pipeline is terminal; every other sensor degrades.
        let positional_bars = bars.positional.as_ref().map_err(|e| {
            AnalysisError::TechnicalPipelineFailed(format!("positional bar history unavailable: {e}"))
        })?;
        if positional_bars.is_empty() {
            return Err(AnalysisError::TechnicalPipelineFailed("empty positional bar history".to_string()));
        }

        let current_price = positional_bars.last().map(|b| b.close).unwrap_or(0.0);
        let avg_volume_20d = average_volume(positional_bars, 20);

        let indicator_engine = IndicatorEngine::new();
        let technicals_by_horizon = [
            (Horizon::Intraday, bars.intraday.as_ref().ok().map(|b| indicator_engine.compute(b))),
            (Horizon::Swing, bars.swing.as_ref().ok().map(|b| indicator_engine.compute(b))),
            (Horizon::Positional, Some(indicator_engine.compute(positional_bars))),
            (Horizon::LongTerm, bars.longterm.as_ref().ok().map(|b| indicator_engine.compute(b))),
        ];

        let context = context_result.ok();
        let fundamentals = fundamentals_result.ok().flatten();
        let latest_financials: Option<Financials> = fundamentals
            .as_ref()
            .and_then(|(_, financials)| financials.first().cloned());
        let fundamental_readout: Option<FundamentalReadout> = fundamentals.and_then(|(raw, financials)| {
            match self.fundamental_engine.analyze(raw, &financials) {
                Ok(readout) => Some(readout),
                Err(e) => {
                    tracing::warn!(%ticker, error = %e, "fundamentals failed integrity check, degrading to MISSING");
                    None
                }
            }
        });

        let news_articles = news_result.unwrap_or_default();
        let news_intelligence = self.news_aggregator.aggregate(&news_articles);

        let mut decisions: Vec<TradingDecision> = Vec::with_capacity(4);
        for (horizon, technicals) in &technicals_by_horizon {
            let technicals = technicals.clone().unwrap_or_default();
            let decision = self.trading_system.decide(
                *horizon,
                &technicals,
                context.as_ref(),
                fundamental_readout.as_ref().map(|r| &r.data),
                latest_financials.as_ref(),
                ticker,
                current_price,
                avg_volume_20d,
            );
            decisions.push(decision);
        }

        let primary = decisions
            .iter()
            .find(|d| d.horizon == Horizon::Swing)
            .cloned()
            .unwrap_or_else(|| decisions[0].clone());

        let taxonomy = DataStateTaxonomy {
            technicals: "OK".to_string(),
            fundamentals: data_state_label(wants_fundamentals, fundamental_readout.is_some()),
            context: data_state_label(true, context.is_some()),
            news: if news_articles.is_empty() { "DEGRADED".to_string() } else { "OK".to_string() },
        };

        let missing_count = [
            taxonomy.fundamentals == "MISSING",
            taxonomy.context == "MISSING",
            taxonomy.news == "DEGRADED",
        ]
        .iter()
        .filter(|b| **b)
        .count();

        let data_integrity = match primary.setup_state {
            SetupState::Invalid => DataIntegrity::Invalid,
            SetupState::Degraded => DataIntegrity::Degraded,
            SetupState::Valid | SetupState::Skipped => DataIntegrity::Valid,
        };

        let conflict_detected = directional_conflict(&decisions);
        let mut confidence = primary.confidence;
        if conflict_detected {
            confidence /= 2.0;
        }
        if data_integrity == DataIntegrity::Degraded {
            confidence = confidence.min(DEGRADED_CONFIDENCE_CAP);
        }
        for _ in 0..missing_count {
            confidence *= 1.0 - MISSING_DATUM_PENALTY;
        }
        confidence = confidence.clamp(0.0, 100.0);

        let swing_technicals = technicals_by_horizon
            .iter()
            .find(|(h, _)| *h == Horizon::Swing)
            .and_then(|(_, t)| t.clone())
            .unwrap_or_default();

        let mut vetoes = primary.violation_rules.clone();
        if is_regime_valuation_conflict(&swing_technicals, current_price, context.as_ref()) {
            vetoes.push("REGIME_VALUATION_CONFLICT".to_string());
        }

        let authorized = confidence >= AUTHORIZATION_CONFIDENCE_FLOOR
            && data_integrity == DataIntegrity::Valid
            && vetoes.is_empty();

        let algo_signal = self.scoring.score(&swing_technicals);
        let signal_components = signal_components_from(&algo_signal, fundamental_readout.as_ref());
        let primary_signal_strength = if !vetoes.is_empty() {
            -1.0
        } else {
            weighted_signal_strength(&signal_components)
        };

        let elapsed_before_narrative = request_start.elapsed().as_secs() as i64;
        let skip_narrative = (primary_signal_strength.abs() < NARRATIVE_SIGNAL_STRENGTH_FLOOR && !conflict_detected)
            || elapsed_before_narrative > NARRATIVE_FAST_PATH_ELAPSED_SECS
            || mode == AnalysisMode::Execution;

        let mut fallback_used = false;
        let ai_analysis = if skip_narrative && !force_ai {
            fallback_used = true;
            None
        } else {
            let request = NarrativeRequest {
                ticker,
                mode,
                current_price,
                data_confidence: confidence,
                technicals: Some(&swing_technicals),
                algo_signal: Some(&algo_signal),
                horizon_decisions: &decisions,
                fundamentals: fundamental_readout.as_ref().map(|r| (&r.data, &r.inferences)),
                market_context: context.as_ref(),
                news_headlines: &news_articles.iter().map(|a| a.title.clone()).collect::<Vec<_>>(),
            };
            let bypassed = should_bypass(&primary);
            match narrate(ticker, &primary, &request, &self.narrative).await {
                Ok(block) => Some(apply_authority_layer(block, &primary, confidence, authorized, bypassed)),
                Err(e) => {
                    tracing::warn!(%ticker, error = %e, "narrative synthesis failed, falling back to deterministic");
                    fallback_used = true;
                    None
                }
            }
        };

        let latency_ms = tokio::time::Instant::now().duration_since(request_start).as_millis() as u64;

        Ok(Response {
            meta: ResponseMeta {
                ticker: ticker.to_string(),
                timestamp: Utc::now(),
                version: RESPONSE_VERSION.to_string(),
                analysis_id: analysis_id(ticker),
            },
            execution: ExecutionBlock {
                action: primary.decision_state,
                authorized,
                urgency: urgency_for(&primary),
                valid_until: Utc::now() + chrono::Duration::minutes(15),
                risk_limits: primary.clone(),
                vetoes: vetoes.clone(),
            },
            signals: SignalsBlock {
                actionable: authorized && primary.decision_state == DecisionState::Accept,
                primary_signal_strength,
                required_strength: NARRATIVE_SIGNAL_STRENGTH_FLOOR,
                components: signal_components,
                normalization_method: "Z-SCORE_CLAMPED".to_string(),
                expectancy_weighting: 0.25,
            },
            levels: levels_block(positional_bars, current_price, &swing_technicals),
            context: ContextBlock {
                regime: if swing_technicals.adx.unwrap_or(0.0) >= 20.0 { "Trending".to_string() } else { "Range".to_string() },
                regime_confidence: confidence,
                trend_strength_adx: swing_technicals.adx,
                volatility_atr_pct: swing_technicals.atr_percent,
                volume_ratio: swing_technicals.volume_ratio,
            },
            human_insight: human_insight_block(&decisions, conflict_detected, &news_intelligence),
            system: SystemBlock {
                confidence,
                data_quality: format!("{data_integrity:?}"),
                blocking_issues: vetoes,
                data_state_taxonomy: taxonomy,
                latency_ms,
                layer_timings: serde_json::json!({}),
                next_update: Utc::now() + chrono::Duration::minutes(5),
                latency_sla_violated: latency_ms > SLA_THRESHOLD_MS,
                sla_threshold_ms: SLA_THRESHOLD_MS,
                fallback_used,
                engine_logic: if ai_analysis.is_some() { "HYBRID".to_string() } else { "DETERMINISTIC".to_string() },
            },
            market_context: context,
            ai_analysis,
        })
    }
}

/// Assembles a full `Response` for a ticker rejected by the context-only
/// pre-screen, before any bar fetch or indicator computation ran. Every
/// horizon shares the same REJECT decision since no per-horizon pricing
/// data exists yet.
fn pre_screen_response(
    ticker: &str,
    tracker: RejectionTracker,
    context: Option<MarketContext>,
    request_start: tokio::time::Instant,
) -> Response {
    let violations = tracker.violations().to_vec();
    let decision = trading_system::reject(Horizon::Swing, SetupState::Skipped, violations.clone());
    let latency_ms = tokio::time::Instant::now().duration_since(request_start).as_millis() as u64;

    Response {
        meta: ResponseMeta {
            ticker: ticker.to_string(),
            timestamp: Utc::now(),
            version: RESPONSE_VERSION.to_string(),
            analysis_id: analysis_id(ticker),
        },
        execution: ExecutionBlock {
            action: DecisionState::Reject,
            authorized: false,
            urgency: Urgency::Low,
            valid_until: Utc::now() + chrono::Duration::minutes(15),
            risk_limits: decision,
            vetoes: violations.clone(),
        },
        signals: SignalsBlock {
            actionable: false,
            primary_signal_strength: -1.0,
            required_strength: NARRATIVE_SIGNAL_STRENGTH_FLOOR,
            components: SignalComponents { trend: 0.0, momentum: 0.0, expectancy: 0.0, valuation: 0.0 },
            normalization_method: "Z-SCORE_CLAMPED".to_string(),
            expectancy_weighting: 0.25,
        },
        levels: LevelsBlock {
            current: 0.0,
            timestamp: Utc::now(),
            support: Vec::new(),
            resistance: Vec::new(),
            value_zones: Vec::new(),
        },
        context: ContextBlock {
            regime: "Unknown".to_string(),
            regime_confidence: 0.0,
            trend_strength_adx: None,
            volatility_atr_pct: None,
            volume_ratio: None,
        },
        human_insight: HumanInsightBlock {
            summary: "Pre-screen rejected this ticker before any pricing data was pulled.".to_string(),
            key_conflicts: Vec::new(),
            scenarios: Scenarios {
                bullish: "Not evaluated — pre-screen short-circuited before pricing work ran.".to_string(),
                bearish: "Not evaluated — pre-screen short-circuited before pricing work ran.".to_string(),
                neutral: "Not evaluated — pre-screen short-circuited before pricing work ran.".to_string(),
            },
            monitor_triggers: Vec::new(),
            probability_basis: "HEURISTIC".to_string(),
        },
        system: SystemBlock {
            confidence: 0.0,
            data_quality: "SKIPPED".to_string(),
            blocking_issues: violations,
            data_state_taxonomy: DataStateTaxonomy {
                technicals: "SKIPPED".to_string(),
                fundamentals: "SKIPPED".to_string(),
                context: data_state_label(true, context.is_some()),
                news: "SKIPPED".to_string(),
            },
            latency_ms,
            layer_timings: serde_json::json!({}),
            next_update: Utc::now() + chrono::Duration::minutes(5),
            latency_sla_violated: latency_ms > SLA_THRESHOLD_MS,
            sla_threshold_ms: SLA_THRESHOLD_MS,
            fallback_used: true,
            engine_logic: "DETERMINISTIC".to_string(),
        },
        market_context: context,
        ai_analysis: None,
    }
}

async fn fetch_fundamentals_if_wanted<F: FundamentalsSource>(
    source: &F,
    ticker: &str,
    wanted: bool,
) -> Result<Option<(RawFundamentalData, Vec<Financials>)>, AnalysisError> {
    if !wanted {
        return Ok(None);
    }
    source.fetch(ticker).await.map(Some)
}

fn average_volume(bars: &[decision_core::Bar], window: usize) -> Option<f64> {
    if bars.len() < window {
        return None;
    }
    let recent = &bars[bars.len() - window..];
    Some(recent.iter().map(|b| b.volume).sum::<f64>() / window as f64)
}

fn data_state_label(wanted: bool, present: bool) -> String {
    if !wanted {
        "SKIPPED".to_string()
    } else if present {
        "OK".to_string()
    } else {
        "MISSING".to_string()
    }
}

/// Directional disagreement across intraday/swing/positional — longterm is
/// excluded, since a multi-year horizon routinely diverges from a swing
/// trade without indicating a broken signal.
fn directional_conflict(decisions: &[TradingDecision]) -> bool {
    let relevant: Vec<&TradingDecision> = decisions
        .iter()
        .filter(|d| matches!(d.horizon, Horizon::Intraday | Horizon::Swing | Horizon::Positional))
        .collect();
    let has_accept = relevant.iter().any(|d| d.decision_state == DecisionState::Accept);
    let has_reject = relevant.iter().any(|d| d.decision_state == DecisionState::Reject);
    has_accept && has_reject
}

fn is_regime_valuation_conflict(technicals: &Technicals, current_price: f64, context: Option<&MarketContext>) -> bool {
    let adx = match technicals.adx {
        Some(adx) => adx,
        None => return false,
    };
    let target_mean = match context.and_then(|c| c.consensus.as_ref()).and_then(|c| c.consensus_price_target) {
        Some(target) => target,
        None => return false,
    };
    adx < REGIME_VALUATION_ADX_CEILING && current_price > REGIME_VALUATION_PREMIUM * target_mean
}

fn signal_components_from(algo_signal: &AlgoSignal, fundamentals: Option<&FundamentalReadout>) -> SignalComponents {
    let valuation = fundamentals
        .and_then(|r| r.data.earnings_yield)
        .map(|y| y.clamp(-1.0, 1.0))
        .unwrap_or(0.0);
    SignalComponents {
        trend: (algo_signal.trend.value / algo_signal.trend.max.max(1.0)).clamp(-1.0, 1.0),
        momentum: (algo_signal.momentum.value / algo_signal.momentum.max.max(1.0)).clamp(-1.0, 1.0),
        expectancy: algo_signal.expected_value.clamp(-1.0, 1.0),
        valuation,
    }
}

fn weighted_signal_strength(components: &SignalComponents) -> f64 {
    const EXPECTANCY_WEIGHT: f64 = 0.25;
    const REMAINDER_WEIGHT: f64 = (1.0 - EXPECTANCY_WEIGHT) / 3.0;
    (components.trend * REMAINDER_WEIGHT
        + components.momentum * REMAINDER_WEIGHT
        + components.valuation * REMAINDER_WEIGHT
        + components.expectancy * EXPECTANCY_WEIGHT)
        .clamp(-1.0, 1.0)
}

fn urgency_for(decision: &TradingDecision) -> Urgency {
    match decision.decision_state {
        DecisionState::Reject => Urgency::Low,
        DecisionState::Wait => Urgency::Medium,
        DecisionState::Accept if decision.confidence >= 85.0 => Urgency::Immediate,
        DecisionState::Accept if decision.confidence >= 70.0 => Urgency::High,
        DecisionState::Accept => Urgency::Medium,
    }
}

fn levels_block(bars: &[decision_core::Bar], current_price: f64, technicals: &Technicals) -> LevelsBlock {
    let support: Vec<f64> = [technicals.s1, technicals.s2].into_iter().flatten().filter(|p| *p <= current_price).collect();
    let resistance: Vec<f64> = [technicals.r1, technicals.r2].into_iter().flatten().filter(|p| *p >= current_price).collect();
    let value_zones = match (technicals.bb_lower, technicals.bb_upper) {
        (Some(lower), Some(upper)) => vec![(lower, upper)],
        _ => Vec::new(),
    };
    LevelsBlock {
        current: current_price,
        timestamp: bars.last().map(|b| b.timestamp).unwrap_or_else(Utc::now),
        support,
        resistance,
        value_zones,
    }
}

fn human_insight_block(decisions: &[TradingDecision], conflict: bool, news: &NewsIntelligence) -> HumanInsightBlock {
    let mut key_conflicts = Vec::new();
    if conflict {
        key_conflicts.push("Horizons disagree on direction across intraday/swing/positional.".to_string());
    }
    if news.narrative_trap_warning {
        key_conflicts.push("News feed shows high noise with low source diversity.".to_string());
    }

    let summary = decisions
        .iter()
        .find(|d| d.horizon == Horizon::Swing)
        .map(|d| d.primary_reason.clone())
        .unwrap_or_else(|| "No dominant signal.".to_string());

    HumanInsightBlock {
        summary,
        key_conflicts,
        scenarios: Scenarios {
            bullish: "Price holds above the nearest support with expanding volume.".to_string(),
            bearish: "Price breaks the nearest support with trend deteriorating.".to_string(),
            neutral: "Price consolidates within the current value zone.".to_string(),
        },
        monitor_triggers: vec!["Next earnings date".to_string(), "Analyst consensus revision".to_string()],
        probability_basis: "HEURISTIC".to_string(),
    }
}

/// Enforces cross-record invariants on a synthesized narrative: every
/// horizon's action must agree with the authorized global decision and its
/// confidence may never exceed the system confidence. Skipped for a
/// deterministic-bypass block, whose zeroed template is already the
/// authoritative "locked out" representation (entry/target/stop == 0.0,
/// not null) and must not be rewritten.
fn apply_authority_layer(
    mut block: decision_core::NarrativeBlock,
    primary: &TradingDecision,
    global_confidence: f64,
    authorized: bool,
    bypassed: bool,
) -> decision_core::NarrativeBlock {
    if bypassed {
        return block;
    }
    for horizon in [&mut block.intraday, &mut block.swing, &mut block.positional, &mut block.longterm] {
        horizon.action = format!("{:?}", primary.decision_state).to_uppercase();
        horizon.confidence = horizon.confidence.min(global_confidence);
        if !authorized {
            horizon.entry = None;
            horizon.target = None;
            horizon.stop = None;
            horizon.signals.retain(|s| !s.to_lowercase().contains("null") && !s.is_empty());
        }
    }
    block
}

fn analysis_id(ticker: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ticker.as_bytes());
    hasher.update(Utc::now().to_rfc3339().as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use decision_core::{ConsensusRating, HorizonNarrative, NarrativeBlock};
    use narrative_synthesizer::deterministic_narrative;

    fn decision(horizon: Horizon, state: DecisionState) -> TradingDecision {
        TradingDecision {
            horizon,
            decision_state: state,
            setup_state: SetupState::Valid,
            confidence: 50.0,
            primary_reason: "test".to_string(),
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
    fn directional_conflict_detects_disagreement_across_short_horizons() {
        let decisions = vec![
            decision(Horizon::Intraday, DecisionState::Accept),
            decision(Horizon::Swing, DecisionState::Reject),
            decision(Horizon::Positional, DecisionState::Wait),
            decision(Horizon::LongTerm, DecisionState::Accept),
        ];
        assert!(directional_conflict(&decisions));
    }

    #[test]
    fn directional_conflict_ignores_longterm_only_disagreement() {
        let decisions = vec![
            decision(Horizon::Intraday, DecisionState::Accept),
            decision(Horizon::Swing, DecisionState::Accept),
            decision(Horizon::Positional, DecisionState::Accept),
            decision(Horizon::LongTerm, DecisionState::Reject),
        ];
        assert!(!directional_conflict(&decisions));
    }

    #[test]
    fn regime_valuation_conflict_fires_on_low_adx_and_rich_valuation() {
        let technicals = Technicals { adx: Some(15.0), ..Default::default() };
        let context = MarketContext {
            consensus: Some(ConsensusRating {
                consensus_rating: None,
                consensus_price_target: Some(100.0),
                high_price_target: None,
                low_price_target: None,
                buy_count: None,
                hold_count: None,
                sell_count: None,
                contributors: None,
            }),
            ..Default::default()
        };
        assert!(is_regime_valuation_conflict(&technicals, 110.0, Some(&context)));
        assert!(!is_regime_valuation_conflict(&technicals, 101.0, Some(&context)));
    }

    #[test]
    fn regime_valuation_conflict_requires_both_adx_and_target() {
        let technicals = Technicals { adx: Some(25.0), ..Default::default() };
        assert!(!is_regime_valuation_conflict(&technicals, 200.0, None));
    }

    #[test]
    fn weighted_signal_strength_stays_within_bounds() {
        let components = SignalComponents { trend: 1.0, momentum: 1.0, expectancy: 1.0, valuation: 1.0 };
        assert!((weighted_signal_strength(&components) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn urgency_scales_with_accept_confidence() {
        let mut d = decision(Horizon::Swing, DecisionState::Accept);
        d.confidence = 90.0;
        assert_eq!(urgency_for(&d), Urgency::Immediate);
        d.confidence = 72.0;
        assert_eq!(urgency_for(&d), Urgency::High);
        d.confidence = 50.0;
        assert_eq!(urgency_for(&d), Urgency::Medium);
    }

    #[test]
    fn authority_layer_nulls_levels_when_unauthorized_and_not_bypassed() {
        let primary = decision(Horizon::Swing, DecisionState::Wait);
        let perspective = HorizonNarrative {
            action: "BUY".to_string(),
            confidence: 90.0,
            entry: Some(10.0),
            target: Some(12.0),
            stop: Some(9.0),
            signals: vec!["rsi_oversold".to_string()],
            rationale: "test".to_string(),
        };
        let block = NarrativeBlock {
            executive_summary: "s".to_string(),
            intraday: perspective.clone(),
            swing: perspective.clone(),
            positional: perspective.clone(),
            longterm: perspective,
            options_fno: None,
            market_sentiment: None,
        };
        let result = apply_authority_layer(block, &primary, 40.0, false, false);
        assert!(result.swing.entry.is_none());
        assert!(result.swing.confidence <= 40.0);
        assert_eq!(result.swing.action, "WAIT");
    }

    #[test]
    fn authority_layer_leaves_deterministic_bypass_untouched() {
        let primary = decision(Horizon::Swing, DecisionState::Reject);
        let block = deterministic_narrative("ACME", &primary);
        let entry_before = block.swing.entry;
        let result = apply_authority_layer(block, &primary, 0.0, false, true);
        assert_eq!(result.swing.entry, entry_before);
    }

    #[test]
    fn analysis_id_is_stable_length_hex() {
        let id = analysis_id("ACME");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
