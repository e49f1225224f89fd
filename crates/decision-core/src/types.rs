use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data, strictly ordered ascending by timestamp within a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

/// Company financials for one fiscal period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financials {
    pub symbol: String,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
    pub cash_flow_operating: Option<f64>,
    pub cash_flow_investing: Option<f64>,
    pub cash_flow_financing: Option<f64>,
}

/// Individual analyst rating action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystRating {
    pub price_target: Option<f64>,
    pub rating: Option<String>,
    pub rating_action: Option<String>,
    pub analyst: Option<String>,
    pub firm: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Consensus rating aggregated across analysts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRating {
    pub consensus_rating: Option<String>,
    pub consensus_price_target: Option<f64>,
    pub high_price_target: Option<f64>,
    pub low_price_target: Option<f64>,
    pub buy_count: Option<i32>,
    pub hold_count: Option<i32>,
    pub sell_count: Option<i32>,
    pub contributors: Option<i32>,
}

/// A single insider transaction, already filtered to material size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderTransaction {
    pub insider: String,
    pub relation: Option<String>,
    pub transaction_type: String,
    pub shares: f64,
    pub value: Option<f64>,
    pub date: DateTime<Utc>,
}

/// Upcoming or most-recent earnings calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub date: DateTime<Utc>,
    pub days_away: i64,
    pub eps_estimate: Option<f64>,
    pub revenue_estimate: Option<f64>,
}

/// Aggregated options-chain sentiment for the nearest liquid expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSentiment {
    pub put_call_ratio: Option<f64>,
    pub avg_implied_volatility: Option<f64>,
    pub compression_label: Option<String>,
    pub support_strike: Option<f64>,
    pub resistance_strike: Option<f64>,
}

/// Full market-context snapshot: everything context-sensor contributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketContext {
    pub analyst_ratings: Vec<AnalystRating>,
    pub consensus: Option<ConsensusRating>,
    pub price_target: Option<f64>,
    pub next_earnings: Option<EarningsEvent>,
    pub insider_activity: Vec<InsiderTransaction>,
    pub option_sentiment: Option<OptionSentiment>,
}

/// A single classified news headline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub published_utc: DateTime<Utc>,
    pub article_url: String,
    pub description: Option<String>,
    pub publisher: String,
    pub keywords: Vec<String>,
    pub tickers: Vec<String>,
}

/// Per-headline classification produced by the news aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSignal {
    pub title: String,
    pub publisher: String,
    pub published_utc: DateTime<Utc>,
    pub category: String,
    pub score: f64,
    pub is_primary_source: bool,
}

/// Aggregate news intelligence for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsIntelligence {
    pub items: Vec<NewsSignal>,
    pub signal_score: f64,
    pub noise_ratio: f64,
    pub source_diversity: f64,
    pub narrative_trap_warning: bool,
}

/// RSI directional reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiSignal {
    Bullish,
    Bearish,
    Neutral,
}

/// Trend-structure classification derived from EMA stack + ADX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStructure {
    Bullish,
    Bearish,
    Neutral,
    NeutralTransition,
}

/// Technical indicator snapshot for one (ticker, interval) pair.
///
/// Every numeric field is either finite or explicitly null; a null means
/// "could not be computed", never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Technicals {
    pub rsi: Option<f64>,
    pub rsi_signal: Option<RsiSignal>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub atr_percent: Option<f64>,
    pub cci: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_position: Option<f64>,
    pub pivot: Option<f64>,
    pub s1: Option<f64>,
    pub s2: Option<f64>,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    pub ema_20: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    pub volume_avg_20d: Option<f64>,
    pub volume_current: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub trend_structure: Option<TrendStructure>,
    pub last_close: Option<f64>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// A labeled, bounded score detail used throughout `AlgoSignal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub legend: String,
}

/// Volatility risk bucket derived from ATR%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRisk {
    Low,
    Moderate,
    High,
    VeryHigh,
    Unknown,
}

/// Output of the Bayesian scoring engine for one (ticker, interval) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgoSignal {
    pub p_win: f64,
    pub expected_value: f64,
    pub overall: ScoreDetail,
    pub trend: ScoreDetail,
    pub momentum: ScoreDetail,
    pub volatility: ScoreDetail,
    pub volume: ScoreDetail,
    pub confluence_score: i32,
    pub volatility_risk: VolatilityRisk,
    pub reason: String,
}

/// Net-cash vs net-debt balance sheet posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashPosition {
    NetCash,
    NetDebt,
}

/// Wide nullable fundamental metric record (Pass A output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalData {
    pub sector: Option<String>,
    pub price: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub earnings_yield: Option<f64>,
    pub enterprise_to_revenue: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub roic: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub free_cash_flow_margin: Option<f64>,
    pub fcf_to_ni_ratio: Option<f64>,
    pub net_income: Option<f64>,
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,
    pub net_cash: Option<f64>,
    pub cash_position: Option<CashPosition>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub revenue_growth_yoy: Option<f64>,
    pub eps: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub audit_risk: Option<f64>,
    pub board_risk: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub insider_ownership_pct: Option<f64>,
}

/// Qualitative inferences from Pass B's pillar rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalInferences {
    pub valuation: String,
    pub growth: String,
    pub financial_health: String,
    pub efficiency: String,
    pub earnings_quality: String,
}

/// Risk bucket produced by the multi-factor fundamental risk matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub factors: Vec<String>,
}

/// Letter grade from the composite quality engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
    F,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeQualityScore {
    pub score: f64,
    pub grade: QualityGrade,
    pub recommendation: String,
}

/// DCF terminal-value-dominance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcfStatus {
    Ok,
    TerminalValueDominantWarning,
}

/// One point on the terminal-growth sensitivity grid: the fair value per
/// share the model produces if the terminal growth assumption were this
/// instead of the base case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TerminalGrowthSensitivity {
    pub terminal_growth_rate: f64,
    pub fair_value_per_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfValuation {
    pub fair_value_per_share: f64,
    pub stage1_pv: f64,
    pub stage2_pv: f64,
    pub terminal_pv: f64,
    pub terminal_dominance: f64,
    pub discount_rate: f64,
    pub status: DcfStatus,
    pub terminal_growth_sensitivity: Vec<TerminalGrowthSensitivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrahamValuation {
    pub fair_value_per_share: Option<f64>,
    pub defined: bool,
}

/// Time horizon a trading decision is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    Intraday,
    Swing,
    Positional,
    LongTerm,
}

impl Horizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Intraday => "intraday",
            Horizon::Swing => "swing",
            Horizon::Positional => "positional",
            Horizon::LongTerm => "longterm",
        }
    }
}

/// Analysis mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    Full,
    Execution,
    Intraday,
    Swing,
    Positional,
    LongTerm,
    All,
}

/// Final authorized decision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionState {
    Accept,
    Wait,
    Reject,
}

/// Data-integrity state for one horizon's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupState {
    Valid,
    Degraded,
    Invalid,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupQuality {
    Low,
    Medium,
    High,
}

/// The canonical, authoritative per-horizon trading decision record.
///
/// Invariants (enforced by `trading-system` and re-checked by the
/// orchestrator's authority layer):
/// - `decision_state` in {Wait, Reject} implies `entry_zone`, `stop_loss`,
///   `take_profit`, `tp_targets` are all `None`/empty and
///   `position_size_pct` / `max_capital_at_risk` are `0.0`.
/// - `decision_state == Reject` implies `confidence == 0.0`, `setup_quality`
///   is `None`, and `violation_rules` is non-empty.
/// - `decision_state == Accept` implies `stop_loss` and `tp_targets` are
///   `Some`/non-empty and `risk_reward_ratio >= 1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingDecision {
    pub horizon: Horizon,
    pub decision_state: DecisionState,
    pub setup_state: SetupState,
    pub confidence: f64,
    pub primary_reason: String,
    pub violation_rules: Vec<String>,
    pub position_size_pct: f64,
    pub max_capital_at_risk: f64,
    pub risk_reward_ratio: f64,
    pub entry_zone: Option<(f64, f64)>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub tp_targets: Vec<f64>,
    pub setup_quality: Option<SetupQuality>,
}

impl TradingDecision {
    /// True when every cross-field invariant named above holds.
    pub fn is_internally_consistent(&self) -> bool {
        match self.decision_state {
            DecisionState::Wait | DecisionState::Reject => {
                let sized_zero = self.position_size_pct == 0.0 && self.max_capital_at_risk == 0.0;
                let levels_null = self.entry_zone.is_none()
                    && self.stop_loss.is_none()
                    && self.take_profit.is_none()
                    && self.tp_targets.is_empty();
                let reject_ok = self.decision_state != DecisionState::Reject
                    || (self.confidence == 0.0
                        && self.setup_quality.is_none()
                        && !self.violation_rules.is_empty());
                sized_zero && levels_null && reject_ok
            }
            DecisionState::Accept => {
                self.stop_loss.is_some()
                    && !self.tp_targets.is_empty()
                    && self.risk_reward_ratio >= 1.0
            }
        }
    }
}

/// Urgency tag surfaced in the execution block of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Immediate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub analysis_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionBlock {
    pub action: DecisionState,
    pub authorized: bool,
    pub urgency: Urgency,
    pub valid_until: DateTime<Utc>,
    pub risk_limits: TradingDecision,
    pub vetoes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalComponents {
    pub trend: f64,
    pub momentum: f64,
    pub expectancy: f64,
    pub valuation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalsBlock {
    pub actionable: bool,
    pub primary_signal_strength: f64,
    pub required_strength: f64,
    pub components: SignalComponents,
    pub normalization_method: String,
    pub expectancy_weighting: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsBlock {
    pub current: f64,
    pub timestamp: DateTime<Utc>,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub value_zones: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBlock {
    pub regime: String,
    pub regime_confidence: f64,
    pub trend_strength_adx: Option<f64>,
    pub volatility_atr_pct: Option<f64>,
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenarios {
    pub bullish: String,
    pub bearish: String,
    pub neutral: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanInsightBlock {
    pub summary: String,
    pub key_conflicts: Vec<String>,
    pub scenarios: Scenarios,
    pub monitor_triggers: Vec<String>,
    pub probability_basis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStateTaxonomy {
    pub technicals: String,
    pub fundamentals: String,
    pub context: String,
    pub news: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    pub confidence: f64,
    pub data_quality: String,
    pub blocking_issues: Vec<String>,
    pub data_state_taxonomy: DataStateTaxonomy,
    pub latency_ms: u64,
    pub layer_timings: serde_json::Value,
    pub next_update: DateTime<Utc>,
    pub latency_sla_violated: bool,
    pub sla_threshold_ms: u64,
    pub fallback_used: bool,
    pub engine_logic: String,
}

/// Single horizon perspective inside the optional narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonNarrative {
    pub action: String,
    pub confidence: f64,
    pub entry: Option<f64>,
    pub target: Option<f64>,
    pub stop: Option<f64>,
    pub signals: Vec<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeBlock {
    pub executive_summary: String,
    pub intraday: HorizonNarrative,
    pub swing: HorizonNarrative,
    pub positional: HorizonNarrative,
    pub longterm: HorizonNarrative,
    pub options_fno: Option<String>,
    pub market_sentiment: Option<String>,
}

/// Top-level response assembled by the orchestrator. `system.confidence`
/// is the single source of truth; every horizon confidence inside
/// `ai_analysis` must be less than or equal to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub meta: ResponseMeta,
    pub execution: ExecutionBlock,
    pub signals: SignalsBlock,
    pub levels: LevelsBlock,
    pub context: ContextBlock,
    pub human_insight: HumanInsightBlock,
    pub system: SystemBlock,
    pub market_context: Option<MarketContext>,
    pub ai_analysis: Option<NarrativeBlock>,
}
