use async_trait::async_trait;
use decision_core::{AnalysisError, AnalystRating, ConsensusRating, EarningsEvent, InsiderTransaction};

/// Options-chain aggregates for the nearest liquid expiry, before the
/// sentiment label and open-interest walls are derived.
#[derive(Debug, Clone, Default)]
pub struct RawOptionChain {
    pub put_call_ratio: Option<f64>,
    pub avg_implied_volatility_pct: Option<f64>,
    pub call_oi_max_strike: Option<f64>,
    pub put_oi_max_strike: Option<f64>,
}

/// Unfiltered context pull for one ticker, as the vendor returns it. Still
/// needs the recency cutoff, materiality filter, and options labeling that
/// `refine` applies.
#[derive(Debug, Clone, Default)]
pub struct RawContextData {
    pub analyst_ratings: Vec<AnalystRating>,
    pub price_target: Option<f64>,
    pub consensus: Option<ConsensusRating>,
    pub next_earnings: Option<EarningsEvent>,
    pub insider_activity: Vec<InsiderTransaction>,
    pub option_chain: Option<RawOptionChain>,
}

/// A vendor-specific feed of raw analyst/insider/options data, composed
/// behind `ContextSensor`'s caching and filtering.
#[async_trait]
pub trait RawContextSource: Send + Sync {
    async fn fetch_raw(&self, ticker: &str) -> Result<RawContextData, AnalysisError>;
}
