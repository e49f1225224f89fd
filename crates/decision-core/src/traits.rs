use async_trait::async_trait;
use crate::{AnalysisError, Bar, MarketContext, NarrativeBlock};

/// A source of raw OHLCV history, implemented once per vendor and
/// composed behind a failover chain by `market-data`.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch an ordered bar series for `ticker` at `interval` (e.g. "5m",
    /// "1d") covering `period` (e.g. "60d", "1y").
    async fn fetch_price_history(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<Bar>, AnalysisError>;

    /// Vendor name, attached to the returned payload for observability.
    fn provider_name(&self) -> &'static str;
}

/// A source of analyst/insider/options context, implemented by
/// `context-sensor`.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn fetch_context(&self, ticker: &str) -> Result<MarketContext, AnalysisError>;
}

/// Abstraction over the external LLM narrative backend, implemented by
/// `narrative-synthesizer`. Kept generic so the orchestrator can be
/// tested against a deterministic stub without a live model endpoint.
#[async_trait]
pub trait NarrativeClient: Send + Sync {
    async fn synthesize(&self, prompt: &str) -> Result<NarrativeBlock, AnalysisError>;
}
