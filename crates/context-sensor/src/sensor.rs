use async_trait::async_trait;
use decision_core::{AnalysisError, ContextProvider, MarketContext};
use distributed_cache::{cache_key, TtlStore};

use crate::refine::refine;
use crate::source::RawContextSource;

const CACHE_TTL_SECS: i64 = 300;
const COMPONENT_VERSION: &str = "v1";

/// Cached wrapper over a `RawContextSource`. Mirrors `market-data`'s
/// `MarketDataSensor`: the raw fetch is refined and cached under one
/// versioned key per ticker.
pub struct ContextSensor<S: RawContextSource> {
    source: S,
    cache: TtlStore<MarketContext>,
}

impl<S: RawContextSource> ContextSensor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: TtlStore::new(CACHE_TTL_SECS),
        }
    }

    pub async fn get_context(&self, ticker: &str) -> Result<MarketContext, AnalysisError> {
        let key = cache_key("context-sensor", COMPONENT_VERSION, ticker, &[]);
        if let Some(ctx) = self.cache.get(&key) {
            tracing::debug!(%ticker, "context cache hit");
            return Ok(ctx);
        }

        let raw = self.source.fetch_raw(ticker).await?;
        let context = refine(raw);
        self.cache.insert(key, context.clone());
        Ok(context)
    }
}

#[async_trait]
impl<S: RawContextSource> ContextProvider for ContextSensor<S> {
    async fn fetch_context(&self, ticker: &str) -> Result<MarketContext, AnalysisError> {
        self.get_context(ticker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawContextData;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RawContextSource for CountingSource {
        async fn fetch_raw(&self, _ticker: &str) -> Result<RawContextData, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawContextData::default())
        }
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let sensor = ContextSensor::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        sensor.get_context("AAPL").await.unwrap();
        sensor.get_context("AAPL").await.unwrap();
        assert_eq!(sensor.source.calls.load(Ordering::SeqCst), 1);
    }
}
