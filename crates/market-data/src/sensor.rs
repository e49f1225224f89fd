use decision_core::{AnalysisError, Bar, DataProvider};
use distributed_cache::{cache_key, TtlStore};

use crate::FailoverProvider;

const CACHE_TTL_SECS: i64 = 300;
const COMPONENT_VERSION: &str = "v1";

/// Cached wrapper over a `FailoverProvider`. Determines the lookback
/// `period` from the requested `interval`: intraday intervals of 60
/// minutes or less use a 60-day window, everything else uses 1 year.
pub struct MarketDataSensor {
    provider: FailoverProvider,
    cache: TtlStore<Vec<Bar>>,
}

impl MarketDataSensor {
    pub fn new(provider: FailoverProvider) -> Self {
        Self {
            provider,
            cache: TtlStore::new(CACHE_TTL_SECS),
        }
    }

    fn period_for(interval: &str) -> &'static str {
        match interval {
            "1m" | "5m" | "15m" | "30m" | "1h" | "60m" => "60d",
            _ => "1y",
        }
    }

    pub async fn get_bars(&self, ticker: &str, interval: &str) -> Result<Vec<Bar>, AnalysisError> {
        let key = cache_key("market-data", COMPONENT_VERSION, ticker, &[interval]);
        if let Some(bars) = self.cache.get(&key) {
            tracing::debug!(%ticker, %interval, "market data cache hit");
            return Ok(bars);
        }

        let period = Self::period_for(interval);
        let bars = self.provider.fetch_price_history(ticker, interval, period).await?;
        self.cache.insert(key, bars.clone());
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CountingProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl DataProvider for CountingProvider {
        async fn fetch_price_history(
            &self,
            _ticker: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<Bar>, AnalysisError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![
                Bar {
                    timestamp: chrono::Utc::now(),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1.0,
                    vwap: None,
                };
                25
            ])
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let failover = FailoverProvider::new(vec![Box::new(CountingProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
        })]);
        let sensor = MarketDataSensor::new(failover);
        sensor.get_bars("AAPL", "1d").await.unwrap();
        let bars = sensor.get_bars("AAPL", "1d").await.unwrap();
        assert_eq!(bars.len(), 25);
    }
}
