mod polygon;
mod yahoo;
mod sensor;

pub use polygon::PolygonProvider;
pub use yahoo::YahooProvider;
pub use sensor::MarketDataSensor;

use async_trait::async_trait;
use decision_core::{AnalysisError, Bar, DataProvider};

/// Minimum bar count below which a series is considered a liquidity halt
/// rather than a usable history.
pub const MIN_BARS: usize = 20;

/// Tries each provider in order, returning the first success. The last
/// error is surfaced if every provider fails. The returned series is
/// tagged with which provider ultimately served it via `tracing`.
pub struct FailoverProvider {
    providers: Vec<Box<dyn DataProvider>>,
}

impl FailoverProvider {
    pub fn new(providers: Vec<Box<dyn DataProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl DataProvider for FailoverProvider {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let mut last_err = AnalysisError::SensorError("no providers configured".to_string());
        for provider in &self.providers {
            match provider.fetch_price_history(ticker, interval, period).await {
                Ok(bars) if bars.len() >= MIN_BARS => {
                    tracing::debug!(provider = provider.provider_name(), %ticker, bars = bars.len(), "price history served");
                    return Ok(bars);
                }
                Ok(bars) => {
                    tracing::warn!(provider = provider.provider_name(), %ticker, bars = bars.len(), "below liquidity floor, trying next provider");
                    last_err = AnalysisError::LiquidityHalt {
                        ticker: ticker.to_string(),
                        min_bars: MIN_BARS,
                    };
                }
                Err(e) => {
                    tracing::warn!(provider = provider.provider_name(), %ticker, error = %e, "provider failed, trying next");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn provider_name(&self) -> &'static str {
        "failover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        name: &'static str,
        result: Result<Vec<Bar>, AnalysisError>,
    }

    #[async_trait]
    impl DataProvider for StubProvider {
        async fn fetch_price_history(
            &self,
            _ticker: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<Bar>, AnalysisError> {
            match &self.result {
                Ok(bars) => Ok(bars.clone()),
                Err(_) => Err(AnalysisError::SensorError("stub failure".to_string())),
            }
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }

    fn bar() -> Bar {
        Bar {
            timestamp: chrono::Utc::now(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            vwap: None,
        }
    }

    #[tokio::test]
    async fn falls_through_to_second_provider_on_error() {
        let failover = FailoverProvider::new(vec![
            Box::new(StubProvider { name: "a", result: Err(AnalysisError::ProviderThrottled("x".into())) }),
            Box::new(StubProvider { name: "b", result: Ok(vec![bar(); 30]) }),
        ]);
        let bars = failover.fetch_price_history("AAPL", "1d", "1y").await.unwrap();
        assert_eq!(bars.len(), 30);
    }

    #[tokio::test]
    async fn surfaces_last_error_when_all_fail() {
        let failover = FailoverProvider::new(vec![
            Box::new(StubProvider { name: "a", result: Err(AnalysisError::ProviderThrottled("x".into())) }),
            Box::new(StubProvider { name: "b", result: Ok(vec![bar(); 3]) }),
        ]);
        let err = failover.fetch_price_history("AAPL", "1d", "1y").await.unwrap_err();
        assert!(matches!(err, AnalysisError::LiquidityHalt { .. }));
    }
}
