use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use decision_core::{AnalysisError, Bar, DataProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Secondary, chart-API-backed `DataProvider`. Used as a failover when
/// the primary vendor is throttled or unavailable.
#[derive(Clone)]
pub struct YahooProvider {
    client: Client,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; market-data/1.0)")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    fn interval_param(interval: &str) -> &'static str {
        match interval {
            "1m" => "1m",
            "5m" => "5m",
            "15m" => "15m",
            "30m" => "30m",
            "1h" | "60m" => "60m",
            "1d" => "1d",
            "1wk" => "1wk",
            _ => "1d",
        }
    }

    fn range_param(period: &str) -> &'static str {
        match period {
            "60d" => "60d",
            "1y" => "1y",
            "5y" => "5y",
            _ => "1y",
        }
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!("{}/{}", CHART_BASE_URL, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", Self::interval_param(interval)),
                ("range", Self::range_param(period)),
            ])
            .send()
            .await
            .map_err(|e| AnalysisError::SensorError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::SensorError(format!(
                "Yahoo chart HTTP {}",
                response.status()
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::SensorError(e.to_string()))?;

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| AnalysisError::TickerNotFound(ticker.to_string()))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::SensorError("Yahoo chart missing quote block".to_string()))?;

        let opens = quote.open.unwrap_or_default();
        let highs = quote.high.unwrap_or_default();
        let lows = quote.low.unwrap_or_default();
        let closes = quote.close.unwrap_or_default();
        let volumes = quote.volume.unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let (Some(o), Some(h), Some(l), Some(c)) = (
                opens.get(i).copied().flatten(),
                highs.get(i).copied().flatten(),
                lows.get(i).copied().flatten(),
                closes.get(i).copied().flatten(),
            ) else {
                continue;
            };
            let v = volumes.get(i).copied().flatten().unwrap_or(0.0);
            bars.push(Bar {
                timestamp: Utc.timestamp_opt(*ts, 0).single().unwrap_or_else(Utc::now),
                open: o,
                high: h,
                low: l,
                close: c,
                volume: v,
                vwap: None,
            });
        }

        Ok(bars)
    }

    fn provider_name(&self) -> &'static str {
        "yahoo"
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}
