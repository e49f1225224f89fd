use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use decision_core::{AnalysisError, Bar, DataProvider};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("rate limiter: waiting {:.1}s for a Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Aggregates-API-backed `DataProvider`, the primary vendor.
#[derive(Clone)]
pub struct PolygonProvider {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonProvider {
    pub fn new(api_key: String) -> Self {
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::SensorError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::SensorError("cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::SensorError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            tracing::warn!("Polygon 429 rate limited, retry {}/3", attempt + 1);
            tokio::time::sleep(Duration::from_secs(15)).await;
        }

        Err(AnalysisError::ProviderThrottled("rate limited by Polygon after 3 retries".to_string()))
    }

    fn multiplier_and_timespan(interval: &str) -> (u32, &'static str) {
        match interval {
            "1m" => (1, "minute"),
            "5m" => (5, "minute"),
            "15m" => (15, "minute"),
            "30m" => (30, "minute"),
            "1h" | "60m" => (1, "hour"),
            "1d" => (1, "day"),
            "1wk" => (1, "week"),
            _ => (1, "day"),
        }
    }

    fn period_to_days(period: &str) -> i64 {
        match period {
            "60d" => 60,
            "1y" => 365,
            "5y" => 365 * 5,
            _ => 365,
        }
    }
}

#[async_trait]
impl DataProvider for PolygonProvider {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let (multiplier, timespan) = Self::multiplier_and_timespan(interval);
        let to = Utc::now();
        let from = to - chrono::Duration::days(Self::period_to_days(period));

        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            BASE_URL,
            ticker,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("apiKey", self.api_key.as_str()), ("adjusted", "true")]),
            )
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AnalysisError::TickerNotFound(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(AnalysisError::SensorError(format!(
                "Polygon HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::SensorError(e.to_string()))?;

        if agg_response.results.is_empty() {
            return Err(AnalysisError::TickerNotFound(ticker.to_string()));
        }

        Ok(agg_response
            .results
            .into_iter()
            .map(|r| Bar {
                timestamp: DateTime::from_timestamp_millis(r.t).unwrap_or_else(Utc::now),
                open: r.o,
                high: r.h,
                low: r.l,
                close: r.c,
                volume: r.v,
                vwap: r.vw,
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "polygon"
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    #[serde(default)]
    vw: Option<f64>,
}
