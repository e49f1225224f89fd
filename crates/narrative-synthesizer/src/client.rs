use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use decision_core::{AnalysisError, NarrativeBlock, NarrativeClient};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::coerce::{coerce, horizon_from_value};
use crate::error::MLError;

const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a professional multi-horizon equity analyst. Respond with strict JSON only.";

/// Configuration for the narrative synthesis backend.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub endpoint_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("ML_NARRATIVE_URL")
                .unwrap_or_else(|_| "http://localhost:8001/v1/completions".to_string()),
            api_key: std::env::var("ML_NARRATIVE_API_KEY").ok(),
            timeout: Duration::from_secs(45),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    system: &'a str,
    prompt: &'a str,
    response_format: &'static str,
}

/// Single-endpoint LLM narrative client. Where the wider platform spreads
/// bayesian/price-prediction/sentiment/social/earnings models across six
/// services, this decision core asks one JSON-completion endpoint for a
/// full `NarrativeBlock` and defensively repairs whatever comes back.
#[derive(Clone)]
pub struct HttpNarrativeClient {
    client: Client,
    config: NarrativeConfig,
    cache: Arc<DashMap<String, NarrativeBlock>>,
}

impl HttpNarrativeClient {
    pub fn new(config: NarrativeConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(20)
            .build()
            .expect("failed to build narrative HTTP client");

        Self {
            client,
            config,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(NarrativeConfig::default())
    }

    fn prompt_hash(prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(DEFAULT_SYSTEM_INSTRUCTION.as_bytes());
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn request_completion(&self, prompt: &str) -> Result<Value, MLError> {
        let mut request = self.client.post(&self.config.endpoint_url).json(&CompletionRequest {
            system: DEFAULT_SYSTEM_INSTRUCTION,
            prompt,
            response_format: "json_object",
        });

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MLError::ServiceUnavailable(format!(
                "narrative endpoint returned {status}"
            )));
        }

        let raw_text = response.text().await?;
        let cleaned = strip_code_fence(&raw_text);
        serde_json::from_str(&cleaned).map_err(MLError::from)
    }

    fn to_narrative_block(value: &Value) -> NarrativeBlock {
        let get_str = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);

        NarrativeBlock {
            executive_summary: get_str("executive_summary").unwrap_or_default(),
            intraday: horizon_from_value(value.get("intraday").unwrap_or(&Value::Null)),
            swing: horizon_from_value(value.get("swing").unwrap_or(&Value::Null)),
            positional: horizon_from_value(value.get("positional").unwrap_or(&Value::Null)),
            longterm: horizon_from_value(value.get("longterm").unwrap_or(&Value::Null)),
            options_fno: get_str("options_fno"),
            market_sentiment: market_sentiment_label(value.get("market_sentiment")),
        }
    }
}

fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let without_lang = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_lang.strip_suffix("```").unwrap_or(without_lang).trim().to_string()
}

fn market_sentiment_label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let summary = obj.get("summary").and_then(|v| v.as_str());
            let score = obj.get("score").and_then(|v| v.as_f64());
            match (summary, score) {
                (Some(summary), Some(score)) => Some(format!("{summary} (score: {score:.0})")),
                (Some(summary), None) => Some(summary.to_string()),
                (None, Some(score)) => Some(format!("score: {score:.0}")),
                (None, None) => None,
            }
        }
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl NarrativeClient for HttpNarrativeClient {
    async fn synthesize(&self, prompt: &str) -> Result<NarrativeBlock, AnalysisError> {
        let key = Self::prompt_hash(prompt);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(cache_key = %key, "narrative cache hit");
            return Ok(cached.clone());
        }

        let raw = self.request_completion(prompt).await.map_err(|e| {
            tracing::warn!(error = %e, "narrative endpoint call failed");
            AnalysisError::SensorError(e.to_string())
        })?;
        let coerced = coerce(raw).map_err(|e| AnalysisError::SensorError(e.to_string()))?;
        let block = Self::to_narrative_block(&coerced);

        self.cache.insert(key, block.clone());
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn market_sentiment_object_collapses_to_a_label() {
        let value = serde_json::json!({"summary": "Greedy", "score": 72.0});
        assert_eq!(market_sentiment_label(Some(&value)), Some("Greedy (score: 72)".to_string()));
    }

    #[test]
    fn prompt_hash_is_stable_for_identical_prompts() {
        assert_eq!(HttpNarrativeClient::prompt_hash("abc"), HttpNarrativeClient::prompt_hash("abc"));
    }
}
