use decision_core::HorizonNarrative;
use serde_json::Value;

use crate::error::{MLError, MLResult};

const HORIZON_KEYS: [&str; 4] = ["intraday", "swing", "positional", "longterm"];
const DEFAULT_SENTIMENT_SCORE: f64 = 50.0;

/// Defensive coercion/repair pass over a raw LLM JSON completion, run
/// before the payload is trusted as a `NarrativeBlock`. LLMs drift from a
/// requested schema in predictable ways — a single-key wrapper object, a
/// stringified-looking dict where a string was asked for, a missing
/// numeric field — and this function repairs each of those in place
/// rather than rejecting the whole response.
pub fn coerce(mut value: Value) -> MLResult<Value> {
    value = unwrap_single_key_wrapper(value);

    let Value::Object(ref mut obj) = value else {
        return Err(MLError::InvalidResponse("response is not a JSON object".to_string()));
    };

    if !obj.contains_key("executive_summary") {
        if let Some(ticker) = obj.get("ticker").and_then(|v| v.as_str()) {
            obj.insert("executive_summary".to_string(), Value::String(format!("Analysis for {ticker}")));
        }
    }

    stringify_if_object(obj, "investment_thesis");
    stringify_if_object(obj, "options_fno");
    coerce_market_sentiment(obj);

    for horizon in HORIZON_KEYS {
        if let Some(Value::Object(h)) = obj.get_mut(horizon) {
            repair_horizon(h);
        }
    }

    Ok(value)
}

fn unwrap_single_key_wrapper(value: Value) -> Value {
    if let Value::Object(ref obj) = value {
        if obj.len() == 1 {
            if let Some(inner) = obj.values().next() {
                if inner.is_object() {
                    return inner.clone();
                }
            }
        }
    }
    value
}

fn stringify_if_object(obj: &mut serde_json::Map<String, Value>, key: &str) {
    if let Some(v) = obj.get(key) {
        if v.is_object() {
            let stringified = v.to_string();
            obj.insert(key.to_string(), Value::String(stringified));
        }
    }
}

fn coerce_market_sentiment(obj: &mut serde_json::Map<String, Value>) {
    let Some(sentiment) = obj.get_mut("market_sentiment") else {
        return;
    };
    if !sentiment.is_object() {
        let label = match sentiment {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        *sentiment = Value::String(label);
        return;
    }
    if let Value::Object(s) = sentiment {
        for field in ["score", "fear_greed_index"] {
            let coerced = s.get(field).map(coerce_numeric).unwrap_or(DEFAULT_SENTIMENT_SCORE);
            s.insert(field.to_string(), Value::from(coerced));
        }
    }
}

fn coerce_numeric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(DEFAULT_SENTIMENT_SCORE),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            cleaned.parse().unwrap_or(DEFAULT_SENTIMENT_SCORE)
        }
        _ => DEFAULT_SENTIMENT_SCORE,
    }
}

fn repair_horizon(h: &mut serde_json::Map<String, Value>) {
    for numeric_field in ["entry_price", "target_price", "stop_loss", "confidence"] {
        let is_null = h.get(numeric_field).is_none_or(|v| v.is_null());
        if is_null {
            h.insert(numeric_field.to_string(), Value::from(0.0));
        }
    }
    if h.get("rationale").is_none_or(|v| v.is_null()) {
        h.insert("rationale".to_string(), Value::String("Synthesis complete.".to_string()));
    }
    let signals = h
        .get("signals")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let filtered: Vec<Value> = signals
        .into_iter()
        .filter(|s| s.get("value_at_analysis").is_some_and(|v| !v.is_null()))
        .collect();
    h.insert("signals".to_string(), Value::Array(filtered));
}

/// Converts a coerced horizon object into the canonical narrow type,
/// collapsing each surviving signal object down to a display label.
pub fn horizon_from_value(value: &Value) -> HorizonNarrative {
    let get_f64 = |key: &str| value.get(key).and_then(|v| v.as_f64());
    let signals = value
        .get("signals")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| {
                    s.get("name")
                        .or_else(|| s.get("label"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    HorizonNarrative {
        action: value
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("WAIT")
            .to_string(),
        confidence: get_f64("confidence").unwrap_or(0.0),
        entry: get_f64("entry_price"),
        target: get_f64("target_price"),
        stop: get_f64("stop_loss"),
        signals,
        rationale: value
            .get("rationale")
            .and_then(|v| v.as_str())
            .unwrap_or("Synthesis complete.")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_single_key_schema_wrapper() {
        let raw = json!({"AIAnalysisResult": {"executive_summary": "hi"}});
        let coerced = coerce(raw).unwrap();
        assert_eq!(coerced["executive_summary"], "hi");
    }

    #[test]
    fn repairs_missing_numeric_horizon_fields_to_zero() {
        let raw = json!({
            "executive_summary": "x",
            "intraday": {"action": "WAIT"}
        });
        let coerced = coerce(raw).unwrap();
        assert_eq!(coerced["intraday"]["confidence"], 0.0);
        assert_eq!(coerced["intraday"]["entry_price"], 0.0);
    }

    #[test]
    fn filters_signals_with_null_value_at_analysis() {
        let raw = json!({
            "executive_summary": "x",
            "intraday": {
                "action": "WAIT",
                "signals": [
                    {"name": "RSI", "value_at_analysis": 55.0},
                    {"name": "MACD", "value_at_analysis": null}
                ]
            }
        });
        let coerced = coerce(raw).unwrap();
        let signals = coerced["intraday"]["signals"].as_array().unwrap();
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn coerces_string_sentiment_scores_to_floats() {
        let raw = json!({
            "executive_summary": "x",
            "market_sentiment": {"score": "72%", "fear_greed_index": null}
        });
        let coerced = coerce(raw).unwrap();
        assert_eq!(coerced["market_sentiment"]["score"], 72.0);
        assert_eq!(coerced["market_sentiment"]["fear_greed_index"], 50.0);
    }

    #[test]
    fn stringifies_dict_valued_investment_thesis() {
        let raw = json!({
            "executive_summary": "x",
            "investment_thesis": {"bull": "up", "bear": "down"}
        });
        let coerced = coerce(raw).unwrap();
        assert!(coerced["investment_thesis"].is_string());
    }
}
