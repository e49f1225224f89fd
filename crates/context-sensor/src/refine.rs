use chrono::{Duration, Utc};
use decision_core::{InsiderTransaction, MarketContext, OptionSentiment};

use crate::source::{RawContextData, RawOptionChain};

const ANALYST_RATING_MAX_AGE_DAYS: i64 = 730;
const INSIDER_MATERIALITY_MIN_VALUE: f64 = 100_000.0;
const INSIDER_MATERIALITY_MIN_SHARES: f64 = 5_000.0;
const INSIDER_TOP_N: usize = 5;
const HIGH_COMPRESSION_IV_PCT: f64 = 100.0;

/// Applies the 24-month analyst-rating cutoff, the insider materiality
/// filter (top 5 by recency among trades ≥$100k or ≥5,000 shares), and the
/// options sentiment/compression label to a raw vendor pull.
pub fn refine(raw: RawContextData) -> MarketContext {
    let cutoff = Utc::now() - Duration::days(ANALYST_RATING_MAX_AGE_DAYS);
    let analyst_ratings = raw
        .analyst_ratings
        .into_iter()
        .filter(|r| r.date.map(|d| d >= cutoff).unwrap_or(false))
        .collect();

    MarketContext {
        analyst_ratings,
        consensus: raw.consensus,
        price_target: raw.price_target,
        next_earnings: raw.next_earnings,
        insider_activity: filter_material_insider_activity(raw.insider_activity),
        option_sentiment: raw.option_chain.and_then(build_option_sentiment),
    }
}

fn filter_material_insider_activity(activity: Vec<InsiderTransaction>) -> Vec<InsiderTransaction> {
    let mut material: Vec<InsiderTransaction> = activity
        .into_iter()
        .filter(|t| {
            t.value.unwrap_or(0.0) >= INSIDER_MATERIALITY_MIN_VALUE
                || t.shares >= INSIDER_MATERIALITY_MIN_SHARES
        })
        .collect();
    material.sort_by(|a, b| b.date.cmp(&a.date));
    material.truncate(INSIDER_TOP_N);
    material
}

fn build_option_sentiment(chain: RawOptionChain) -> Option<OptionSentiment> {
    let pc_ratio = chain.put_call_ratio?;
    Some(OptionSentiment {
        put_call_ratio: Some(round2(pc_ratio)),
        avg_implied_volatility: chain.avg_implied_volatility_pct,
        compression_label: Some(compression_label(pc_ratio, chain.avg_implied_volatility_pct)),
        support_strike: chain.put_oi_max_strike,
        resistance_strike: chain.call_oi_max_strike,
    })
}

fn compression_label(pc_ratio: f64, avg_iv_pct: Option<f64>) -> String {
    let base = if pc_ratio > 1.0 {
        "Bearish"
    } else if pc_ratio < 0.7 {
        "Bullish"
    } else {
        "Neutral"
    };
    match avg_iv_pct {
        Some(iv) if iv > HIGH_COMPRESSION_IV_PCT => format!("High Compression ({base})"),
        _ => base.to_string(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(value: Option<f64>, shares: f64, days_ago: i64) -> InsiderTransaction {
        InsiderTransaction {
            insider: "Jane Doe".to_string(),
            relation: Some("CFO".to_string()),
            transaction_type: "Sell".to_string(),
            shares,
            value,
            date: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn drops_immaterial_insider_trades() {
        let raw = RawContextData {
            insider_activity: vec![transaction(Some(1_000.0), 100.0, 1)],
            ..Default::default()
        };
        let ctx = refine(raw);
        assert!(ctx.insider_activity.is_empty());
    }

    #[test]
    fn keeps_top_five_material_trades_by_recency() {
        let mut trades: Vec<InsiderTransaction> =
            (0..8).map(|i| transaction(Some(200_000.0), 10_000.0, i)).collect();
        trades.reverse();
        let raw = RawContextData {
            insider_activity: trades,
            ..Default::default()
        };
        let ctx = refine(raw);
        assert_eq!(ctx.insider_activity.len(), 5);
    }

    #[test]
    fn high_iv_gets_compression_label() {
        let raw = RawContextData {
            option_chain: Some(RawOptionChain {
                put_call_ratio: Some(0.5),
                avg_implied_volatility_pct: Some(150.0),
                call_oi_max_strike: Some(110.0),
                put_oi_max_strike: Some(90.0),
            }),
            ..Default::default()
        };
        let ctx = refine(raw);
        let sentiment = ctx.option_sentiment.unwrap();
        assert_eq!(sentiment.compression_label.unwrap(), "High Compression (Bullish)");
    }

    #[test]
    fn normal_iv_has_plain_label() {
        let raw = RawContextData {
            option_chain: Some(RawOptionChain {
                put_call_ratio: Some(1.2),
                avg_implied_volatility_pct: Some(40.0),
                call_oi_max_strike: None,
                put_oi_max_strike: None,
            }),
            ..Default::default()
        };
        let ctx = refine(raw);
        assert_eq!(ctx.option_sentiment.unwrap().compression_label.unwrap(), "Bearish");
    }

    #[test]
    fn stale_analyst_ratings_are_dropped() {
        use decision_core::AnalystRating;
        let raw = RawContextData {
            analyst_ratings: vec![AnalystRating {
                price_target: Some(100.0),
                rating: Some("Buy".to_string()),
                rating_action: Some("Upgrade".to_string()),
                analyst: None,
                firm: Some("Acme".to_string()),
                date: Some(Utc::now() - Duration::days(800)),
            }],
            ..Default::default()
        };
        let ctx = refine(raw);
        assert!(ctx.analyst_ratings.is_empty());
    }
}
