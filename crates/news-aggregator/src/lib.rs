use decision_core::{NewsArticle, NewsIntelligence, NewsSignal};
use std::collections::HashSet;

pub mod velocity;
pub use velocity::{
    NarrativeShift, SentimentDataPoint, SentimentDynamics, SentimentVelocityCalculator,
    VelocitySignal,
};

const NOISE_KEYWORDS: &[&str] = &[
    "best momentum",
    "top stocks",
    "stocks to watch",
    "is it too late",
    "strong buy",
    "buy these",
    "emerging ai",
    "must-buy",
    "analyst blog",
];

const SIGNAL_KEYWORDS: &[&str] = &[
    "earnings",
    "revenue",
    "guidance",
    "contract",
    "sec filing",
    "10-q",
    "10-k",
    "acquisition",
    "merger",
    "ceo",
    "cfo",
    "dividend",
    "buyback",
];

const MOMENTUM_UP_WORDS: &[&str] = &["rally", "up", "rise", "gain"];
const MOMENTUM_DOWN_WORDS: &[&str] = &["drop", "pullback", "down", "fall", "loss"];

const NOISE_SCORE: f64 = -50.0;
const SIGNAL_SCORE: f64 = 80.0;
const MOMENTUM_SCORE: f64 = 20.0;
const MAX_HEADLINES: usize = 20;
const NARRATIVE_TRAP_NOISE_RATIO_PCT: f64 = 60.0;
const NARRATIVE_TRAP_SOURCE_DIVERSITY: f64 = 0.3;

/// Fan-out, dedup, and signal/noise classification over a ticker's news
/// feed, implemented as a pure function over an already-fetched article
/// list — the fan-out to multiple sources happens one layer up, in the
/// orchestrator.
pub struct NewsAggregator;

impl Default for NewsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, articles: &[NewsArticle]) -> NewsIntelligence {
        let deduped = dedup_by_title(articles);

        if deduped.is_empty() {
            return NewsIntelligence {
                items: Vec::new(),
                signal_score: 0.0,
                noise_ratio: 0.0,
                source_diversity: 0.0,
                narrative_trap_warning: false,
            };
        }

        let mut sorted = deduped;
        sorted.sort_by(|a, b| b.published_utc.cmp(&a.published_utc));
        sorted.truncate(MAX_HEADLINES);

        let mut publishers = HashSet::new();
        let mut noise_count = 0u32;
        let items: Vec<NewsSignal> = sorted
            .iter()
            .map(|article| {
                publishers.insert(article.publisher.to_lowercase());
                let (score, category, is_primary) = classify(&article.title);
                if score < 0.0 {
                    noise_count += 1;
                }
                NewsSignal {
                    title: article.title.clone(),
                    publisher: article.publisher.clone(),
                    published_utc: article.published_utc,
                    category: category.to_string(),
                    score,
                    is_primary_source: is_primary,
                }
            })
            .collect();

        let total = items.len() as f64;
        let noise_ratio = (noise_count as f64 / total) * 100.0;
        let source_diversity = publishers.len() as f64 / total;
        let signal_score = items.iter().map(|s| s.score).sum::<f64>() / total;

        let narrative_trap_warning =
            noise_ratio > NARRATIVE_TRAP_NOISE_RATIO_PCT && source_diversity < NARRATIVE_TRAP_SOURCE_DIVERSITY;

        NewsIntelligence {
            items,
            signal_score,
            noise_ratio,
            source_diversity,
            narrative_trap_warning,
        }
    }
}

fn dedup_by_title(articles: &[NewsArticle]) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(articles.len());
    for article in articles {
        let key = article.title.trim().to_lowercase();
        if seen.insert(key) {
            out.push(article.clone());
        }
    }
    out
}

fn classify(title: &str) -> (f64, &'static str, bool) {
    let lower = title.to_lowercase();

    if NOISE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return (NOISE_SCORE, "Hype/Noise", false);
    }
    if SIGNAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return (SIGNAL_SCORE, "Fundamental", true);
    }
    if MOMENTUM_UP_WORDS.iter().any(|w| lower.contains(w)) {
        return (MOMENTUM_SCORE, "Momentum", false);
    }
    if MOMENTUM_DOWN_WORDS.iter().any(|w| lower.contains(w)) {
        return (-MOMENTUM_SCORE, "Momentum", false);
    }
    (0.0, "Neutral", false)
}
