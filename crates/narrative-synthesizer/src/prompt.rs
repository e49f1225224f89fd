use decision_core::{
    AlgoSignal, AnalysisMode, FundamentalData, FundamentalInferences, MarketContext, Technicals,
    TradingDecision,
};

const MAX_HEADLINES: usize = 10;

/// Everything the prompt template needs, gathered from the upstream
/// engines by the orchestrator before a narrative call is made.
pub struct NarrativeRequest<'a> {
    pub ticker: &'a str,
    pub mode: AnalysisMode,
    pub current_price: f64,
    pub data_confidence: f64,
    pub technicals: Option<&'a Technicals>,
    pub algo_signal: Option<&'a AlgoSignal>,
    pub horizon_decisions: &'a [TradingDecision],
    pub fundamentals: Option<(&'a FundamentalData, &'a FundamentalInferences)>,
    pub market_context: Option<&'a MarketContext>,
    pub news_headlines: &'a [String],
}

/// Renders the instruction prompt sent to the narrative endpoint. Mirrors
/// the structured-report template used by this system's own AI layer:
/// a `<MARKET_DATA>` block followed by strict formatting instructions,
/// so the model has no room to improvise a different schema.
pub fn build_prompt(request: &NarrativeRequest) -> String {
    let horizons_json = serde_json::to_string_pretty(request.horizon_decisions).unwrap_or_default();
    let technicals_json = request
        .technicals
        .map(|t| serde_json::to_string_pretty(t).unwrap_or_default())
        .unwrap_or_else(|| "{}".to_string());
    let algo_json = request
        .algo_signal
        .map(|a| serde_json::to_string_pretty(a).unwrap_or_default())
        .unwrap_or_else(|| "{}".to_string());
    let fund_summary = request
        .fundamentals
        .map(|(_, inferences)| inferences.financial_health.clone())
        .unwrap_or_else(|| "N/A".to_string());
    let context_json = request
        .market_context
        .map(|c| serde_json::to_string_pretty(c).unwrap_or_default())
        .unwrap_or_else(|| "{}".to_string());
    let news_json = serde_json::to_string(
        &request.news_headlines.iter().take(MAX_HEADLINES).collect::<Vec<_>>(),
    )
    .unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Perform a professional, multi-horizon financial analysis for {ticker} using the provided data.

<MARKET_DATA>
Ticker: {ticker}
Analysis Mode: {mode:?}
System Confidence: {confidence:.1}

Technical Indicators:
{technicals_json}

Primary Algo Signal:
{algo_json}

Multi-Horizon Decisions:
{horizons_json}

Fundamental Assessment:
{fund_summary}

Smart Money Context:
{context_json}

Latest News Headlines:
{news_json}
</MARKET_DATA>

STRICT INSTRUCTIONS:
1. Base your analysis ONLY on the data provided inside the <MARKET_DATA> tags.
2. Return strict JSON matching: executive_summary, intraday, swing, positional,
   longterm (each an object with action, confidence, entry_price, target_price,
   stop_loss, signals, rationale), options_fno, market_sentiment.
3. No horizon's confidence may exceed the system confidence of {confidence:.1}.
"#,
        ticker = request.ticker,
        mode = request.mode,
        confidence = request.data_confidence,
    )
}
