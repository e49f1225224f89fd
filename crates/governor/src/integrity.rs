use decision_core::{MarketContext, Technicals};

/// Data quality verdict for one horizon's inputs, surfaced verbatim into
/// `DataStateTaxonomy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataIntegrity {
    Valid,
    Degraded,
    Invalid,
}

impl DataIntegrity {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataIntegrity::Valid => "VALID",
            DataIntegrity::Degraded => "DEGRADED",
            DataIntegrity::Invalid => "INVALID",
        }
    }
}

const IV_POISON_THRESHOLD: f64 = 200.0;

/// Comprehensive data quality assessment with locale awareness: tickers with
/// a dot (international listings) commonly lack options/insider coverage in
/// upstream feeds, and that alone should not degrade an otherwise-clean read.
pub fn assess_data_integrity(
    technicals: &Technicals,
    context: Option<&MarketContext>,
    ticker: &str,
) -> DataIntegrity {
    if technicals.rsi.is_none() || technicals.macd_histogram.is_none() {
        return DataIntegrity::Invalid;
    }

    let mut poisoned = 0u32;
    if technicals.cci.is_none() {
        poisoned += 1;
    }
    if technicals.volume_ratio.is_none() {
        poisoned += 1;
    }
    if let Some(ctx) = context {
        if let Some(iv) = ctx
            .option_sentiment
            .as_ref()
            .and_then(|o| o.avg_implied_volatility)
        {
            if iv > IV_POISON_THRESHOLD {
                poisoned += 1;
            }
        }
    }

    if poisoned > 0 {
        let is_international = ticker.contains('.');
        if is_international && technicals.cci.is_some() {
            return DataIntegrity::Valid;
        }
        return DataIntegrity::Degraded;
    }

    DataIntegrity::Valid
}
