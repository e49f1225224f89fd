use decision_core::{AnalysisError, Bar, RsiSignal, Technicals, TrendStructure};

use crate::indicators::*;

/// Minimum history required before any indicator is trusted.
pub const MIN_BARS_FOR_TECHNICALS: usize = 50;

/// Poison thresholds: a computed value outside these bounds is replaced
/// by `None` rather than trusted downstream.
const CCI_POISON_ABS: f64 = 5000.0;
const VOLUME_RATIO_POISON_MIN: f64 = 0.0;
const VOLUME_RATIO_POISON_MAX: f64 = 100.0;

pub struct IndicatorEngine;

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the full `Technicals` snapshot for an ordered bar series.
    /// Series shorter than `MIN_BARS_FOR_TECHNICALS` produce an
    /// all-null record rather than an error: a thin history is a
    /// legitimate, if low-confidence, state for a young listing.
    pub fn compute(&self, bars: &[Bar]) -> Technicals {
        if bars.len() < MIN_BARS_FOR_TECHNICALS {
            return Technicals {
                trend_structure: Some(TrendStructure::Neutral),
                rsi_signal: Some(RsiSignal::Neutral),
                ..Default::default()
            };
        }

        let Some(anchor) = last_usable_index(bars) else {
            return Technicals {
                trend_structure: Some(TrendStructure::Neutral),
                rsi_signal: Some(RsiSignal::Neutral),
                ..Default::default()
            };
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let rsi_series = rsi(&closes, 14);
        let macd_result = macd(&closes, 12, 26, 9);
        let adx_result = adx(bars, 14);
        let atr_series = atr(bars, 14);
        let cci_series = cci(bars, 20);
        let bb = bollinger_bands(&closes, 20, 2.0);
        let ema20 = ema(&closes, 20);
        let ema50 = ema(&closes, 50);
        let ema200 = ema(&closes, 200);
        let vol_avg20 = sma(&volumes, 20);
        let pivots = pivot_points(&bars[..=anchor]);

        let close = closes[anchor];

        let rsi_val = last_aligned(&rsi_series, anchor, closes.len());
        let macd_line = last_aligned(&macd_result.macd_line, anchor, closes.len());
        let macd_signal = last_aligned(&macd_result.signal_line, anchor, closes.len());
        let macd_hist = last_aligned(&macd_result.histogram, anchor, closes.len());
        let adx_val = last_aligned(&adx_result.adx, anchor, closes.len());
        let atr_val = last_aligned(&atr_series, anchor, closes.len());
        let cci_val = last_aligned(&cci_series, anchor, closes.len());
        let bb_upper = last_aligned(&bb.upper, anchor, closes.len());
        let bb_middle = last_aligned(&bb.middle, anchor, closes.len());
        let bb_lower = last_aligned(&bb.lower, anchor, closes.len());
        let ema_20 = ema20.get(anchor).copied();
        let ema_50 = ema50.get(anchor).copied();
        let ema_200 = ema200.get(anchor).copied();
        let vol_avg = last_aligned(&vol_avg20, anchor, closes.len());

        let atr_percent = atr_val.filter(|_| close > 0.0).zip(Some(close)).map(|(a, c)| a / c * 100.0);

        let volume_ratio = match (vol_avg, Some(volumes[anchor])) {
            (Some(avg), Some(cur)) if avg > 0.0 => Some(cur / avg),
            _ => None,
        };
        let volume_ratio = volume_ratio.filter(|r| *r >= VOLUME_RATIO_POISON_MIN && *r <= VOLUME_RATIO_POISON_MAX);

        let cci_val = cci_val.filter(|c| c.abs() <= CCI_POISON_ABS);

        let bb_position = match (bb_upper, bb_lower, bb_middle) {
            (Some(u), Some(l), _) if (u - l).abs() > f64::EPSILON => Some((close - l) / (u - l)),
            _ => None,
        };

        let rsi_signal = rsi_val.map(|r| {
            if r < 30.0 {
                if ema_50.map(|e| close >= e).unwrap_or(false) {
                    RsiSignal::Bullish
                } else {
                    RsiSignal::Neutral
                }
            } else if r > 70.0 {
                RsiSignal::Bearish
            } else {
                RsiSignal::Neutral
            }
        });

        let trend_structure = Some(trend_structure(close, adx_val, ema_20, ema_50, ema_200));

        Technicals {
            rsi: rsi_val,
            rsi_signal,
            macd_line,
            macd_signal,
            macd_histogram: macd_hist,
            adx: adx_val,
            atr: atr_val,
            atr_percent,
            cci: cci_val,
            bb_upper,
            bb_middle,
            bb_lower,
            bb_position,
            pivot: pivots.as_ref().map(|p| p.pivot),
            s1: pivots.as_ref().map(|p| p.s1),
            s2: pivots.as_ref().map(|p| p.s2),
            r1: pivots.as_ref().map(|p| p.r1),
            r2: pivots.as_ref().map(|p| p.r2),
            ema_20,
            ema_50,
            ema_200,
            volume_avg_20d: vol_avg,
            volume_current: Some(volumes[anchor]),
            volume_ratio,
            trend_structure,
            last_close: Some(close),
            last_timestamp: Some(bars[anchor].timestamp),
        }
    }

    /// Variant that reports a terminal error instead of an all-null
    /// record, for callers where the pipeline is a hard dependency.
    pub fn compute_or_fail(&self, bars: &[Bar]) -> Result<Technicals, AnalysisError> {
        if bars.len() < MIN_BARS_FOR_TECHNICALS {
            return Err(AnalysisError::TechnicalPipelineFailed(format!(
                "need at least {} bars, got {}",
                MIN_BARS_FOR_TECHNICALS,
                bars.len()
            )));
        }
        Ok(self.compute(bars))
    }
}

/// Index of the last bar with a finite close, preferring the very last
/// bar and falling back one step at a time.
fn last_usable_index(bars: &[Bar]) -> Option<usize> {
    (0..bars.len()).rev().find(|&i| bars[i].close.is_finite())
}

/// Indicator series are shorter than the input due to warm-up windows;
/// this maps the bar-space `anchor` index to the series' own last
/// populated slot, never over-reading the series.
fn last_aligned(series: &[f64], anchor: usize, total_len: usize) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let offset = total_len.saturating_sub(series.len());
    if anchor < offset {
        return None;
    }
    series.get(anchor - offset).copied().filter(|v| v.is_finite())
}

fn trend_structure(
    close: f64,
    adx: Option<f64>,
    ema20: Option<f64>,
    ema50: Option<f64>,
    ema200: Option<f64>,
) -> TrendStructure {
    if adx.map(|a| a < 20.0).unwrap_or(true) {
        return TrendStructure::NeutralTransition;
    }

    match (ema20, ema50, ema200) {
        (Some(e20), Some(e50), Some(e200)) => {
            if close > e20 && e20 > e50 && e50 > e200 {
                TrendStructure::Bullish
            } else if close < e20 && e20 < e50 && e50 < e200 {
                TrendStructure::Bearish
            } else if close > e200 && e50 > e200 {
                TrendStructure::Bullish
            } else if close < e200 && e50 < e200 {
                TrendStructure::Bearish
            } else {
                TrendStructure::Neutral
            }
        }
        _ => TrendStructure::Neutral,
    }
}
