use decision_core::{AlgoSignal, ScoreDetail, Technicals, TrendStructure, VolatilityRisk};

const ATR_PENALTY_THRESHOLD: f64 = 3.5;
const ATR_PENALTY_FACTOR: f64 = 0.75;
const P_WIN_FLOOR: f64 = 0.10;
const P_WIN_CEILING: f64 = 0.90;
const TARGET_REWARD_TO_RISK: f64 = 2.0;
const ADX_TRENDING_THRESHOLD: f64 = 20.0;
const ADX_STRONG_TREND: f64 = 30.0;

/// Bayesian odds-update scorer: starts from even odds and multiplies in a
/// regime-conditioned set of likelihood ratios, then converts back to a win
/// probability.
pub struct ScoringEngine;

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, technicals: &Technicals) -> AlgoSignal {
        let (Some(rsi), Some(macd_histogram), Some(_ema_50)) = (
            technicals.rsi,
            technicals.macd_histogram,
            technicals.ema_50,
        ) else {
            return insufficient_data_signal();
        };

        let adx = technicals.adx.unwrap_or(0.0);
        let atr_percent = technicals.atr_percent.unwrap_or(0.0);
        let is_trending = adx >= ADX_TRENDING_THRESHOLD;

        let mut odds = 1.0;
        if is_trending {
            odds *= trend_structure_ratio(technicals.trend_structure);
            if let (Some(ema_50), Some(ema_200)) = (technicals.ema_50, technicals.ema_200) {
                odds *= if ema_50 > ema_200 { 1.25 } else { 0.8 };
            }
            if macd_histogram > 0.0 {
                odds *= 1.15;
            }
            if rsi > 80.0 {
                odds *= 0.7;
            } else if rsi > 60.0 {
                odds *= 1.2;
            }
        } else {
            if rsi < 30.0 {
                odds *= 1.7;
            } else if rsi > 70.0 {
                odds *= 0.6;
            }
            if let Some(bb_position) = technicals.bb_position {
                if bb_position < 0.1 {
                    odds *= 1.4;
                } else if bb_position > 0.9 {
                    odds *= 0.7;
                }
            }
            if macd_histogram < -2.0 {
                odds *= 0.8;
            }
        }

        if atr_percent > ATR_PENALTY_THRESHOLD {
            odds *= ATR_PENALTY_FACTOR;
        }

        let p_win = (odds / (1.0 + odds)).clamp(P_WIN_FLOOR, P_WIN_CEILING);
        let expected_value = p_win * TARGET_REWARD_TO_RISK - (1.0 - p_win);

        let opportunity_score = (p_win - 0.5) * 200.0;
        let stability = ((2.5 - atr_percent) * 40.0).clamp(-100.0, 100.0);
        let overall_val = opportunity_score * 0.7 + stability * 0.3;
        let confluence_score = (p_win * 10.0).floor() as i32;

        let volume_ratio = technicals.volume_ratio.unwrap_or(1.0);
        let (volume_value, volume_label) = volume_score(volume_ratio);

        let regime_label = if is_trending {
            "Trend Following"
        } else {
            "Mean Reversion / Range"
        };
        let trend_label = if adx > ADX_STRONG_TREND {
            "Strong Trend"
        } else if is_trending {
            "Weak Trend"
        } else {
            "Mean Reversion"
        };

        AlgoSignal {
            p_win,
            expected_value,
            overall: ScoreDetail {
                value: overall_val,
                min: -100.0,
                max: 100.0,
                label: regime_label.to_string(),
                legend: format!("EV: {expected_value:.2}"),
            },
            trend: ScoreDetail {
                value: adx,
                min: 0.0,
                max: 100.0,
                label: trend_label.to_string(),
                legend: "ADX Intensity".to_string(),
            },
            momentum: ScoreDetail {
                value: opportunity_score,
                min: -100.0,
                max: 100.0,
                label: if p_win > 0.65 {
                    "High Prob".to_string()
                } else if p_win > 0.5 {
                    "Speculative".to_string()
                } else {
                    "Low Prob".to_string()
                },
                legend: "Normalized P_Win".to_string(),
            },
            volatility: ScoreDetail {
                value: stability,
                min: -100.0,
                max: 100.0,
                label: if stability > 0.0 { "Stable" } else { "High Risk" }.to_string(),
                legend: String::new(),
            },
            volume: ScoreDetail {
                value: volume_value,
                min: 0.0,
                max: 100.0,
                label: volume_label.to_string(),
                legend: "Volume vs 20d Average".to_string(),
            },
            confluence_score,
            volatility_risk: volatility_risk_bucket(atr_percent),
            reason: format!("{regime_label}: p_win={p_win:.2}, confluence={confluence_score}"),
        }
    }
}

fn trend_structure_ratio(structure: Option<TrendStructure>) -> f64 {
    match structure {
        Some(TrendStructure::Bullish) => 1.6,
        Some(TrendStructure::Bearish) => 0.6,
        _ => 1.0,
    }
}

fn volume_score(ratio: f64) -> (f64, &'static str) {
    if ratio < 0.8 {
        (0.0, "LOW")
    } else if ratio <= 1.2 {
        (50.0, "NORMAL")
    } else if ratio <= 1.5 {
        (100.0, "HIGH")
    } else {
        (100.0, "VERY_HIGH")
    }
}

fn volatility_risk_bucket(atr_percent: f64) -> VolatilityRisk {
    if atr_percent < 1.5 {
        VolatilityRisk::Low
    } else if atr_percent < 3.0 {
        VolatilityRisk::Moderate
    } else {
        VolatilityRisk::High
    }
}

fn insufficient_data_signal() -> AlgoSignal {
    let zero = |min: f64, max: f64| ScoreDetail {
        value: 0.0,
        min,
        max,
        label: "Insufficient Data".to_string(),
        legend: String::new(),
    };
    AlgoSignal {
        p_win: 0.5,
        expected_value: 0.0,
        overall: zero(-100.0, 100.0),
        trend: zero(0.0, 100.0),
        momentum: zero(-100.0, 100.0),
        volatility: zero(-100.0, 100.0),
        volume: zero(0.0, 100.0),
        confluence_score: 0,
        volatility_risk: VolatilityRisk::Unknown,
        reason: "Insufficient Data".to_string(),
    }
}
