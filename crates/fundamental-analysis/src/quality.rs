use decision_core::{CashPosition, CompositeQualityScore, FundamentalData, QualityGrade};

use crate::sector::SectorBenchmark;

const GROSS_MARGIN_TARGET: f64 = 0.70;
const OPERATING_MARGIN_TARGET: f64 = 0.20;
const ROE_TARGET: f64 = 0.15;
const GROWTH_TARGET: f64 = 0.40;
const NET_CASH_MARKET_CAP_TARGET: f64 = 0.25;
const CURRENT_RATIO_TARGET: f64 = 2.0;
const ROIC_TARGET: f64 = 0.15;
const DEFAULT_RISK_SCORE: f64 = 2.0;
const PATHOLOGICAL_BOARD_RISK: f64 = 10.0;
const MARGIN_FRAGILITY_HARD_CAP: f64 = 65.0;

/// Weighted-pillar quality grade, gated by a governance penalty and a
/// margin-fragility hard cap that overrides an otherwise-strong score when
/// cash conversion is deteriorating.
pub fn calculate_quality_grade(data: &FundamentalData, bench: &SectorBenchmark) -> CompositeQualityScore {
    let gm = data.gross_margin.unwrap_or(0.0);
    let om = data.operating_margin.unwrap_or(0.0);
    let roe = data.roe.unwrap_or(0.0);
    let rev_g = data.revenue_growth_yoy.unwrap_or(0.0);
    let fcf_margin = data.free_cash_flow_margin.unwrap_or(0.0);

    let profitability = {
        let gm_score = (gm / GROSS_MARGIN_TARGET * 100.0).min(100.0);
        let om_score = (om / OPERATING_MARGIN_TARGET * 100.0).clamp(0.0, 100.0);
        let roe_score = if roe < 0.0 && rev_g > 0.20 && gm > 0.50 {
            50.0
        } else {
            (roe / ROE_TARGET * 100.0).clamp(0.0, 100.0)
        };
        (gm_score + om_score + roe_score) / 3.0
    };

    let growth = {
        let mut score = (rev_g / GROWTH_TARGET * 100.0).min(100.0);
        if fcf_margin < 0.0 {
            score *= 0.8;
        }
        score
    };

    let financial_strength = {
        let market_cap = match (data.price, data.shares_outstanding) {
            (Some(p), Some(s)) => Some(p * s),
            _ => None,
        };
        if data.cash_position == Some(CashPosition::NetCash) {
            if let (Some(net_cash), Some(mc)) = (data.net_cash, market_cap) {
                if mc > 0.0 {
                    ((net_cash / mc) / NET_CASH_MARKET_CAP_TARGET * 100.0).min(100.0)
                } else {
                    fallback_current_ratio_score(data)
                }
            } else {
                fallback_current_ratio_score(data)
            }
        } else {
            fallback_current_ratio_score(data)
        }
    };

    let consistency = {
        let roic_score = (data.roic.unwrap_or(0.0) / ROIC_TARGET * 100.0).clamp(0.0, 100.0);
        let margin_score = if om > 0.10 { 100.0 } else { 50.0 };
        (roic_score + margin_score) / 2.0
    };

    let weighted = profitability * 0.30 + growth * 0.20 + financial_strength * 0.30 + consistency * 0.20;

    let audit_risk = data.audit_risk.unwrap_or(DEFAULT_RISK_SCORE);
    let board_risk = data.board_risk.unwrap_or(DEFAULT_RISK_SCORE);
    let mut governance_penalty = audit_risk.max(board_risk);
    if board_risk >= PATHOLOGICAL_BOARD_RISK && roe < 0.0 {
        governance_penalty += 10.0;
    }

    let mut overall = (weighted - governance_penalty).clamp(0.0, 100.0);

    if om < bench.margin * 0.5 && data.free_cash_flow.unwrap_or(0.0) < 0.0 {
        overall = overall.min(MARGIN_FRAGILITY_HARD_CAP);
    }
    overall = (overall * 10.0).round() / 10.0;

    let (grade, recommendation) = grade_and_recommendation(overall);

    CompositeQualityScore {
        score: overall,
        grade,
        recommendation: recommendation.to_string(),
    }
}

fn fallback_current_ratio_score(data: &FundamentalData) -> f64 {
    (data.current_ratio.unwrap_or(1.0) / CURRENT_RATIO_TARGET * 100.0).min(100.0)
}

fn grade_and_recommendation(score: f64) -> (QualityGrade, &'static str) {
    if score >= 80.0 {
        (QualityGrade::A, "Strong Buy")
    } else if score >= 65.0 {
        (QualityGrade::B, "Buy")
    } else if score >= 50.0 {
        (QualityGrade::C, "Hold / Watchlist")
    } else if score >= 35.0 {
        (QualityGrade::D, "Sell")
    } else {
        (QualityGrade::F, "Avoid")
    }
}
