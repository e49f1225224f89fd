use decision_core::{AnalysisError, CashPosition, FundamentalData, FundamentalInferences, RiskAssessment, RiskLevel};

use crate::sector::benchmark_for;

const GROWTH_EXPLOSIVE_THRESHOLD: f64 = 0.25;
const GROWTH_STEADY_THRESHOLD: f64 = 0.10;
const EARNINGS_QUALITY_THRESHOLD: f64 = 1.0;
const PE_PREMIUM_THRESHOLD: f64 = 30.0;
const FORTRESS_NET_CASH_MARKET_CAP_PCT: f64 = 0.25;
const FORTRESS_NET_CASH_FCF_MULTIPLE: f64 = 1.5;

const RISK_LOW_THRESHOLD: f64 = 0.35;
const RISK_MODERATE_THRESHOLD: f64 = 0.55;
const RISK_HIGH_THRESHOLD: f64 = 0.75;

/// Hard derived-data invariants. A vendor feed that violates either one is
/// internally inconsistent and every Pass B inference built on top of it
/// would be built on contradictory inputs, so this runs before `infer`.
pub fn check_integrity(data: &FundamentalData) -> Result<(), AnalysisError> {
    if let (Some(om), Some(gm)) = (data.operating_margin, data.gross_margin) {
        if om > gm {
            return Err(AnalysisError::DataIntegrityError(format!(
                "operating_margin ({:.4}) exceeds gross_margin ({:.4})",
                om, gm
            )));
        }
    }
    if data.net_income.unwrap_or(0.0) > 0.0 && data.roe.unwrap_or(0.0) < 0.0 {
        return Err(AnalysisError::DataIntegrityError(
            "net_income is positive but roe is negative".to_string(),
        ));
    }
    Ok(())
}

/// Pillar-rule engine producing the five qualitative labels and the
/// multi-factor risk matrix. Compressed from a richer per-pillar
/// label/status/description shape down to one sentence per pillar.
pub fn infer(data: &FundamentalData) -> (FundamentalInferences, RiskAssessment) {
    let bench = benchmark_for(data.sector.as_deref());
    let market_cap = match (data.price, data.shares_outstanding) {
        (Some(price), Some(shares)) => Some(price * shares),
        _ => None,
    };

    let valuation = valuation_label(data, &bench);
    let growth = growth_label(data);
    let financial_health = health_label(data, &bench, market_cap);
    let efficiency = efficiency_label(data, &bench);
    let earnings_quality = earnings_quality_label(data);

    let risk = risk_assessment(data, &bench, market_cap);

    (
        FundamentalInferences {
            valuation,
            growth,
            financial_health,
            efficiency,
            earnings_quality,
        },
        risk,
    )
}

fn valuation_label(data: &FundamentalData, bench: &crate::sector::SectorBenchmark) -> String {
    let pe = data.forward_pe.or(data.pe_ratio);
    match pe {
        Some(pe) if pe < bench.pe * 0.6 => {
            format!("Deep Value (Bullish): {pe:.1} vs sector {:.1}", bench.pe)
        }
        Some(pe) if pe < bench.pe * 1.2 => "Fair Value (Neutral): pricing aligns with sector peers".to_string(),
        Some(pe) => format!("Premium (Bearish): {pe:.1} above sector norm"),
        None if data.revenue_growth_yoy.unwrap_or(0.0) > 0.20 => {
            "Speculative (Neutral): no P/E, driven by growth narrative".to_string()
        }
        None => "Speculative (Neutral): no P/E available".to_string(),
    }
}

fn growth_label(data: &FundamentalData) -> String {
    let rev_g = data.revenue_growth_yoy.unwrap_or(0.0);
    if rev_g >= GROWTH_EXPLOSIVE_THRESHOLD {
        format!("High Growth (Bullish): revenue +{:.1}%", rev_g * 100.0)
    } else if rev_g >= GROWTH_STEADY_THRESHOLD {
        format!("Steady (Neutral): revenue +{:.1}%", rev_g * 100.0)
    } else {
        "Stagnant (Bearish): revenue contraction or saturation".to_string()
    }
}

fn health_label(
    data: &FundamentalData,
    bench: &crate::sector::SectorBenchmark,
    market_cap: Option<f64>,
) -> String {
    let is_net_cash = data.cash_position == Some(CashPosition::NetCash);
    let net_cash = data.net_cash.unwrap_or(0.0);

    let is_fortress = is_net_cash
        && ((market_cap.is_some_and(|mc| net_cash > FORTRESS_NET_CASH_MARKET_CAP_PCT * mc))
            || (data.free_cash_flow.unwrap_or(0.0) > 0.0
                && net_cash > FORTRESS_NET_CASH_FCF_MULTIPLE * data.free_cash_flow.unwrap_or(0.0)));

    if is_fortress {
        format!(
            "Fortress (Bullish): net cash ${:.0}M dwarfs size/FCF",
            net_cash / 1e6
        )
    } else if is_net_cash {
        format!("Strong (Bullish): net cash position (${:.0}M)", net_cash / 1e6)
    } else if data.debt_to_equity.is_some_and(|de| de < bench.debt_to_equity) {
        "Strong (Bullish): conservative leverage relative to sector".to_string()
    } else if data.current_ratio.unwrap_or(0.0) >= 1.0 {
        "Stable (Neutral): adequate liquidity".to_string()
    } else {
        "Strained (Bearish): current ratio below 1.0".to_string()
    }
}

fn efficiency_label(data: &FundamentalData, bench: &crate::sector::SectorBenchmark) -> String {
    let om = data.operating_margin.unwrap_or(0.0);
    let roe = data.roe.unwrap_or(0.0);
    if om >= bench.margin {
        format!("High Efficiency (Bullish): {:.1}% operating margin vs sector", om * 100.0)
    } else if roe < 0.0
        && data.revenue_growth_yoy.unwrap_or(0.0) > 0.25
        && data.gross_margin.unwrap_or(0.0) > 0.5
    {
        "Investment Phase (Neutral): margin expansion expected, reinvestment-led".to_string()
    } else if roe > 0.0 {
        "Moderate (Neutral): standard operational performance".to_string()
    } else {
        "Inefficient (Bearish): sub-par capital returns".to_string()
    }
}

fn earnings_quality_label(data: &FundamentalData) -> String {
    let ni = data.net_income.unwrap_or(0.0);
    let fcf = data.free_cash_flow.unwrap_or(0.0);
    if ni < 0.0 && fcf > 0.0 {
        return "Investment Phase Earnings (Neutral): positive FCF despite net loss".to_string();
    }
    match data.fcf_to_ni_ratio {
        Some(ratio) if ratio > EARNINGS_QUALITY_THRESHOLD => {
            format!("High Quality (Bullish): cash-backed earnings (ratio {ratio:.2})")
        }
        Some(_) => "Low Quality (Bearish): accounting earnings not reflected in cash".to_string(),
        None if fcf > 0.0 => "Cash Generative (Bullish): positive FCF despite NI noise".to_string(),
        None => "Unverified (Neutral): insufficient history".to_string(),
    }
}

fn risk_assessment(
    data: &FundamentalData,
    bench: &crate::sector::SectorBenchmark,
    market_cap: Option<f64>,
) -> RiskAssessment {
    let valuation_risk = match data.forward_pe {
        None => 0.7,
        Some(pe) if pe > PE_PREMIUM_THRESHOLD => 0.9,
        Some(_) => 0.2,
    };
    let profitability_risk = if data.operating_margin.unwrap_or(0.0) <= 0.0 {
        1.0
    } else if data.operating_margin.unwrap_or(0.0) < bench.margin * 0.5 {
        0.7
    } else {
        0.2
    };
    let leverage_risk = if data.cash_position == Some(CashPosition::NetCash) {
        0.1
    } else if data.debt_to_equity.unwrap_or(0.0) > 2.0 {
        0.9
    } else {
        0.5
    };
    let liquidity_risk = if data.current_ratio.unwrap_or(0.0) < 1.0 {
        1.0
    } else if data.current_ratio.unwrap_or(0.0) < 1.5 {
        0.6
    } else {
        0.1
    };
    let growth_stability_risk = if data.revenue_growth_yoy.unwrap_or(0.0) < 0.0 {
        1.0
    } else {
        0.3
    };
    let margin_compression_risk = if data.operating_margin.unwrap_or(0.0) < bench.margin * 0.7 {
        0.8
    } else {
        0.2
    };
    let capital_efficiency_risk = if data.roic.unwrap_or(0.0) < 0.05 { 0.9 } else { 0.2 };
    let governance_risk = match (data.audit_risk, data.board_risk) {
        (Some(a), Some(b)) => ((a.max(b)) / 10.0).clamp(0.0, 1.0),
        _ => 0.5,
    };
    let revenue_quality_risk = if data.fcf_to_ni_ratio.unwrap_or(1.0) > 0.5 { 0.4 } else { 0.9 };

    let total = valuation_risk * 0.15
        + profitability_risk * 0.15
        + leverage_risk * 0.15
        + liquidity_risk * 0.10
        + growth_stability_risk * 0.10
        + margin_compression_risk * 0.10
        + capital_efficiency_risk * 0.10
        + governance_risk * 0.10
        + revenue_quality_risk * 0.05;

    let mut factors = Vec::new();
    if data.net_income.unwrap_or(0.0) > 0.0 && data.roe.unwrap_or(0.0) < 0.0 {
        factors.push("ROE/Margin Contradiction: positive net income but negative equity returns".to_string());
    }
    if data.free_cash_flow.unwrap_or(0.0) < 0.0 {
        factors.push("Negative Free Cash Flow".to_string());
    }
    if data.operating_margin.unwrap_or(0.0) < bench.margin {
        factors.push("Sub-sector Operating Margins".to_string());
    }
    if data.debt_to_equity.unwrap_or(0.0) > bench.debt_to_equity * 2.0 {
        factors.push("High Relative Leverage".to_string());
    }
    if data.current_ratio.unwrap_or(0.0) < 1.2 {
        factors.push("Tight Liquidity Profile".to_string());
    }
    if data.revenue_growth_yoy.unwrap_or(0.0) < bench.growth {
        factors.push("Growth Lagging Sector".to_string());
    }
    if data.forward_pe.unwrap_or(0.0) > bench.pe * 1.5 {
        factors.push("Significant Valuation Premium".to_string());
    }
    if data.insider_ownership_pct.unwrap_or(0.0) < 0.01 {
        factors.push("Low Management Alignment (Skin in Game)".to_string());
    }
    if data.roic.unwrap_or(0.0) < 0.08 {
        factors.push("Poor Capital Efficiency (ROIC < 8%)".to_string());
    }
    if data.fcf_to_ni_ratio.unwrap_or(1.0) < 0.5 {
        factors.push("Low Accrual Quality (NI not converting to FCF)".to_string());
    }
    if let (Some(nc), Some(mc)) = (data.net_cash, market_cap) {
        if nc < 0.05 * mc {
            factors.push("Minimal Cash Buffer relative to size".to_string());
        }
    }

    let level = if total < RISK_LOW_THRESHOLD {
        RiskLevel::Low
    } else if total < RISK_MODERATE_THRESHOLD {
        RiskLevel::Moderate
    } else if total < RISK_HIGH_THRESHOLD {
        RiskLevel::High
    } else {
        RiskLevel::VeryHigh
    };

    RiskAssessment {
        level,
        score: (total * 100.0).round(),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> FundamentalData {
        FundamentalData {
            sector: Some("Technology".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn operating_margin_above_gross_margin_fails_integrity() {
        let data = FundamentalData {
            gross_margin: Some(0.30),
            operating_margin: Some(0.45),
            ..base()
        };
        assert!(matches!(check_integrity(&data), Err(AnalysisError::DataIntegrityError(_))));
    }

    #[test]
    fn positive_net_income_with_negative_roe_fails_integrity() {
        let data = FundamentalData {
            net_income: Some(1_000_000.0),
            roe: Some(-0.1),
            ..base()
        };
        assert!(matches!(check_integrity(&data), Err(AnalysisError::DataIntegrityError(_))));
    }

    #[test]
    fn consistent_margins_pass_integrity() {
        let data = FundamentalData {
            gross_margin: Some(0.45),
            operating_margin: Some(0.20),
            net_income: Some(1_000_000.0),
            roe: Some(0.15),
            ..base()
        };
        assert!(check_integrity(&data).is_ok());
    }

    #[test]
    fn deep_discount_pe_scores_as_deep_value() {
        let data = FundamentalData {
            forward_pe: Some(10.0),
            ..base()
        };
        let (inf, _) = infer(&data);
        assert!(inf.valuation.starts_with("Deep Value"));
    }

    #[test]
    fn net_cash_fortress_scores_as_fortress() {
        let data = FundamentalData {
            price: Some(100.0),
            shares_outstanding: Some(1_000_000.0),
            total_cash: Some(50_000_000.0),
            total_debt: Some(0.0),
            net_cash: Some(50_000_000.0),
            cash_position: Some(CashPosition::NetCash),
            ..base()
        };
        let (inf, _) = infer(&data);
        assert!(inf.financial_health.starts_with("Fortress"));
    }

    #[test]
    fn negative_operating_margin_is_maximally_risky_on_profitability() {
        let data = FundamentalData {
            operating_margin: Some(-0.05),
            ..base()
        };
        let (_, risk) = infer(&data);
        assert!(risk.score > 0.0);
        assert!(!risk.factors.is_empty());
    }

    #[test]
    fn thin_current_ratio_flags_liquidity_risk() {
        let data = FundamentalData {
            current_ratio: Some(0.8),
            ..base()
        };
        let (_, risk) = infer(&data);
        assert!(risk.factors.iter().any(|f| f.contains("Liquidity")));
    }
}
