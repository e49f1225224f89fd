use decision_core::{DcfStatus, DcfValuation, TerminalGrowthSensitivity};

const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
const THIN_MARGIN_RISK_PREMIUM: f64 = 0.02;
const THIN_MARGIN_THRESHOLD: f64 = 0.10;
const DEFAULT_TERMINAL_GROWTH: f64 = 0.03;
const STAGE1_YEARS: i32 = 5;
const STAGE2_YEARS: i32 = 10;
const TERMINAL_DOMINANCE_KILL_SWITCH: f64 = 0.85;

/// Offsets (in absolute terminal-growth terms) the sensitivity grid reports
/// around the base-case terminal growth assumption.
const SENSITIVITY_OFFSETS: [f64; 5] = [-0.02, -0.01, 0.0, 0.01, 0.02];

struct StageResult {
    stage1_pv: f64,
    stage2_pv: f64,
    terminal_pv: f64,
}

/// Runs the three-stage present-value walk for one terminal growth
/// assumption: explicit high growth (years 1-5), a linear fade to terminal
/// growth (years 6-10), then a Gordon-growth terminal value.
fn present_value_stages(base_fcf: f64, revenue_growth: f64, discount_rate: f64, terminal_growth: f64) -> StageResult {
    let mut current_fcf = base_fcf;
    let mut stage1_pv = 0.0;
    for year in 1..=STAGE1_YEARS {
        current_fcf *= 1.0 + revenue_growth;
        stage1_pv += current_fcf / (1.0 + discount_rate).powi(year);
    }

    let mut stage2_pv = 0.0;
    let mut last_growth = revenue_growth;
    let fade_step = (revenue_growth - terminal_growth) / (STAGE2_YEARS - STAGE1_YEARS) as f64;
    for year in (STAGE1_YEARS + 1)..=STAGE2_YEARS {
        let current_growth = (last_growth - fade_step).max(terminal_growth);
        current_fcf *= 1.0 + current_growth;
        stage2_pv += current_fcf / (1.0 + discount_rate).powi(year);
        last_growth = current_growth;
    }

    let terminal_fcf = current_fcf * (1.0 + terminal_growth);
    let terminal_value = terminal_fcf / (discount_rate - terminal_growth);
    let terminal_pv = terminal_value / (1.0 + discount_rate).powi(STAGE2_YEARS);

    StageResult { stage1_pv, stage2_pv, terminal_pv }
}

/// Three-stage DCF: explicit high growth (years 1-5), a linear fade to
/// terminal growth (years 6-10), then a Gordon-growth terminal value. Returns
/// `None` when there is no usable free-cash-flow basis.
pub fn calculate_dcf(
    free_cash_flow: Option<f64>,
    revenue_growth: f64,
    shares_outstanding: Option<f64>,
    total_revenue: Option<f64>,
    free_cash_flow_margin: Option<f64>,
) -> Option<DcfValuation> {
    let shares = shares_outstanding.filter(|s| *s > 0.0)?;

    let base_fcf = match free_cash_flow {
        Some(fcf) if fcf > 0.0 => fcf,
        _ => match (total_revenue, free_cash_flow_margin) {
            (Some(rev), Some(margin)) if rev > 0.0 && margin > 0.0 => rev * margin,
            _ => return None,
        },
    };

    let mut discount_rate = DEFAULT_DISCOUNT_RATE;
    if free_cash_flow_margin.is_some_and(|m| m < THIN_MARGIN_THRESHOLD) {
        discount_rate += THIN_MARGIN_RISK_PREMIUM;
    }

    let base = present_value_stages(base_fcf, revenue_growth, discount_rate, DEFAULT_TERMINAL_GROWTH);
    let total_pv = base.stage1_pv + base.stage2_pv + base.terminal_pv;
    let terminal_dominance = if total_pv != 0.0 { base.terminal_pv / total_pv } else { 0.0 };

    let status = if terminal_dominance > TERMINAL_DOMINANCE_KILL_SWITCH {
        DcfStatus::TerminalValueDominantWarning
    } else {
        DcfStatus::Ok
    };

    let terminal_growth_sensitivity = SENSITIVITY_OFFSETS
        .iter()
        .filter_map(|offset| {
            let terminal_growth = DEFAULT_TERMINAL_GROWTH + offset;
            if terminal_growth >= discount_rate {
                return None;
            }
            let stages = present_value_stages(base_fcf, revenue_growth, discount_rate, terminal_growth);
            let total = stages.stage1_pv + stages.stage2_pv + stages.terminal_pv;
            Some(TerminalGrowthSensitivity {
                terminal_growth_rate: terminal_growth,
                fair_value_per_share: total / shares,
            })
        })
        .collect();

    Some(DcfValuation {
        fair_value_per_share: total_pv / shares,
        stage1_pv: base.stage1_pv,
        stage2_pv: base.stage2_pv,
        terminal_pv: base.terminal_pv,
        terminal_dominance,
        discount_rate,
        status,
        terminal_growth_sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fcf_and_no_revenue_fallback_returns_none() {
        assert!(calculate_dcf(None, 0.1, Some(1_000_000.0), None, None).is_none());
    }

    #[test]
    fn falls_back_to_revenue_times_margin_when_fcf_absent() {
        let dcf = calculate_dcf(None, 0.1, Some(1_000_000.0), Some(500_000_000.0), Some(0.15));
        assert!(dcf.is_some());
    }

    #[test]
    fn thin_margin_applies_risk_premium() {
        let thin = calculate_dcf(Some(1_000_000.0), 0.15, Some(1_000_000.0), None, Some(0.05)).unwrap();
        let healthy = calculate_dcf(Some(1_000_000.0), 0.15, Some(1_000_000.0), None, Some(0.20)).unwrap();
        assert!(thin.discount_rate > healthy.discount_rate);
    }

    #[test]
    fn low_growth_high_multiple_flags_terminal_dominance() {
        let dcf = calculate_dcf(Some(10_000.0), 0.02, Some(1_000.0), None, Some(0.20)).unwrap();
        assert_eq!(dcf.status, DcfStatus::TerminalValueDominantWarning);
        assert!(dcf.terminal_dominance > 0.85);
    }

    #[test]
    fn explosive_growth_reduces_terminal_dominance() {
        let dcf = calculate_dcf(Some(10_000_000.0), 0.35, Some(1_000_000.0), None, Some(0.20)).unwrap();
        assert!(dcf.terminal_dominance < 0.85);
        assert_eq!(dcf.status, DcfStatus::Ok);
    }

    #[test]
    fn terminal_growth_sensitivity_grid_is_monotonic_in_growth_rate() {
        let dcf = calculate_dcf(Some(1_000_000.0), 0.15, Some(1_000_000.0), None, Some(0.20)).unwrap();
        assert!(dcf.terminal_growth_sensitivity.len() > 1);
        for pair in dcf.terminal_growth_sensitivity.windows(2) {
            assert!(pair[0].terminal_growth_rate < pair[1].terminal_growth_rate);
            assert!(pair[0].fair_value_per_share < pair[1].fair_value_per_share);
        }
    }
}
