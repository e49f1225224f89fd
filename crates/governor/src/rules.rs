use chrono::Utc;
use decision_core::{Financials, MarketContext, Technicals};

const ADX_TREND_THRESHOLD: f64 = 15.0;
const INSIDER_SELL_THRESHOLD: usize = 3;
const INSIDER_SELL_WINDOW_DAYS: i64 = 90;
const EARNINGS_PROXIMITY_WINDOW_DAYS: i64 = 14;
const SLOAN_RATIO_THRESHOLD: f64 = 0.10;
const REGIME_SHRED_ATR_PCT: f64 = 3.0;
const REGIME_SHRED_ADX: f64 = 20.0;

/// Accumulates trading-rule violations across a horizon's assessment so the
/// caller gets one unified reason instead of the first rule to fire.
#[derive(Debug, Clone, Default)]
pub struct RejectionTracker {
    violations: Vec<String>,
}

impl RejectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_violation(&mut self, rule_code: &str, description: impl Into<String>) {
        self.violations.push(format!("{rule_code}: {}", description.into()));
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn primary_reason(&self) -> &str {
        self.violations.first().map(String::as_str).unwrap_or("None")
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

/// R1: excessive insider selling in the trailing window.
pub fn check_insider_trading(tracker: &mut RejectionTracker, context: Option<&MarketContext>) {
    let Some(ctx) = context else { return };
    let recent_sells = count_recent_insider_sales(&ctx.insider_activity, INSIDER_SELL_WINDOW_DAYS);
    if recent_sells >= INSIDER_SELL_THRESHOLD {
        tracker.add_violation(
            "RULE_1_INSIDER_SELLS",
            format!("{recent_sells} sales in {INSIDER_SELL_WINDOW_DAYS} days"),
        );
    }
}

fn count_recent_insider_sales(
    activity: &[decision_core::InsiderTransaction],
    window_days: i64,
) -> usize {
    let cutoff = Utc::now() - chrono::Duration::days(window_days);
    activity
        .iter()
        .filter(|t| t.transaction_type.eq_ignore_ascii_case("sell") && t.date >= cutoff)
        .count()
}

/// R2: weak trend (chop zone).
pub fn check_adx_trend(tracker: &mut RejectionTracker, technicals: &Technicals) {
    if let Some(adx) = technicals.adx {
        if adx < ADX_TREND_THRESHOLD {
            tracker.add_violation(
                "RULE_2_ADX_TREND",
                format!("ADX={adx:.1} < {ADX_TREND_THRESHOLD} (Chop Zone)"),
            );
        }
    }
}

/// R4: binary earnings-date risk.
pub fn check_earnings_risk(tracker: &mut RejectionTracker, context: Option<&MarketContext>) {
    let Some(days_to_earnings) = context.and_then(|c| c.next_earnings.as_ref()).map(|e| e.days_away)
    else {
        return;
    };
    if (0..=EARNINGS_PROXIMITY_WINDOW_DAYS).contains(&days_to_earnings) {
        tracker.add_violation(
            "RULE_4_EARNINGS_PROXIMITY",
            format!("Earnings in {days_to_earnings} days. Binary risk too high."),
        );
    } else if days_to_earnings == -1 {
        tracker.add_violation(
            "RULE_4_EARNINGS_PROXIMITY",
            "Earnings reported yesterday. High volatility zone.",
        );
    }
}

/// R5: accrual-quality (Sloan ratio) earnings-manipulation screen.
pub fn check_accrual_quality(tracker: &mut RejectionTracker, financials: Option<&Financials>) {
    let Some(f) = financials else { return };
    let (Some(ni), Some(ocf), Some(assets)) =
        (f.net_income, f.cash_flow_operating, f.total_assets)
    else {
        return;
    };
    if assets == 0.0 {
        return;
    }
    let sloan = (ni - ocf) / assets;
    if sloan.abs() > SLOAN_RATIO_THRESHOLD {
        tracker.add_violation(
            "RULE_5_EARNINGS_QUALITY_LOW",
            format!("Sloan Ratio {sloan:.2} exceeds {SLOAN_RATIO_THRESHOLD:.2} threshold."),
        );
    }
}

/// Applies every stateful trading rule, accumulating violations onto the
/// shared tracker.
pub fn apply_trading_rules(
    tracker: &mut RejectionTracker,
    technicals: &Technicals,
    context: Option<&MarketContext>,
    financials: Option<&Financials>,
) {
    check_insider_trading(tracker, context);
    check_adx_trend(tracker, technicals);
    check_earnings_risk(tracker, context);
    check_accrual_quality(tracker, financials);
}

/// Regime capital-shredder: chop with elevated volatility is where capital
/// goes to die, independent of any single rule above.
pub fn is_untradeable_regime(technicals: &Technicals) -> bool {
    technicals.atr_percent.unwrap_or(0.0) > REGIME_SHRED_ATR_PCT
        && technicals.adx.unwrap_or(0.0) < REGIME_SHRED_ADX
}
