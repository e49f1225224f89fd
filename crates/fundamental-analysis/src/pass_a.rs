use decision_core::{CashPosition, Financials, FundamentalData};

use crate::raw::RawFundamentalData;

const DEBT_TO_EQUITY_PERCENT_THRESHOLD: f64 = 5.0;

/// Fills the wide nullable record from a vendor snapshot plus the trailing
/// fiscal quarters (index 0 = most recent, descending by period).
pub fn derive(raw: RawFundamentalData, quarterly_financials: &[Financials]) -> FundamentalData {
    let forward_pe = raw.forward_pe.filter(|v| *v > 0.0);
    let earnings_yield = forward_pe
        .map(|pe| 1.0 / pe)
        .or_else(|| match (raw.eps, raw.price) {
            (Some(eps), Some(price)) if price > 0.0 => Some(eps / price),
            _ => None,
        });

    let enterprise_to_revenue = match (raw.enterprise_value, raw.total_revenue) {
        (Some(ev), Some(rev)) if rev != 0.0 => Some(ev / rev),
        _ => None,
    };

    let free_cash_flow_margin = match (raw.free_cash_flow, raw.total_revenue) {
        (Some(fcf), Some(rev)) if rev != 0.0 => Some(fcf / rev),
        _ => None,
    };

    // Preserve the sign of FCF itself; normalize against |NI| so a loss-making
    // year doesn't flip the ratio's meaning.
    let fcf_to_ni_ratio = match (raw.free_cash_flow, raw.net_income) {
        (Some(fcf), Some(ni)) if ni != 0.0 => Some(fcf / ni.abs()),
        _ => None,
    };

    let net_cash = match (raw.total_cash, raw.total_debt) {
        (Some(cash), Some(debt)) => Some(cash - debt),
        _ => None,
    };
    let cash_position = net_cash.map(|nc| {
        if nc > 0.0 {
            CashPosition::NetCash
        } else {
            CashPosition::NetDebt
        }
    });

    let debt_to_equity = raw.debt_to_equity.map(|de| {
        if de > DEBT_TO_EQUITY_PERCENT_THRESHOLD {
            de / 100.0
        } else {
            de
        }
    });

    let latest = quarterly_financials.first();
    let roe = latest
        .and_then(|f| match (f.net_income, f.shareholders_equity) {
            (Some(ni), Some(eq)) if eq > 0.0 => Some(ni / eq),
            _ => None,
        })
        .or(raw.return_on_equity);
    let roa = latest
        .and_then(|f| match (f.net_income, f.total_assets) {
            (Some(ni), Some(assets)) if assets > 0.0 => Some(ni / assets),
            _ => None,
        })
        .or(raw.return_on_assets);

    let revenue_growth_yoy =
        trailing_yoy_revenue_growth(quarterly_financials).or(raw.revenue_growth_ttm);

    FundamentalData {
        sector: raw.sector,
        price: raw.price,
        pe_ratio: raw.trailing_pe,
        forward_pe,
        peg_ratio: raw.peg_ratio,
        price_to_book: raw.price_to_book,
        earnings_yield,
        enterprise_to_revenue,
        gross_margin: raw.gross_margins,
        operating_margin: raw.operating_margins,
        net_margin: raw.net_margins,
        roe,
        roa,
        roic: raw.return_on_invested_capital,
        free_cash_flow: raw.free_cash_flow,
        free_cash_flow_margin,
        fcf_to_ni_ratio,
        net_income: raw.net_income,
        total_cash: raw.total_cash,
        total_debt: raw.total_debt,
        net_cash,
        cash_position,
        debt_to_equity,
        current_ratio: raw.current_ratio,
        revenue_growth_yoy,
        eps: raw.eps,
        book_value_per_share: raw.book_value_per_share,
        audit_risk: raw.audit_risk,
        board_risk: raw.board_risk,
        shares_outstanding: raw.shares_outstanding,
        insider_ownership_pct: raw.held_percent_insiders,
    }
}

/// Trailing-twelve-months revenue growth: current 4 quarters vs. the prior 4,
/// normalized for missing quarters. Requires at least 3 populated quarters in
/// each window, matching the TTM-aggregation tolerance used elsewhere.
fn trailing_yoy_revenue_growth(quarters: &[Financials]) -> Option<f64> {
    if quarters.len() < 5 {
        return None;
    }
    let current = &quarters[..4];
    let prior = &quarters[4..quarters.len().min(8)];

    let current_count = current.iter().filter(|f| f.revenue.is_some()).count();
    let prior_count = prior.iter().filter(|f| f.revenue.is_some()).count();
    if current_count < 3 || prior_count < 3 {
        return None;
    }

    let current_sum: f64 = current.iter().filter_map(|f| f.revenue).sum();
    let prior_sum: f64 = prior.iter().filter_map(|f| f.revenue).sum();
    if prior_sum <= 0.0 {
        return None;
    }

    let current_norm = current_sum / current_count as f64 * 4.0;
    let prior_norm = prior_sum / prior_count as f64 * 4.0;
    Some((current_norm - prior_norm) / prior_norm)
}
