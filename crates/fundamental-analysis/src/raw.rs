/// Vendor-shaped fundamentals snapshot, the input to Pass A. Mirrors the
/// wide `info` dictionary a quote provider returns before any derived ratio
/// has been computed.
#[derive(Debug, Clone, Default)]
pub struct RawFundamentalData {
    pub sector: Option<String>,
    pub price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub total_revenue: Option<f64>,
    pub gross_margins: Option<f64>,
    pub operating_margins: Option<f64>,
    pub net_margins: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_invested_capital: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub net_income: Option<f64>,
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub revenue_growth_ttm: Option<f64>,
    pub eps: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub audit_risk: Option<f64>,
    pub board_risk: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub held_percent_insiders: Option<f64>,
}
