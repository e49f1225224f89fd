pub mod dcf;
pub mod graham;
pub mod pass_a;
pub mod pass_b;
pub mod quality;
pub mod raw;
pub mod sector;

use decision_core::{AnalysisError, CompositeQualityScore, DcfValuation, Financials, FundamentalData, FundamentalInferences, GrahamValuation, RiskAssessment};

pub use raw::RawFundamentalData;

/// Full fundamentals readout for one ticker: Pass A's wide metric record plus
/// every Pass B/valuation artifact derived from it.
#[derive(Debug, Clone)]
pub struct FundamentalReadout {
    pub data: FundamentalData,
    pub inferences: FundamentalInferences,
    pub risk: RiskAssessment,
    pub quality: CompositeQualityScore,
    pub dcf: Option<DcfValuation>,
    pub graham: GrahamValuation,
}

#[derive(Default)]
pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        raw: RawFundamentalData,
        quarterly_financials: &[Financials],
    ) -> Result<FundamentalReadout, AnalysisError> {
        let data = pass_a::derive(raw, quarterly_financials);
        pass_b::check_integrity(&data)?;
        let bench = sector::benchmark_for(data.sector.as_deref());
        let (inferences, risk) = pass_b::infer(&data);
        let quality = quality::calculate_quality_grade(&data, &bench);
        let dcf = dcf::calculate_dcf(
            data.free_cash_flow,
            data.revenue_growth_yoy.unwrap_or(0.0),
            data.shares_outstanding,
            None,
            data.free_cash_flow_margin,
        );
        let graham = graham::calculate_graham_number(data.eps, data.book_value_per_share);

        Ok(FundamentalReadout {
            data,
            inferences,
            risk,
            quality,
            dcf,
            graham,
        })
    }
}
