use decision_core::GrahamValuation;

/// Graham number: `sqrt(22.5 * EPS * BVPS)`. Strictly undefined outside
/// positive real inputs; never extrapolated from a negative or zero base.
pub fn calculate_graham_number(eps: Option<f64>, book_value_per_share: Option<f64>) -> GrahamValuation {
    match (eps, book_value_per_share) {
        (Some(eps), Some(bvps)) if eps > 0.0 && bvps > 0.0 => GrahamValuation {
            fair_value_per_share: Some((22.5 * eps * bvps).sqrt()),
            defined: true,
        },
        _ => GrahamValuation {
            fair_value_per_share: None,
            defined: false,
        },
    }
}
