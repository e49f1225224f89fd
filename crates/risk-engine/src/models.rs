use serde::{Deserialize, Serialize};

/// Tunable risk limits. Defaults mirror the institutional desk's standing
/// risk policy; callers override per-account as needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParameters {
    pub max_position_pct: f64,
    pub max_capital_risk_pct: f64,
    pub confidence_threshold: f64,
    pub degraded_confidence_penalty: f64,
    pub degraded_position_cap: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_pct: 5.0,
            max_capital_risk_pct: 0.5,
            confidence_threshold: 70.0,
            degraded_confidence_penalty: 20.0,
            degraded_position_cap: 0.5,
        }
    }
}

/// Output of `RiskEngine::calculate_position_size`: the fully-adjusted
/// position sizing for one horizon's trade setup, as a percentage of
/// notional capital.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSizing {
    pub position_size_pct: f64,
    pub capital_at_risk_pct: f64,
}

/// Precise, citation-ready risk metrics derived from a candidate stop
/// loss, surfaced in narrative synthesis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub position_size_pct: f64,
    pub capital_at_risk_pct: f64,
    pub risk_per_share: f64,
    pub stop_loss_pct: f64,
    pub atr_percent: f64,
    pub stop_distance_in_atr: f64,
}
