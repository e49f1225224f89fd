pub mod integrity;
pub mod rules;

pub use integrity::{assess_data_integrity, DataIntegrity};
pub use rules::{apply_trading_rules, is_untradeable_regime, RejectionTracker};

use decision_core::{Financials, MarketContext, Technicals};

/// Serializable snapshot of every active veto/violation for one horizon.
#[derive(Debug, Clone)]
pub struct VetoState {
    pub has_violations: bool,
    pub violations: Vec<String>,
    pub data_integrity: DataIntegrity,
    pub is_untradeable_regime: bool,
}

/// Enforces trading rules and data integrity. Fully stateless: every method
/// takes its inputs as arguments and carries no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Governor;

impl Governor {
    pub fn new() -> Self {
        Self
    }

    /// Applies every trading rule plus the regime and integrity checks,
    /// returning one unified state a `TradingSystem` can gate on.
    pub fn get_veto_state(
        &self,
        technicals: &Technicals,
        context: Option<&MarketContext>,
        financials: Option<&Financials>,
        ticker: &str,
    ) -> VetoState {
        let mut tracker = RejectionTracker::new();
        apply_trading_rules(&mut tracker, technicals, context, financials);
        let data_integrity = assess_data_integrity(technicals, context, ticker);

        VetoState {
            has_violations: tracker.has_violations(),
            violations: tracker.violations().to_vec(),
            data_integrity,
            is_untradeable_regime: is_untradeable_regime(technicals),
        }
    }

    /// Context-only pre-screen (R1 + R4), run before any pricing work so a
    /// clearly-rejected ticker never pays for a technicals/fundamentals pull.
    pub fn pre_screen(&self, context: Option<&MarketContext>) -> RejectionTracker {
        let mut tracker = RejectionTracker::new();
        rules::check_insider_trading(&mut tracker, context);
        rules::check_earnings_risk(&mut tracker, context);
        tracker
    }
}
