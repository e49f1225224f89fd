use thiserror::Error;

/// Error taxonomy shared across every sensor and engine crate.
///
/// `TechnicalPipelineFailed` is the single terminal variant: the
/// orchestrator aborts the request when it sees this one, while every
/// other variant only degrades data integrity for the affected sensor.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("ticker not found: {0}")]
    TickerNotFound(String),

    #[error("liquidity halt: fewer than {min_bars} bars available for {ticker}")]
    LiquidityHalt { ticker: String, min_bars: usize },

    #[error("provider throttled: {0}")]
    ProviderThrottled(String),

    #[error("sensor error: {0}")]
    SensorError(String),

    #[error("data integrity violation: {0}")]
    DataIntegrityError(String),

    #[error("technical pipeline failed: {0}")]
    TechnicalPipelineFailed(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("calculation error: {0}")]
    CalculationError(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AnalysisError {
    /// Whether this error should abort the whole request rather than
    /// merely degrade the affected sensor's contribution.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisError::TechnicalPipelineFailed(_))
    }
}
