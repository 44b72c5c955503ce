// Errors raised by the telemetry core
use thiserror::Error;

/// Structurally invalid input rejected by the time-window resolver or the
/// narration generator. Numeric oddities never end up here; the metric and
/// statistics code degrades to defaults instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid period '{0}', expected one of 1h, 24h, 7d, 30d, custom")]
    InvalidPeriod(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidPeriod(_) => "InvalidPeriod",
            CoreError::InvalidRange(_) => "InvalidRange",
            CoreError::InvalidInput(_) => "InvalidInput",
        }
    }
}
