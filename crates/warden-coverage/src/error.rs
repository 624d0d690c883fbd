use thiserror::Error;

/// Errors from tool registry configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoverageError {
    #[error("tool '{tool}' has risk weight {risk} outside [0, 1]")]
    RiskOutOfRange { tool: String, risk: f64 },

    #[error("tool profile has an empty name")]
    EmptyToolName,

    #[error("invalid coverage limit: {0}")]
    InvalidLimit(String),
}
