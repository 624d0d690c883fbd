use thiserror::Error;

/// Configuration and input errors. Governance denials are never errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterceptorError {
    #[error("threshold {name} = {value} outside [0, 1]")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("observed confidence {0} outside [0, 1]")]
    ObservedConfidenceOutOfRange(f64),
}
