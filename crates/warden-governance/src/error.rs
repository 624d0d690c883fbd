use thiserror::Error;

/// Malformed governance input.
///
/// Holds and blocks are decisions, not errors; these variants reject
/// telemetry or configuration that is out of range before any decision is
/// computed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("{field} = {value} outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("calibration window ends before it starts")]
    WindowOrder,

    #[error("total uncertainty {0} exceeds 1")]
    UncertaintyOverflow(f64),

    #[error("unknown governance mode: {0}")]
    UnknownMode(String),

    #[error("invalid mass function: {0}")]
    InvalidMassFunction(String),

    #[error("invalid gate {gate}: {reason}")]
    InvalidGate { gate: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reject values outside the unit interval, NaN included.
pub(crate) fn check_unit(field: &'static str, value: f64) -> Result<(), GovernanceError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GovernanceError::OutOfRange { field, value })
    }
}
