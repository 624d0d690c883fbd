use thiserror::Error;
use warden_coverage::CoverageError;
use warden_frame::FrameError;
use warden_governance::GovernanceError;
use warden_interceptor::InterceptorError;

/// Errors loading or validating a [`crate::WardenConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error("symbol table: {0}")]
    Symbols(#[from] FrameError),

    #[error("coverage: {0}")]
    Coverage(#[from] CoverageError),

    #[error("thresholds: {0}")]
    Thresholds(#[from] InterceptorError),

    #[error("governance: {0}")]
    Governance(#[from] GovernanceError),

    #[error("duplicate gate: {0}")]
    DuplicateGate(String),
}

/// Errors from a [`crate::Warden`] session.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("unknown gate: {0}")]
    UnknownGate(String),
}

pub type WardenResult<T> = Result<T, WardenError>;
