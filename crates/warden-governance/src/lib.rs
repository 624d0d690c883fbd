//! # warden-governance
//!
//! Adaptive governance for agent tool calls.
//!
//! - [`autonomy`]: a four-level trust state machine. Ascent takes tens of
//!   calibrated windows; descent can happen in one.
//! - [`modulation`]: per-gate thresholds scaled by symbolic mode,
//!   uncertainty decomposition and calibration error.
//! - [`floor`]: fixed safety checks consulted before any threshold. No
//!   configuration can relax them.
//!
//! Everything here is a pure function of its inputs. Trust states are values;
//! callers decide where to keep them.

#![deny(unsafe_code)]

pub mod autonomy;
pub mod error;
pub mod floor;
pub mod modulation;
pub mod sensitive;

pub use autonomy::{
    create_initial_trust_state, create_trust_state, is_action_permitted,
    process_calibration_window, process_calibration_window_with, AutonomyConfig, AutonomyLevel,
    CalibrationBucket, CalibrationMetrics, TrustDirection, TrustState, TrustTransition,
};
pub use error::GovernanceError;
pub use floor::{
    check_immutable_constraints, dempster_shafer_conflict, FloorCheckResult, FloorInput,
    FloorSeverity, MassFunction, EVIDENTIAL_CONFLICT_CEILING, MAX_CONSECUTIVE_FAILURES,
    UNCERTAINTY_CEILING,
};
pub use modulation::{
    compute_calibration_factor, compute_mode_factor, compute_modulation,
    compute_uncertainty_factor, default_gates, make_gate_decision, vocabulary_floor, GateAction,
    GateDecision, GateSpec, GovernanceMode, GovernanceModulation, ModulationConfig,
    UncertaintyDecomposition,
};
pub use sensitive::{contains_sensitive_data, detect_sensitive_data, SensitiveDataKind};
