//! Trust-level state machine.
//!
//! Ascent is slow: tens of consecutive calibrated windows per level.
//! Descent is fast: one critical miss, three degraded windows, or any
//! immutable violation. Every step returns a new [`TrustState`]; the caller
//! owns storage and keys it however it likes (per agent, per agent class).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{check_unit, GovernanceError};

/// Four ranked autonomy tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    Supervised,
    Guided,
    Collaborative,
    Autonomous,
}

impl AutonomyLevel {
    pub const ALL: [AutonomyLevel; 4] = [
        AutonomyLevel::Supervised,
        AutonomyLevel::Guided,
        AutonomyLevel::Collaborative,
        AutonomyLevel::Autonomous,
    ];

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn next(&self) -> Option<AutonomyLevel> {
        Self::ALL.get(self.rank() as usize + 1).copied()
    }

    /// One level down, saturating at `Supervised`.
    pub fn previous(&self) -> AutonomyLevel {
        match self {
            AutonomyLevel::Supervised | AutonomyLevel::Guided => AutonomyLevel::Supervised,
            AutonomyLevel::Collaborative => AutonomyLevel::Guided,
            AutonomyLevel::Autonomous => AutonomyLevel::Collaborative,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AutonomyLevel::Supervised => "supervised",
            AutonomyLevel::Guided => "guided",
            AutonomyLevel::Collaborative => "collaborative",
            AutonomyLevel::Autonomous => "autonomous",
        }
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustDirection {
    Ascent,
    Descent,
}

/// One recorded level change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustTransition {
    pub from: AutonomyLevel,
    pub to: AutonomyLevel,
    pub direction: TrustDirection,
    pub trigger: String,
    /// ECE of the window that caused the change.
    pub calibration_at_transition: f64,
    pub timestamp: DateTime<Utc>,
}

/// A reliability-diagram bin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
    pub mean_confidence: f64,
    pub accuracy: f64,
}

/// Calibration scores for one evaluation window, supplied by telemetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetrics {
    pub ece: f64,
    pub mce: f64,
    pub brier_score: f64,
    pub window_size: u64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default)]
    pub buckets: Vec<CalibrationBucket>,
}

impl CalibrationMetrics {
    /// Metrics for a window with no bucket breakdown.
    pub fn new(
        ece: f64,
        window_size: u64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            ece,
            mce: ece,
            brier_score: ece,
            window_size,
            window_start,
            window_end,
            buckets: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        check_unit("ece", self.ece)?;
        check_unit("mce", self.mce)?;
        check_unit("brier_score", self.brier_score)?;
        for bucket in &self.buckets {
            check_unit("bucket.mean_confidence", bucket.mean_confidence)?;
            check_unit("bucket.accuracy", bucket.accuracy)?;
        }
        if self.window_end < self.window_start {
            return Err(GovernanceError::WindowOrder);
        }
        Ok(())
    }
}

/// Streak lengths that drive the state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// A window with ECE below this is calibrated (default: 0.1)
    pub calibration_threshold: f64,
    /// Consecutive calibrated windows needed to leave supervised, guided and
    /// collaborative respectively (default: 10, 20, 50)
    pub ascent_requirements: [u32; 3],
    /// Consecutive degraded windows that force a one-level descent (default: 3)
    pub degraded_window_limit: u32,
    /// Calibrated windows after a descent that clear probation (default: 5)
    pub probation_windows: u32,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            calibration_threshold: 0.1,
            ascent_requirements: [10, 20, 50],
            degraded_window_limit: 3,
            probation_windows: 5,
        }
    }
}

impl AutonomyConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        check_unit("calibration_threshold", self.calibration_threshold)?;
        if self.ascent_requirements.contains(&0) {
            return Err(GovernanceError::InvalidConfig(
                "ascent requirements must be positive".into(),
            ));
        }
        if self.degraded_window_limit == 0 {
            return Err(GovernanceError::InvalidConfig(
                "degraded_window_limit must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Calibrated streak needed to leave `level`; `None` at the top.
    pub fn ascent_requirement(&self, level: AutonomyLevel) -> Option<u32> {
        self.ascent_requirements.get(level.rank() as usize).copied()
    }
}

/// Trust held by one agent or agent class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustState {
    pub level: AutonomyLevel,
    pub consecutive_calibrated_windows: u32,
    pub consecutive_degraded_windows: u32,
    pub total_predictions: u64,
    pub level_entered_at: DateTime<Utc>,
    pub transitions: Vec<TrustTransition>,
    pub calibration_threshold: f64,
    pub probationary: bool,
    /// Calibrated windows accrued since the last descent.
    #[serde(default)]
    pub probation_progress: u32,
}

pub fn create_initial_trust_state() -> TrustState {
    create_trust_state(&AutonomyConfig::default(), Utc::now())
}

/// Fresh supervised state using `config`'s calibration threshold.
pub fn create_trust_state(config: &AutonomyConfig, now: DateTime<Utc>) -> TrustState {
    TrustState {
        level: AutonomyLevel::Supervised,
        consecutive_calibrated_windows: 0,
        consecutive_degraded_windows: 0,
        total_predictions: 0,
        level_entered_at: now,
        transitions: Vec::new(),
        calibration_threshold: config.calibration_threshold,
        probationary: false,
        probation_progress: 0,
    }
}

/// Advance `state` by one window using the default streak lengths.
pub fn process_calibration_window(
    state: &TrustState,
    metrics: &CalibrationMetrics,
    critical_miss: bool,
    immutable_violation: bool,
) -> Result<TrustState, GovernanceError> {
    process_calibration_window_with(
        state,
        metrics,
        critical_miss,
        immutable_violation,
        &AutonomyConfig::default(),
    )
}

/// Advance `state` by one window.
///
/// Order: immutable violation, then critical miss, then the
/// calibrated/degraded streaks. Timestamps come from `metrics.window_end`.
/// Metrics are validated only for the streak step; both descents apply
/// even when the window's telemetry is malformed.
pub fn process_calibration_window_with(
    state: &TrustState,
    metrics: &CalibrationMetrics,
    critical_miss: bool,
    immutable_violation: bool,
    config: &AutonomyConfig,
) -> Result<TrustState, GovernanceError> {
    let mut next = state.clone();
    next.total_predictions = next.total_predictions.saturating_add(metrics.window_size);
    let at = metrics.window_end;

    if immutable_violation {
        error!(
            from = %state.level,
            severity = "critical",
            "Immutable violation: trust reset to supervised"
        );
        descend(&mut next, AutonomyLevel::Supervised, "immutable_violation", recorded_ece(metrics.ece), at);
        return Ok(next);
    }

    if critical_miss {
        let to = state.level.previous();
        warn!(from = %state.level, to = %to, "Critical miss: one-level descent");
        descend(&mut next, to, "critical_miss", recorded_ece(metrics.ece), at);
        return Ok(next);
    }

    metrics.validate()?;

    if metrics.ece < state.calibration_threshold {
        next.consecutive_calibrated_windows += 1;
        next.consecutive_degraded_windows = 0;

        if next.probationary {
            next.probation_progress += 1;
            if next.probation_progress >= config.probation_windows {
                next.probationary = false;
                next.probation_progress = 0;
                info!(level = %next.level, "Probation cleared");
            }
        }

        if let (Some(required), Some(to)) =
            (config.ascent_requirement(state.level), state.level.next())
        {
            if next.consecutive_calibrated_windows >= required {
                info!(
                    from = %state.level,
                    to = %to,
                    streak = next.consecutive_calibrated_windows,
                    "Trust ascent"
                );
                next.transitions.push(TrustTransition {
                    from: state.level,
                    to,
                    direction: TrustDirection::Ascent,
                    trigger: format!("{required} consecutive calibrated windows"),
                    calibration_at_transition: metrics.ece,
                    timestamp: at,
                });
                next.level = to;
                next.level_entered_at = at;
                next.consecutive_calibrated_windows = 0;
                next.consecutive_degraded_windows = 0;
            }
        }
    } else {
        next.consecutive_degraded_windows += 1;
        next.consecutive_calibrated_windows = 0;
        debug!(
            level = %state.level,
            ece = metrics.ece,
            streak = next.consecutive_degraded_windows,
            "Degraded calibration window"
        );

        if next.consecutive_degraded_windows >= config.degraded_window_limit {
            let to = state.level.previous();
            warn!(from = %state.level, to = %to, "Sustained miscalibration: one-level descent");
            descend(&mut next, to, "sustained_miscalibration", metrics.ece, at);
        }
    }

    Ok(next)
}

/// ECE stored on a descent transition: clamped to `[0, 1]`, NaN as 1.0.
fn recorded_ece(ece: f64) -> f64 {
    if ece.is_nan() {
        1.0
    } else {
        ece.clamp(0.0, 1.0)
    }
}

/// Apply a descent. Counters always reset; history and probation change
/// only when the level actually drops.
fn descend(state: &mut TrustState, to: AutonomyLevel, trigger: &str, ece: f64, at: DateTime<Utc>) {
    let from = state.level;
    if from != to {
        state.transitions.push(TrustTransition {
            from,
            to,
            direction: TrustDirection::Descent,
            trigger: trigger.to_string(),
            calibration_at_transition: ece,
            timestamp: at,
        });
        state.level = to;
        state.level_entered_at = at;
        state.probationary = true;
        state.probation_progress = 0;
    }
    state.consecutive_calibrated_windows = 0;
    state.consecutive_degraded_windows = 0;
}

pub fn is_action_permitted(state: &TrustState, required_level: AutonomyLevel) -> bool {
    state.level >= required_level
}
