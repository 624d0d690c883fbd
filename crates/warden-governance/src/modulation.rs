//! Adaptive gate thresholds.
//!
//! Three factors scale each gate's base threshold:
//!
//! - **mode**: stricter symbolic modes tighten
//! - **uncertainty**: epistemic-dominated uncertainty tightens, aleatoric
//!   dominated relaxes
//! - **calibration**: ECE worse than target tightens, better relaxes
//!
//! The combined tightening factor is floored so a threshold can never divide
//! by zero or flip sign. The autonomy level rides along for audit only.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::autonomy::{AutonomyLevel, CalibrationMetrics};
use crate::error::{check_unit, GovernanceError};
use crate::floor::{check_immutable_constraints, FloorInput};

/// Symbolic governance mode, ranked by strictness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceMode {
    Flexible,
    Standard,
    Strict,
    Forbidden,
}

impl GovernanceMode {
    /// Rank 0 (flexible) to 3 (forbidden).
    pub fn strictness(&self) -> u8 {
        *self as u8
    }

    pub fn from_name(name: &str) -> Result<Self, GovernanceError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flexible" => Ok(GovernanceMode::Flexible),
            "standard" => Ok(GovernanceMode::Standard),
            "strict" => Ok(GovernanceMode::Strict),
            "forbidden" => Ok(GovernanceMode::Forbidden),
            _ => Err(GovernanceError::UnknownMode(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GovernanceMode::Flexible => "flexible",
            GovernanceMode::Standard => "standard",
            GovernanceMode::Strict => "strict",
            GovernanceMode::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for GovernanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split of total uncertainty into reducible and irreducible parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyDecomposition {
    pub total: f64,
    pub epistemic: f64,
    pub aleatoric: f64,
    /// `epistemic / total`; 0 when total is 0.
    pub epistemic_ratio: f64,
    pub method: String,
}

impl UncertaintyDecomposition {
    pub fn new(
        epistemic: f64,
        aleatoric: f64,
        method: impl Into<String>,
    ) -> Result<Self, GovernanceError> {
        check_unit("epistemic", epistemic)?;
        check_unit("aleatoric", aleatoric)?;
        let total = epistemic + aleatoric;
        if total > 1.0 {
            return Err(GovernanceError::UncertaintyOverflow(total));
        }
        let epistemic_ratio = if total > 0.0 { epistemic / total } else { 0.0 };
        Ok(Self {
            total,
            epistemic,
            aleatoric,
            epistemic_ratio,
            method: method.into(),
        })
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        check_unit("total", self.total)?;
        check_unit("epistemic", self.epistemic)?;
        check_unit("aleatoric", self.aleatoric)?;
        check_unit("epistemic_ratio", self.epistemic_ratio)
    }
}

/// Named modulation constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationConfig {
    /// Weight of mode strictness (default: 0.5)
    pub k_mode: f64,
    /// Weight of epistemic ratio deviation (default: 0.5)
    pub k_uncertainty: f64,
    /// Weight of ECE deviation (default: 1.0)
    pub k_calibration: f64,
    /// Epistemic ratio treated as neutral (default: 0.5)
    pub baseline_epistemic_ratio: f64,
    /// ECE treated as neutral (default: 0.05)
    pub target_ece: f64,
    /// Lower bound on the combined tightening factor (default: 0.1)
    pub min_tightening_factor: f64,
}

impl Default for ModulationConfig {
    fn default() -> Self {
        Self {
            k_mode: 0.5,
            k_uncertainty: 0.5,
            k_calibration: 1.0,
            baseline_epistemic_ratio: 0.5,
            target_ece: 0.05,
            min_tightening_factor: 0.1,
        }
    }
}

impl ModulationConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        for (name, value) in [
            ("k_mode", self.k_mode),
            ("k_uncertainty", self.k_uncertainty),
            ("k_calibration", self.k_calibration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GovernanceError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        check_unit("baseline_epistemic_ratio", self.baseline_epistemic_ratio)?;
        check_unit("target_ece", self.target_ece)?;
        if !(self.min_tightening_factor > 0.0 && self.min_tightening_factor.is_finite()) {
            return Err(GovernanceError::InvalidConfig(format!(
                "min_tightening_factor must be positive, got {}",
                self.min_tightening_factor
            )));
        }
        Ok(())
    }
}

/// One configurable gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub name: String,
    pub base_threshold: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    /// When true a lower threshold is stricter and observations must stay at
    /// or below it; otherwise observations must reach it.
    pub lower_is_stricter: bool,
}

impl GateSpec {
    pub fn new(name: impl Into<String>, base: f64, min: f64, max: f64, lower_is_stricter: bool) -> Self {
        Self {
            name: name.into(),
            base_threshold: base,
            min_threshold: min,
            max_threshold: max,
            lower_is_stricter,
        }
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        let invalid = |reason: String| GovernanceError::InvalidGate {
            gate: self.name.clone(),
            reason,
        };
        if ![self.base_threshold, self.min_threshold, self.max_threshold]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("thresholds must be finite".into()));
        }
        if self.min_threshold > self.max_threshold {
            return Err(invalid(format!(
                "min {} above max {}",
                self.min_threshold, self.max_threshold
            )));
        }
        if !(self.min_threshold..=self.max_threshold).contains(&self.base_threshold) {
            return Err(invalid(format!(
                "base {} outside [{}, {}]",
                self.base_threshold, self.min_threshold, self.max_threshold
            )));
        }
        Ok(())
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min_threshold).min(self.max_threshold)
    }
}

/// Entropy floor for a vocabulary: `1 / log2(vocab_size)`, or 1.0 for
/// vocabularies too small to carry information.
pub fn vocabulary_floor(vocab_size: usize) -> f64 {
    if vocab_size < 2 {
        return 1.0;
    }
    1.0 / (vocab_size as f64).log2()
}

/// The standard gates. Entropy's minimum depends on vocabulary size.
pub fn default_gates(vocab_size: usize) -> Vec<GateSpec> {
    let entropy_base = 0.5;
    vec![
        GateSpec::new("confidence", 0.7, 0.5, 0.95, false),
        GateSpec::new("coverage", 0.6, 0.4, 0.9, false),
        GateSpec::new("drift", 0.15, 0.05, 0.3, true),
        GateSpec::new(
            "entropy",
            entropy_base,
            vocabulary_floor(vocab_size).min(entropy_base),
            0.8,
            true,
        ),
    ]
}

/// Factors and resulting threshold for one gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceModulation {
    pub gate: String,
    pub base_threshold: f64,
    pub mode_factor: f64,
    pub uncertainty_factor: f64,
    pub calibration_factor: f64,
    /// Product of the three factors after the floor.
    pub tightening_factor: f64,
    pub effective_threshold: f64,
    pub lower_is_stricter: bool,
    pub mode: GovernanceMode,
    pub uncertainty: UncertaintyDecomposition,
    /// Observability only; never enters the threshold.
    pub autonomy_level: AutonomyLevel,
}

pub fn compute_mode_factor(mode: GovernanceMode, config: &ModulationConfig) -> f64 {
    1.0 + (f64::from(mode.strictness()) / 3.0) * config.k_mode
}

pub fn compute_uncertainty_factor(
    uncertainty: &UncertaintyDecomposition,
    config: &ModulationConfig,
) -> f64 {
    1.0 + (uncertainty.epistemic_ratio - config.baseline_epistemic_ratio) * config.k_uncertainty
}

pub fn compute_calibration_factor(calibration: &CalibrationMetrics, config: &ModulationConfig) -> f64 {
    1.0 + (calibration.ece.min(1.0) - config.target_ece) * config.k_calibration
}

/// Modulate `gate` for the given mode, uncertainty and calibration.
pub fn compute_modulation(
    gate: &GateSpec,
    mode: GovernanceMode,
    uncertainty: &UncertaintyDecomposition,
    calibration: &CalibrationMetrics,
    autonomy_level: AutonomyLevel,
    config: &ModulationConfig,
) -> Result<GovernanceModulation, GovernanceError> {
    gate.validate()?;
    uncertainty.validate()?;
    calibration.validate()?;

    let mode_factor = compute_mode_factor(mode, config);
    let uncertainty_factor = compute_uncertainty_factor(uncertainty, config);
    let calibration_factor = compute_calibration_factor(calibration, config);
    let tightening_factor =
        (mode_factor * uncertainty_factor * calibration_factor).max(config.min_tightening_factor);

    let raw = if gate.lower_is_stricter {
        gate.base_threshold / tightening_factor
    } else {
        gate.base_threshold * tightening_factor
    };
    let effective_threshold = gate.clamp(raw);

    debug!(
        gate = %gate.name,
        mode = %mode,
        mode_factor,
        uncertainty_factor,
        calibration_factor,
        effective_threshold,
        "Gate threshold modulated"
    );

    Ok(GovernanceModulation {
        gate: gate.name.clone(),
        base_threshold: gate.base_threshold,
        mode_factor,
        uncertainty_factor,
        calibration_factor,
        tightening_factor,
        effective_threshold,
        lower_is_stricter: gate.lower_is_stricter,
        mode,
        uncertainty: uncertainty.clone(),
        autonomy_level,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Allow,
    Hold,
    Block,
}

impl GateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::Allow => "allow",
            GateAction::Hold => "hold",
            GateAction::Block => "block",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub gate: String,
    pub action: GateAction,
    pub reason: String,
    pub immutable_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violated_constraint: Option<String>,
    pub threshold: f64,
    pub observed_value: f64,
    pub modulation: GovernanceModulation,
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Decide one gate. The immutable floor is consulted first; the modulated
/// threshold only applies when the floor passes.
///
/// A threshold miss blocks under strict mode and holds otherwise.
pub fn make_gate_decision(
    gate_name: &str,
    observed_value: f64,
    modulation: &GovernanceModulation,
    lower_is_stricter: bool,
) -> GateDecision {
    let threshold = modulation.effective_threshold;
    let decision = |action: GateAction,
                    reason: String,
                    immutable_triggered: bool,
                    violated_constraint: Option<String>| GateDecision {
        gate: gate_name.to_string(),
        action,
        reason,
        immutable_triggered,
        violated_constraint,
        threshold,
        observed_value,
        modulation: modulation.clone(),
        audit_id: format!("aud-{}", Uuid::new_v4()),
        timestamp: Utc::now(),
    };

    let floor = check_immutable_constraints(&FloorInput {
        mode: Some(modulation.mode),
        total_uncertainty: Some(modulation.uncertainty.total),
        ..FloorInput::default()
    });
    if !floor.passed {
        let action = floor.action.unwrap_or(GateAction::Block);
        let reason = format!(
            "{gate_name}: immutable floor {}",
            floor.reason.as_deref().unwrap_or("violated")
        );
        return decision(action, reason, true, floor.violated_constraint);
    }

    let context = format!(
        "base {:.3}, mode {}, epistemic ratio {:.2}",
        modulation.base_threshold, modulation.mode, modulation.uncertainty.epistemic_ratio
    );

    let passes = if lower_is_stricter {
        observed_value <= threshold
    } else {
        observed_value >= threshold
    };
    if passes {
        let reason = format!(
            "{gate_name}: observed {observed_value:.3} within threshold {threshold:.3} ({context})"
        );
        return decision(GateAction::Allow, reason, false, None);
    }

    let action = if modulation.mode >= GovernanceMode::Strict {
        GateAction::Block
    } else {
        GateAction::Hold
    };
    let relation = if lower_is_stricter { "above" } else { "below" };
    let reason = format!(
        "{gate_name}: observed {observed_value:.3} {relation} threshold {threshold:.3} ({context})"
    );
    warn!(gate = %gate_name, action = action.as_str(), observed_value, threshold, "Gate threshold not met");
    decision(action, reason, false, None)
}
