use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use warden_frame::{Frame, FrameParser, FrameValidator, ValidationReport};
use warden_governance::{
    check_immutable_constraints, compute_modulation, create_trust_state, make_gate_decision,
    process_calibration_window_with, CalibrationMetrics, FloorCheckResult, FloorInput,
    GateDecision, GateSpec, GovernanceMode, TrustState, UncertaintyDecomposition,
};
use warden_interceptor::{ActionInterceptor, InterceptorDecision};

use crate::config::WardenConfig;
use crate::error::{ConfigError, WardenError, WardenResult};

/// One governance session: a parser and validator over the configured
/// symbol table, an interceptor holding audit and rate-limit state, and the
/// configured gates.
///
/// Trust states are not held here; callers keep one per agent or class and
/// pass it in.
#[derive(Debug)]
pub struct Warden {
    config: WardenConfig,
    parser: FrameParser,
    validator: FrameValidator,
    interceptor: ActionInterceptor,
    gates: Vec<GateSpec>,
}

impl Warden {
    pub fn new() -> WardenResult<Self> {
        Self::from_config(WardenConfig::default())
    }

    pub fn from_config(config: WardenConfig) -> WardenResult<Self> {
        config.validate()?;
        let interceptor = ActionInterceptor::with_calculator(config.coverage_calculator()?)
            .with_thresholds(config.thresholds)
            .map_err(ConfigError::from)?;
        let gates = config.gates();

        info!(
            symbols = config.symbols.len(),
            tools = config.tools.len(),
            gates = gates.len(),
            "Warden session initialised"
        );

        Ok(Self {
            parser: FrameParser::new(config.symbol_table()),
            validator: FrameValidator::new(config.validation),
            interceptor,
            gates,
            config,
        })
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn parse_frame(&self, raw: &str) -> WardenResult<Frame> {
        Ok(self.parser.parse(raw)?)
    }

    pub fn validate_frame(&self, frame: &Frame, parent: Option<&Frame>) -> ValidationReport {
        self.validator.validate(frame, parent)
    }

    pub fn intercept(
        &mut self,
        frame: &Frame,
        tool: &str,
        args: &Value,
        agent_id: &str,
    ) -> InterceptorDecision {
        self.interceptor.intercept(frame, tool, args, agent_id)
    }

    pub fn interceptor(&self) -> &ActionInterceptor {
        &self.interceptor
    }

    pub fn interceptor_mut(&mut self) -> &mut ActionInterceptor {
        &mut self.interceptor
    }

    pub fn gates(&self) -> &[GateSpec] {
        &self.gates
    }

    /// Fresh supervised trust state using the configured threshold.
    pub fn new_trust_state(&self) -> TrustState {
        create_trust_state(&self.config.autonomy, Utc::now())
    }

    /// Advance `state` by one window with the configured streak lengths.
    pub fn process_window(
        &self,
        state: &TrustState,
        metrics: &CalibrationMetrics,
        critical_miss: bool,
        immutable_violation: bool,
    ) -> WardenResult<TrustState> {
        Ok(process_calibration_window_with(
            state,
            metrics,
            critical_miss,
            immutable_violation,
            &self.config.autonomy,
        )?)
    }

    /// Modulate the named gate and decide it for `observed`.
    pub fn evaluate_gate(
        &self,
        gate: &str,
        observed: f64,
        mode: GovernanceMode,
        uncertainty: &UncertaintyDecomposition,
        calibration: &CalibrationMetrics,
        trust: &TrustState,
    ) -> WardenResult<GateDecision> {
        let spec = self
            .gates
            .iter()
            .find(|g| g.name == gate)
            .ok_or_else(|| WardenError::UnknownGate(gate.to_string()))?;

        let modulation = compute_modulation(
            spec,
            mode,
            uncertainty,
            calibration,
            trust.level,
            &self.config.modulation,
        )?;
        let decision = make_gate_decision(&spec.name, observed, &modulation, spec.lower_is_stricter);
        debug!(
            gate = %spec.name,
            action = decision.action.as_str(),
            audit_id = %decision.audit_id,
            "Gate evaluated"
        );
        Ok(decision)
    }

    pub fn check_floor(&self, input: &FloorInput<'_>) -> FloorCheckResult {
        check_immutable_constraints(input)
    }

    /// Governance mode implied by a frame: a forbidden constraint wins,
    /// otherwise the mode symbol's strength decides. Frames without a mode
    /// govern as standard.
    pub fn governance_mode(frame: &Frame) -> GovernanceMode {
        if frame.has_constraint("forbidden") {
            return GovernanceMode::Forbidden;
        }
        match frame.mode_strength() {
            Some(s) if s >= 3 => GovernanceMode::Strict,
            Some(2) | None => GovernanceMode::Standard,
            Some(_) => GovernanceMode::Flexible,
        }
    }
}
