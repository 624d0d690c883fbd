use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use warden_frame::Frame;

use crate::error::CoverageError;
use crate::registry::{ToolCategory, ToolRegistry};
use crate::scope::find_external_target;

/// Penalty subtracted for each failing check class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageWeights {
    pub domain: f64,
    pub action: f64,
    pub risk: f64,
    pub scope: f64,
}

impl Default for CoverageWeights {
    fn default() -> Self {
        Self {
            domain: 0.3,
            action: 0.3,
            risk: 0.2,
            scope: 0.2,
        }
    }
}

/// Risk bands and argument ceilings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageLimits {
    /// Tools above this risk need the strictest mode.
    pub high_risk: f64,
    /// Tools above this risk need at least the middle strictness.
    pub moderate_risk: f64,
    /// Mode strength counted as strictest.
    pub strict_mode_strength: u8,
    /// Mode strength counted as middle strictness.
    pub standard_mode_strength: u8,
    /// Financial `amount` above this needs an `approved` constraint.
    pub financial_amount_ceiling: f64,
}

impl Default for CoverageLimits {
    fn default() -> Self {
        Self {
            high_risk: 0.7,
            moderate_risk: 0.4,
            strict_mode_strength: 3,
            standard_mode_strength: 2,
            financial_amount_ceiling: 10_000.0,
        }
    }
}

impl CoverageLimits {
    pub fn validate(&self) -> Result<(), CoverageError> {
        if !(0.0..=1.0).contains(&self.moderate_risk) || !(0.0..=1.0).contains(&self.high_risk) {
            return Err(CoverageError::InvalidLimit(
                "risk bands must lie in [0, 1]".into(),
            ));
        }
        if self.moderate_risk > self.high_risk {
            return Err(CoverageError::InvalidLimit(format!(
                "moderate risk {} exceeds high risk {}",
                self.moderate_risk, self.high_risk
            )));
        }
        if self.standard_mode_strength > self.strict_mode_strength {
            return Err(CoverageError::InvalidLimit(
                "standard mode strength exceeds strict mode strength".into(),
            ));
        }
        if self.financial_amount_ceiling < 0.0 {
            return Err(CoverageError::InvalidLimit(
                "financial amount ceiling must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// How well a frame justifies one tool call. Recomputed per interception.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// 0.0–1.0, starting at 1.0 minus the weight of each failed check class.
    pub confidence: f64,
    /// True iff no penalty applied.
    pub covered: bool,
    pub uncovered_aspects: Vec<String>,
    pub details: String,
}

/// Scores frames against proposed tool calls.
#[derive(Clone, Debug, Default)]
pub struct CoverageCalculator {
    registry: ToolRegistry,
    weights: CoverageWeights,
    limits: CoverageLimits,
}

impl CoverageCalculator {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            weights: CoverageWeights::default(),
            limits: CoverageLimits::default(),
        }
    }

    /// Calculator over [`ToolRegistry::standard`].
    pub fn standard() -> Self {
        Self::new(ToolRegistry::standard())
    }

    pub fn with_weights(mut self, weights: CoverageWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_limits(mut self, limits: CoverageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// Score `frame` against a call of `tool` with `args`.
    pub fn calculate(&self, frame: &Frame, tool: &str, args: &Value) -> CoverageResult {
        let profile = self.registry.get(tool);
        let mut confidence = 1.0;
        let mut uncovered = Vec::new();

        // 1. Domain
        let domain_ok = match (frame.effective_domain(), profile) {
            (Some(domain), Some(p)) => p.covers_domain(domain),
            _ => false,
        };
        if !domain_ok {
            confidence -= self.weights.domain;
            uncovered.push(match (frame.effective_domain(), profile) {
                (None, _) => format!("frame declares no domain for tool '{tool}'"),
                (Some(domain), Some(p)) => format!(
                    "domain '{domain}' not covered by tool '{tool}' (tool domains: {})",
                    p.domains.join(", ")
                ),
                (Some(domain), None) => {
                    format!("domain '{domain}' cannot be matched to unregistered tool '{tool}'")
                }
            });
        }

        // 2. Action
        let action_ok = match (frame.effective_action(), profile) {
            (Some(action), Some(p)) => p.covers_action(action),
            _ => false,
        };
        if !action_ok {
            confidence -= self.weights.action;
            uncovered.push(match (frame.effective_action(), profile) {
                (None, _) => format!("frame declares no action for tool '{tool}'"),
                (Some(action), Some(p)) => format!(
                    "action '{action}' not compatible with tool '{tool}' (tool actions: {})",
                    p.actions.join(", ")
                ),
                (Some(action), None) => {
                    format!("action '{action}' cannot be matched to unregistered tool '{tool}'")
                }
            });
        }

        // 3. Risk vs mode
        let risk = self.registry.risk(tool);
        let required = if risk > self.limits.high_risk {
            Some(self.limits.strict_mode_strength)
        } else if risk > self.limits.moderate_risk {
            Some(self.limits.standard_mode_strength)
        } else {
            None
        };
        if let Some(required) = required {
            let strength = frame.mode_strength();
            if strength.map_or(true, |s| s < required) {
                confidence -= self.weights.risk;
                uncovered.push(format!(
                    "tool '{tool}' risk {risk:.2} requires mode strength {required}, frame mode '{}' has {}",
                    frame.effective_mode().unwrap_or("none"),
                    strength.map_or_else(|| "none".to_string(), |s| s.to_string()),
                ));
            }
        }

        // 4. Argument scope
        let mut scope_failures = Vec::new();
        if frame.is_internal_only() {
            if let Some((kind, value)) = find_external_target(args) {
                scope_failures.push(format!(
                    "internal-only domain but arguments reference external {}: {value}",
                    kind.as_str()
                ));
            }
        }
        if profile.is_some_and(|p| p.category == ToolCategory::Financial) {
            if let Some(amount) = args.get("amount").and_then(Value::as_f64) {
                if amount > self.limits.financial_amount_ceiling && !frame.has_constraint("approved")
                {
                    scope_failures.push(format!(
                        "amount {amount} exceeds {} without an approved constraint",
                        self.limits.financial_amount_ceiling
                    ));
                }
            }
        }
        if !scope_failures.is_empty() {
            confidence -= self.weights.scope;
            uncovered.extend(scope_failures);
        }

        let confidence = f64::max(confidence, 0.0);
        let covered = uncovered.is_empty();
        let details = if covered {
            format!("frame fully covers tool '{tool}'")
        } else {
            format!(
                "coverage {confidence:.2} for tool '{tool}': {}",
                uncovered.join("; ")
            )
        };

        debug!(
            tool,
            confidence,
            uncovered = uncovered.len(),
            "Coverage calculated"
        );

        CoverageResult {
            confidence,
            covered,
            uncovered_aspects: uncovered,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_frame::parse;

    fn calc() -> CoverageCalculator {
        CoverageCalculator::standard()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn matching_frame_is_fully_covered() {
        let frame = parse("◈ Ⓓ ◉ ⊞").unwrap();
        let result = calc().calculate(&frame, "read_file", &json!({"path": "/tmp/a"}));
        assert!(result.covered);
        assert_close(result.confidence, 1.0);
        assert!(result.uncovered_aspects.is_empty());
    }

    #[test]
    fn domain_mismatch_costs_exactly_domain_weight() {
        let frame = parse("◈ Ⓕ ◉").unwrap();
        let result = calc().calculate(&frame, "read_file", &json!({}));
        assert!(!result.covered);
        assert_close(result.confidence, 0.7);
        assert_eq!(result.uncovered_aspects.len(), 1);
        assert!(result.uncovered_aspects[0].contains("domain 'finance'"));
    }

    #[test]
    fn action_mismatch_costs_action_weight() {
        let frame = parse("◆ Ⓓ ✂").unwrap();
        let result = calc().calculate(&frame, "read_file", &json!({}));
        assert_close(result.confidence, 0.7);
        assert!(result.uncovered_aspects[0].contains("action 'delete'"));
    }

    #[test]
    fn high_risk_tool_needs_strict_mode() {
        let frame = parse("◈ Ⓢ ⇒").unwrap();
        let result = calc().calculate(&frame, "execute_command", &json!({"cmd": "ls"}));
        assert_close(result.confidence, 0.8);
        assert!(result.uncovered_aspects[0].contains("requires mode strength 3"));

        let frame = parse("◆ Ⓢ ⇒").unwrap();
        let result = calc().calculate(&frame, "execute_command", &json!({"cmd": "ls"}));
        assert!(result.covered);
    }

    #[test]
    fn moderate_risk_tool_needs_standard_mode() {
        let frame = parse("◇ Ⓓ ✎").unwrap();
        let result = calc().calculate(&frame, "write_file", &json!({}));
        assert_close(result.confidence, 0.8);

        let frame = parse("◈ Ⓓ ✎").unwrap();
        assert!(calc().calculate(&frame, "write_file", &json!({})).covered);
    }

    #[test]
    fn internal_domain_rejects_external_targets() {
        let frame = parse("◈ Ⓝ[internal] ◉").unwrap();
        let result = calc().calculate(
            &frame,
            "http_request",
            &json!({"request": {"url": "https://exfil.example.com/drop"}}),
        );
        assert_close(result.confidence, 0.8);
        assert!(result.uncovered_aspects[0].contains("internal-only"));
    }

    #[test]
    fn large_financial_amount_needs_approval() {
        let frame = parse("◆ Ⓕ ⇄ ⊠").unwrap();
        let result = calc().calculate(&frame, "transfer_funds", &json!({"amount": 25_000}));
        assert_close(result.confidence, 0.8);

        let frame = parse("◆ ✓ Ⓕ ⇄ ⊠").unwrap();
        let result = calc().calculate(&frame, "transfer_funds", &json!({"amount": 25_000}));
        assert!(result.covered);

        let frame = parse("◆ Ⓕ ⇄ ⊠").unwrap();
        let result = calc().calculate(&frame, "transfer_funds", &json!({"amount": 500}));
        assert!(result.covered);
    }

    #[test]
    fn scope_penalty_applies_once_for_multiple_reasons() {
        let frame = parse("◆ Ⓕ[internal] ⇄").unwrap();
        let result = calc().calculate(
            &frame,
            "transfer_funds",
            &json!({"amount": 50_000, "payee": "mallory@evil.example.com"}),
        );
        assert_close(result.confidence, 0.8);
        assert_eq!(result.uncovered_aspects.len(), 2);
    }

    #[test]
    fn unknown_tool_fails_domain_and_action() {
        let frame = parse("◆ Ⓓ ◉").unwrap();
        let result = calc().calculate(&frame, "launch_rocket", &json!({}));
        assert_close(result.confidence, 0.4);
        assert_eq!(result.uncovered_aspects.len(), 2);
    }

    #[test]
    fn confidence_floors_at_zero() {
        let weights = CoverageWeights {
            domain: 0.6,
            action: 0.6,
            risk: 0.2,
            scope: 0.2,
        };
        let frame = parse("◇ ⊗").unwrap();
        let result = calc()
            .with_weights(weights)
            .calculate(&frame, "execute_command", &json!({}));
        assert_eq!(result.confidence, 0.0);
        assert!(!result.covered);
    }

    #[test]
    fn limits_validation() {
        assert!(CoverageLimits::default().validate().is_ok());
        let bad = CoverageLimits {
            moderate_risk: 0.9,
            high_risk: 0.5,
            ..CoverageLimits::default()
        };
        assert!(bad.validate().is_err());
    }
}
