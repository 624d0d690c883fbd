use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_coverage::CoverageCalculator;
use warden_frame::Frame;

use crate::audit::{AuditDecision, AuditEventType, AuditLog, AuditLogEntry};
use crate::binding::{match_tool_with, BindingMatch, PatternCache};
use crate::error::InterceptorError;
use crate::rate_limit::{RateLimitOutcome, RateLimiter};
use crate::thresholds::ConfidenceThresholds;

/// Outcome of one intercepted tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterceptorDecision {
    pub allowed: bool,
    pub reason: String,
    /// Frame text the agent supplied.
    pub frame: String,
    /// Tool the agent proposed to run.
    pub action: String,
    /// Set once the coverage gate has been reached.
    pub coverage_confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub audit_id: String,
    pub event_type: AuditEventType,
}

/// Result of comparing observed confidence after execution against the
/// thresholds and the coverage predicted at interception time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostAuditReport {
    pub audit_id: String,
    /// Id of the `post_audit` entry this check appended.
    pub post_audit_id: String,
    pub observed_confidence: f64,
    pub predicted_confidence: Option<f64>,
    pub drift: Option<f64>,
    pub below_threshold: bool,
    pub drift_exceeded: bool,
}

impl PostAuditReport {
    pub fn flagged(&self) -> bool {
        self.below_threshold || self.drift_exceeded
    }
}

/// A denial produced by one gate.
struct Denial {
    event_type: AuditEventType,
    reason: String,
    details: Value,
}

/// Sequences the governance gates for one caller.
///
/// Owns the audit ring buffer and the rate-limit windows. Callers serving
/// several agents concurrently must serialize access per instance.
#[derive(Debug)]
pub struct ActionInterceptor {
    calculator: CoverageCalculator,
    thresholds: ConfidenceThresholds,
    audit: AuditLog,
    rate_limits: RateLimiter,
    patterns: PatternCache,
}

impl ActionInterceptor {
    pub fn new() -> Self {
        Self::with_calculator(CoverageCalculator::standard())
    }

    pub fn with_calculator(calculator: CoverageCalculator) -> Self {
        Self {
            calculator,
            thresholds: ConfidenceThresholds::default(),
            audit: AuditLog::new(),
            rate_limits: RateLimiter::new(),
            patterns: PatternCache::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Result<Self, InterceptorError> {
        self.set_thresholds(thresholds)?;
        Ok(self)
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: ConfidenceThresholds) -> Result<(), InterceptorError> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }

    pub fn calculator(&self) -> &CoverageCalculator {
        &self.calculator
    }

    /// Run the gate pipeline at the current wall-clock time.
    pub fn intercept(
        &mut self,
        frame: &Frame,
        tool: &str,
        args: &Value,
        agent_id: &str,
    ) -> InterceptorDecision {
        self.intercept_at(frame, tool, args, agent_id, Utc::now())
    }

    /// Run the gate pipeline with an explicit clock.
    ///
    /// The first failing gate decides. Every outcome is audited.
    pub fn intercept_at(
        &mut self,
        frame: &Frame,
        tool: &str,
        args: &Value,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> InterceptorDecision {
        debug!(agent_id = %agent_id, tool = %tool, frame = %frame.raw, "Intercepting tool call");

        let mut coverage_confidence = None;
        let outcome = self.run_gates(frame, tool, args, agent_id, now, &mut coverage_confidence);

        let audit_id = new_audit_id();
        let (allowed, event_type, reason, details) = match outcome {
            Ok(()) => (
                true,
                AuditEventType::Allowed,
                format!("tool '{tool}' permitted by frame"),
                json!({ "tool": tool }),
            ),
            Err(denial) => (false, denial.event_type, denial.reason, denial.details),
        };

        if allowed {
            info!(audit_id = %audit_id, agent_id = %agent_id, tool = %tool, "Tool call allowed");
        } else if event_type == AuditEventType::DecoyTriggered {
            warn!(
                audit_id = %audit_id,
                agent_id = %agent_id,
                tool = %tool,
                mode = "decoy",
                "Decoy constraint triggered"
            );
        } else {
            warn!(
                audit_id = %audit_id,
                agent_id = %agent_id,
                tool = %tool,
                event = ?event_type,
                reason = %reason,
                "Tool call denied"
            );
        }

        let mut details = details;
        if let Value::Object(map) = &mut details {
            map.insert("reason".into(), Value::String(reason.clone()));
        }

        self.audit.append(AuditLogEntry {
            audit_id: audit_id.clone(),
            timestamp: now,
            agent_id: agent_id.to_string(),
            event_type,
            frame: frame.raw.clone(),
            decision: if allowed {
                AuditDecision::Allowed
            } else {
                AuditDecision::Blocked
            },
            details,
            coverage_confidence,
        });

        InterceptorDecision {
            allowed,
            reason,
            frame: frame.raw.clone(),
            action: tool.to_string(),
            coverage_confidence,
            timestamp: now,
            audit_id,
            event_type,
        }
    }

    fn run_gates(
        &mut self,
        frame: &Frame,
        tool: &str,
        args: &Value,
        agent_id: &str,
        now: DateTime<Utc>,
        coverage_confidence: &mut Option<f64>,
    ) -> Result<(), Denial> {
        // 1. Parse confidence
        if frame.parse_confidence < self.thresholds.pre_execute {
            return Err(Denial {
                event_type: AuditEventType::LowParseConfidence,
                reason: format!(
                    "frame parse confidence {:.2} below threshold {:.2}",
                    frame.parse_confidence, self.thresholds.pre_execute
                ),
                details: json!({
                    "tool": tool,
                    "parse_confidence": frame.parse_confidence,
                    "threshold": self.thresholds.pre_execute,
                }),
            });
        }

        // 2. Tool binding
        match match_tool_with(&frame.bindings, tool, &mut self.patterns) {
            BindingMatch::Allowed { pattern } => {
                debug!(tool = %tool, pattern = %pattern, "Tool bound by allow pattern");
            }
            BindingMatch::Blocked { pattern } => {
                return Err(Denial {
                    event_type: AuditEventType::ToolNotBound,
                    reason: format!("tool '{tool}' matches blocked pattern '{pattern}'"),
                    details: json!({ "tool": tool, "blocked_pattern": pattern }),
                });
            }
            BindingMatch::Unbound => {
                return Err(Denial {
                    event_type: AuditEventType::ToolNotBound,
                    reason: format!("tool '{tool}' is not bound by the frame (default deny)"),
                    details: json!({ "tool": tool, "allowed": frame.bindings.allowed }),
                });
            }
        }

        // 3. Coverage
        let coverage = self.calculator.calculate(frame, tool, args);
        *coverage_confidence = Some(coverage.confidence);
        if coverage.confidence < self.thresholds.coverage_minimum {
            return Err(Denial {
                event_type: AuditEventType::InsufficientCoverage,
                reason: format!(
                    "coverage {:.2} below minimum {:.2}: {}",
                    coverage.confidence, self.thresholds.coverage_minimum, coverage.details
                ),
                details: json!({
                    "tool": tool,
                    "coverage": coverage.confidence,
                    "uncovered_aspects": coverage.uncovered_aspects,
                }),
            });
        }

        // 4. Rate limit
        if let Some(spec) = &frame.rate_limit {
            if let RateLimitOutcome::Exceeded {
                limit,
                remaining_seconds,
            } = self.rate_limits.check_and_record(agent_id, spec, now)
            {
                return Err(Denial {
                    event_type: AuditEventType::RateLimited,
                    reason: format!(
                        "rate limit {} exceeded ({limit} calls); retry in {remaining_seconds}s",
                        spec.raw
                    ),
                    details: json!({
                        "tool": tool,
                        "rate_limit": spec.raw,
                        "remaining_seconds": remaining_seconds,
                    }),
                });
            }
        }

        // 5. Forbidden constraint
        if let Some(constraint) = frame.effective_constraint() {
            if constraint.name() == "forbidden" {
                if constraint.has_extension("decoy") {
                    return Err(Denial {
                        event_type: AuditEventType::DecoyTriggered,
                        reason: "action forbidden by frame constraint".to_string(),
                        details: json!({ "tool": tool, "mode": "decoy" }),
                    });
                }
                return Err(Denial {
                    event_type: AuditEventType::Forbidden,
                    reason: "action forbidden by frame constraint".to_string(),
                    details: json!({ "tool": tool }),
                });
            }
        }

        Ok(())
    }

    /// Check the confidence observed after a tool ran.
    ///
    /// Flags the call when observed confidence falls below `post_audit` or
    /// drifts from the coverage recorded under `audit_id` by more than
    /// `drift_threshold`. Always appends a `post_audit` entry.
    pub fn post_execution_audit(
        &mut self,
        audit_id: &str,
        agent_id: &str,
        observed_confidence: f64,
    ) -> Result<PostAuditReport, InterceptorError> {
        self.post_execution_audit_at(audit_id, agent_id, observed_confidence, Utc::now())
    }

    pub fn post_execution_audit_at(
        &mut self,
        audit_id: &str,
        agent_id: &str,
        observed_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<PostAuditReport, InterceptorError> {
        if !(0.0..=1.0).contains(&observed_confidence) {
            return Err(InterceptorError::ObservedConfidenceOutOfRange(
                observed_confidence,
            ));
        }

        let original = self.audit.find(audit_id);
        let frame = original.map(|e| e.frame.clone()).unwrap_or_default();
        let predicted = original.and_then(|e| e.coverage_confidence);
        let drift = predicted.map(|p| (p - observed_confidence).abs());

        let below_threshold = observed_confidence < self.thresholds.post_audit;
        let drift_exceeded = drift.is_some_and(|d| d > self.thresholds.drift_threshold);
        let flagged = below_threshold || drift_exceeded;

        let post_audit_id = new_audit_id();
        if flagged {
            warn!(
                audit_id = %audit_id,
                agent_id = %agent_id,
                observed = observed_confidence,
                below_threshold,
                drift_exceeded,
                "Post-execution audit flagged"
            );
        } else {
            debug!(audit_id = %audit_id, agent_id = %agent_id, "Post-execution audit passed");
        }

        self.audit.append(AuditLogEntry {
            audit_id: post_audit_id.clone(),
            timestamp: now,
            agent_id: agent_id.to_string(),
            event_type: AuditEventType::PostAudit,
            frame,
            decision: if flagged {
                AuditDecision::Blocked
            } else {
                AuditDecision::Allowed
            },
            details: json!({
                "original_audit_id": audit_id,
                "observed_confidence": observed_confidence,
                "drift": drift,
                "below_threshold": below_threshold,
                "drift_exceeded": drift_exceeded,
            }),
            coverage_confidence: predicted,
        });

        Ok(PostAuditReport {
            audit_id: audit_id.to_string(),
            post_audit_id,
            observed_confidence,
            predicted_confidence: predicted,
            drift,
            below_threshold,
            drift_exceeded,
        })
    }

    pub fn audit_log(&self) -> Vec<&AuditLogEntry> {
        self.audit.entries()
    }

    pub fn audit_log_for_agent(&self, agent_id: &str) -> Vec<&AuditLogEntry> {
        self.audit.for_agent(agent_id)
    }

    pub fn recent(&self, n: usize) -> Vec<&AuditLogEntry> {
        self.audit.recent(n)
    }

    pub fn clear_audit_log(&mut self) {
        self.audit.clear();
    }

    pub fn reset_rate_limits(&mut self) {
        self.rate_limits.reset();
    }
}

impl Default for ActionInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

fn new_audit_id() -> String {
    format!("aud-{}", Uuid::new_v4())
}
