use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::Frame;
use crate::symbol::{Symbol, SymbolCategory};

/// Fewer symbols than this cannot express an intent.
pub const MIN_FRAME_LENGTH: usize = 2;

/// More symbols than this cannot be read as one directive.
pub const MAX_FRAME_LENGTH: usize = 12;

/// Machine-readable validation codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    LengthTooShort,
    LengthTooLong,
    SequenceModeNotFirst,
    ModeConflictStrictFlexible,
    PriorityConflict,
    ModeConflictExploreExecute,
    ActionMissingDomain,
    ModeStrengthWeakened,
    ForbiddenNotInherited,
    DomainChanged,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::LengthTooShort => "LENGTH_TOO_SHORT",
            IssueCode::LengthTooLong => "LENGTH_TOO_LONG",
            IssueCode::SequenceModeNotFirst => "SEQUENCE_MODE_NOT_FIRST",
            IssueCode::ModeConflictStrictFlexible => "MODE_CONFLICT_STRICT_FLEXIBLE",
            IssueCode::PriorityConflict => "PRIORITY_CONFLICT",
            IssueCode::ModeConflictExploreExecute => "MODE_CONFLICT_EXPLORE_EXECUTE",
            IssueCode::ActionMissingDomain => "ACTION_MISSING_DOMAIN",
            IssueCode::ModeStrengthWeakened => "MODE_STRENGTH_WEAKENED",
            IssueCode::ForbiddenNotInherited => "FORBIDDEN_NOT_INHERITED",
            IssueCode::DomainChanged => "DOMAIN_CHANGED",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error or warning with the symbols that triggered it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    /// Glyphs involved, in canonical form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl ValidationIssue {
    fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            symbol: None,
        }
    }

    fn with_symbols<'a>(mut self, symbols: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let context: String = symbols.into_iter().map(Symbol::canonical).collect();
        if !context.is_empty() {
            self.symbol = Some(context);
        }
        self
    }
}

/// Errors and warnings from a single phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl PhaseResult {
    fn merge(&mut self, other: PhaseResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Which phases ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationLevel {
    #[serde(rename = "structural+semantic")]
    StructuralSemantic,
    #[serde(rename = "full")]
    Full,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::StructuralSemantic => "structural+semantic",
            ValidationLevel::Full => "full",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMetadata {
    pub validated_at: DateTime<Utc>,
    pub validation_level: ValidationLevel,
}

/// Merged outcome of all phases. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub metadata: ValidationMetadata,
}

impl ValidationReport {
    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Treat any warning as a failure.
    #[serde(default)]
    pub strict: bool,
}

/// Validate with default options.
pub fn validate(frame: &Frame, parent: Option<&Frame>) -> ValidationReport {
    FrameValidator::default().validate(frame, parent)
}

/// Structural, semantic and chain validation of frames.
#[derive(Clone, Debug, Default)]
pub struct FrameValidator {
    options: ValidationOptions,
}

impl FrameValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn strict() -> Self {
        Self::new(ValidationOptions { strict: true })
    }

    /// Run every applicable phase. The chain phase runs only when a parent
    /// frame is supplied.
    pub fn validate(&self, frame: &Frame, parent: Option<&Frame>) -> ValidationReport {
        let mut result = self.validate_structure(frame);
        result.merge(self.validate_semantics(frame));

        let level = match parent {
            Some(parent) => {
                result.merge(self.validate_chain(frame, parent));
                ValidationLevel::Full
            }
            None => ValidationLevel::StructuralSemantic,
        };

        let valid = result.errors.is_empty() && !(self.options.strict && !result.warnings.is_empty());

        debug!(
            frame = %frame.raw,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            level = level.as_str(),
            valid,
            "Frame validated"
        );

        ValidationReport {
            valid,
            errors: result.errors,
            warnings: result.warnings,
            metadata: ValidationMetadata {
                validated_at: Utc::now(),
                validation_level: level,
            },
        }
    }

    /// Length bounds and symbol ordering.
    pub fn validate_structure(&self, frame: &Frame) -> PhaseResult {
        let mut result = PhaseResult::default();
        let len = frame.len();

        if len < MIN_FRAME_LENGTH {
            result.errors.push(ValidationIssue::new(
                IssueCode::LengthTooShort,
                format!(
                    "frame has {len} symbols, at least {MIN_FRAME_LENGTH} required to express intent"
                ),
            ));
        } else if len > MAX_FRAME_LENGTH {
            result.errors.push(ValidationIssue::new(
                IssueCode::LengthTooLong,
                format!("frame has {len} symbols, at most {MAX_FRAME_LENGTH} allowed"),
            ));
        }

        if let Some(position) = frame
            .symbols
            .iter()
            .position(|s| s.category == SymbolCategory::Mode)
        {
            if position > 0 {
                result.warnings.push(
                    ValidationIssue::new(
                        IssueCode::SequenceModeNotFirst,
                        format!("mode symbol appears at position {}, expected first", position + 1),
                    )
                    .with_symbols([&frame.symbols[position]]),
                );
            }
        }

        result
    }

    /// Logically incompatible combinations anywhere in the frame.
    pub fn validate_semantics(&self, frame: &Frame) -> PhaseResult {
        let mut result = PhaseResult::default();

        let find = |category: SymbolCategory, name: &str| {
            frame
                .symbols
                .iter()
                .find(|s| s.category == category && s.name() == name)
        };

        if let (Some(strict), Some(flexible)) = (
            find(SymbolCategory::Mode, "strict"),
            find(SymbolCategory::Mode, "flexible"),
        ) {
            result.errors.push(
                ValidationIssue::new(
                    IssueCode::ModeConflictStrictFlexible,
                    "strict and flexible modes cannot be combined",
                )
                .with_symbols([strict, flexible]),
            );
        }

        if let (Some(high), Some(low)) = (
            find(SymbolCategory::Modifier, "high_priority"),
            find(SymbolCategory::Modifier, "low_priority"),
        ) {
            result.errors.push(
                ValidationIssue::new(
                    IssueCode::PriorityConflict,
                    "high and low priority modifiers cannot be combined",
                )
                .with_symbols([high, low]),
            );
        }

        if let Some(explore) = find(SymbolCategory::Mode, "exploratory") {
            if let Some(action) = frame.symbols.iter().find(|s| s.is_execute_class()) {
                result.errors.push(
                    ValidationIssue::new(
                        IssueCode::ModeConflictExploreExecute,
                        format!(
                            "exploratory mode cannot authorize execute-class action '{}'",
                            action.name()
                        ),
                    )
                    .with_symbols([explore, action]),
                );
            }
        }

        if let (Some(action), None) = (&frame.action, &frame.domain) {
            result.warnings.push(
                ValidationIssue::new(
                    IssueCode::ActionMissingDomain,
                    format!("action '{}' declared without a domain", action.name()),
                )
                .with_symbols([action]),
            );
        }

        result
    }

    /// Delegation rules between a parent frame and the child it spawned.
    ///
    /// A child may narrow scope but never weaken strictness or drop a
    /// forbidden constraint.
    pub fn validate_chain(&self, child: &Frame, parent: &Frame) -> PhaseResult {
        let mut result = PhaseResult::default();

        if let Some(parent_strength) = parent.mode_strength() {
            let weakened = match child.mode_strength() {
                Some(child_strength) => child_strength < parent_strength,
                None => true,
            };
            if weakened {
                let child_mode = child.effective_mode().unwrap_or("none");
                let parent_mode = parent.effective_mode().unwrap_or("none");
                result.errors.push(
                    ValidationIssue::new(
                        IssueCode::ModeStrengthWeakened,
                        format!(
                            "child mode '{child_mode}' is weaker than parent mode '{parent_mode}'"
                        ),
                    )
                    .with_symbols(child.mode.iter()),
                );
            }
        }

        if parent.has_constraint("forbidden") && !child.has_constraint("forbidden") {
            result.errors.push(
                ValidationIssue::new(
                    IssueCode::ForbiddenNotInherited,
                    "parent carries a forbidden constraint the child does not inherit",
                )
                .with_symbols(parent.constraints.iter().filter(|c| c.name() == "forbidden")),
            );
        }

        if let (Some(child_domain), Some(parent_domain)) = (&child.domain, &parent.domain) {
            if child_domain.name() != parent_domain.name() {
                result.warnings.push(
                    ValidationIssue::new(
                        IssueCode::DomainChanged,
                        format!(
                            "domain changed from '{}' to '{}' across delegation",
                            parent_domain.name(),
                            child_domain.name()
                        ),
                    )
                    .with_symbols([parent_domain, child_domain]),
                );
            }
        }

        result
    }
}
