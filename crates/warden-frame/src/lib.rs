//! # warden-frame
//!
//! The frame language: a compact symbolic directive an agent attaches to a
//! proposed tool call to declare its intent.
//!
//! A frame is an ordered sequence of glyphs drawn from seven categories
//! (mode, modifier, domain, source, constraint, action, entity), optionally
//! followed by binding clauses that name the tools the frame authorizes and
//! an optional rate limit:
//!
//! ```text
//! ◆Ⓓ[internal]◉⊞ | allow=read_file,search_*; block=delete_*; rate=10/min
//! ```
//!
//! ## Components
//!
//! - **SymbolTable**: closed glyph → (category, definition) table, overridable
//!   from configuration
//! - **FrameParser**: deterministic resolver from raw text to [`Frame`];
//!   unknown glyphs and duplicated single-valued categories lower
//!   `parse_confidence` instead of failing the parse
//! - **FrameValidator**: structural, semantic and (for delegation) chain
//!   phases merged into one [`ValidationReport`]

#![deny(unsafe_code)]

pub mod error;
pub mod frame;
pub mod parser;
pub mod symbol;
pub mod validator;

pub use error::FrameError;
pub use frame::{Frame, RateLimitSpec, RateUnit, ToolBindings};
pub use parser::{parse, FrameParser, DUPLICATE_CATEGORY_PENALTY, UNKNOWN_GLYPH_PENALTY};
pub use symbol::{
    Symbol, SymbolCategory, SymbolDefinition, SymbolEntry, SymbolTable, EXECUTE_CLASS_ACTIONS,
};
pub use validator::{
    validate, FrameValidator, IssueCode, PhaseResult, ValidationIssue, ValidationLevel,
    ValidationMetadata, ValidationOptions, ValidationReport, MAX_FRAME_LENGTH, MIN_FRAME_LENGTH,
};
