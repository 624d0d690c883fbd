use thiserror::Error;

/// Errors raised while turning raw frame text into a [`crate::Frame`].
///
/// Ambiguity (unknown glyphs, duplicated categories) is not an error; it is
/// reported through `parse_confidence`. These variants cover text that has no
/// meaningful reading at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame text is empty")]
    Empty,

    #[error("unclosed extension bracket starting at character {0}")]
    UnclosedExtension(usize),

    #[error("extension at character {0} has no preceding glyph")]
    DanglingExtension(usize),

    #[error("unknown binding clause: {0}")]
    UnknownClause(String),

    #[error("malformed binding clause: {0}")]
    MalformedClause(String),

    #[error("invalid rate limit '{spec}': {reason}")]
    InvalidRateLimit { spec: String, reason: String },

    #[error("invalid symbol table: {0}")]
    InvalidSymbolTable(String),
}
