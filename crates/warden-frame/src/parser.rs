use std::sync::LazyLock;

use tracing::debug;

use crate::error::FrameError;
use crate::frame::{Frame, RateLimitSpec, ToolBindings};
use crate::symbol::{Symbol, SymbolCategory, SymbolTable};

/// Confidence lost for each glyph the symbol table does not know.
pub const UNKNOWN_GLYPH_PENALTY: f64 = 0.15;

/// Confidence lost for each repeat of a single-valued category.
pub const DUPLICATE_CATEGORY_PENALTY: f64 = 0.20;

const VARIATION_SELECTOR: char = '\u{FE0F}';

static STANDARD_PARSER: LazyLock<FrameParser> =
    LazyLock::new(|| FrameParser::new(SymbolTable::standard()));

/// Parse frame text against the standard symbol table.
pub fn parse(raw: &str) -> Result<Frame, FrameError> {
    STANDARD_PARSER.parse(raw)
}

/// Deterministic resolver from raw frame text to a [`Frame`].
#[derive(Clone, Debug)]
pub struct FrameParser {
    table: SymbolTable,
}

#[derive(Debug)]
struct Token {
    glyph: char,
    extensions: Vec<String>,
}

impl FrameParser {
    pub fn new(table: SymbolTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Resolve `raw` into a frame.
    ///
    /// Unknown glyphs and repeated single-valued categories do not fail the
    /// parse; each lowers `parse_confidence`. Identical input always yields
    /// an identical frame.
    pub fn parse(&self, raw: &str) -> Result<Frame, FrameError> {
        if raw.trim().is_empty() {
            return Err(FrameError::Empty);
        }

        let (glyph_section, clause_section) = match raw.split_once('|') {
            Some((glyphs, clauses)) => (glyphs, Some(clauses)),
            None => (raw, None),
        };

        let tokens = tokenize(glyph_section)?;
        let (bindings, rate_limit) = match clause_section {
            Some(clauses) => parse_clauses(clauses)?,
            None => (ToolBindings::default(), None),
        };

        let mut symbols = Vec::with_capacity(tokens.len());
        let mut unknown = Vec::new();
        let mut seen: Vec<SymbolCategory> = Vec::new();
        let mut duplicates = 0usize;

        for token in tokens {
            let Some(entry) = self.table.resolve(token.glyph) else {
                unknown.push(token.glyph);
                continue;
            };

            if entry.category.is_single_valued() {
                if seen.contains(&entry.category) {
                    duplicates += 1;
                } else {
                    seen.push(entry.category);
                }
            }

            symbols.push(Symbol {
                glyph: entry.glyph,
                category: entry.category,
                definition: entry.definition(),
                extensions: token.extensions,
            });
        }

        let confidence = 1.0
            - UNKNOWN_GLYPH_PENALTY * unknown.len() as f64
            - DUPLICATE_CATEGORY_PENALTY * duplicates as f64;

        if !unknown.is_empty() || duplicates > 0 {
            debug!(
                unknown = unknown.len(),
                duplicates,
                confidence,
                "Frame parsed with ambiguity"
            );
        }

        let mut frame = Frame::from_symbols(raw, symbols, bindings, rate_limit, confidence);
        frame.unknown_glyphs = unknown;
        Ok(frame)
    }
}

fn tokenize(section: &str) -> Result<Vec<Token>, FrameError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = section.chars().enumerate().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch.is_whitespace() || ch == VARIATION_SELECTOR {
            continue;
        }

        if ch == '[' {
            let mut body = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == ']' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed {
                return Err(FrameError::UnclosedExtension(pos));
            }
            let last = tokens
                .last_mut()
                .ok_or(FrameError::DanglingExtension(pos))?;
            last.extensions.extend(
                body.split(',')
                    .map(|e| e.trim().to_ascii_lowercase())
                    .filter(|e| !e.is_empty()),
            );
            continue;
        }

        tokens.push(Token {
            glyph: ch,
            extensions: Vec::new(),
        });
    }

    Ok(tokens)
}

fn parse_clauses(section: &str) -> Result<(ToolBindings, Option<RateLimitSpec>), FrameError> {
    let mut bindings = ToolBindings::default();
    let mut rate_limit = None;

    for clause in section.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        let (key, value) = clause
            .split_once('=')
            .ok_or_else(|| FrameError::MalformedClause(clause.to_string()))?;

        let patterns = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "allow" => bindings.allowed.extend(patterns()),
            "block" => bindings.blocked.extend(patterns()),
            "rate" => rate_limit = Some(RateLimitSpec::parse(value)?),
            other => return Err(FrameError::UnknownClause(other.to_string())),
        }
    }

    Ok((bindings, rate_limit))
}
