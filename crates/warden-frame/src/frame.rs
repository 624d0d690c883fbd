use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::symbol::{Symbol, SymbolCategory};

/// Time unit of a rate limit window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Second,
    Minute,
    Hour,
}

impl RateUnit {
    pub fn seconds(&self) -> i64 {
        match self {
            RateUnit::Second => 1,
            RateUnit::Minute => 60,
            RateUnit::Hour => 3_600,
        }
    }
}

/// `<count>/<unit>` rate limit declared by a frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitSpec {
    pub count: u32,
    pub unit: RateUnit,
    /// Text as written; used as part of the rate-limit window key.
    pub raw: String,
}

impl RateLimitSpec {
    /// Parse `<positive integer>/<unit>`. Units other than `sec`, `min` and
    /// `hour` fall back to a one-minute window.
    pub fn parse(spec: &str) -> Result<Self, FrameError> {
        let spec = spec.trim();
        let (count, unit) = spec
            .split_once('/')
            .ok_or_else(|| FrameError::InvalidRateLimit {
                spec: spec.to_string(),
                reason: "expected <count>/<unit>".into(),
            })?;

        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| FrameError::InvalidRateLimit {
                spec: spec.to_string(),
                reason: format!("'{}' is not a positive integer", count.trim()),
            })?;
        if count == 0 {
            return Err(FrameError::InvalidRateLimit {
                spec: spec.to_string(),
                reason: "count must be positive".into(),
            });
        }

        let unit = match unit.trim() {
            "sec" => RateUnit::Second,
            "min" => RateUnit::Minute,
            "hour" => RateUnit::Hour,
            _ => RateUnit::Minute,
        };

        Ok(Self {
            count,
            unit,
            raw: spec.to_string(),
        })
    }

    pub fn window_seconds(&self) -> i64 {
        self.unit.seconds()
    }
}

/// Tool patterns a frame authorizes or refuses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBindings {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// A parsed governance directive.
///
/// `symbols` keeps every resolved glyph in written order, including
/// duplicates of single-valued categories; the derived fields hold the first
/// occurrence only. Read-only after parsing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub raw: String,
    pub symbols: Vec<Symbol>,
    pub mode: Option<Symbol>,
    pub modifiers: Vec<Symbol>,
    pub domain: Option<Symbol>,
    pub source: Option<Symbol>,
    pub constraints: Vec<Symbol>,
    pub action: Option<Symbol>,
    pub entity: Option<Symbol>,
    pub bindings: ToolBindings,
    pub rate_limit: Option<RateLimitSpec>,
    pub parse_confidence: f64,
    /// Glyphs the symbol table did not recognize.
    pub unknown_glyphs: Vec<char>,
}

impl Frame {
    /// Assemble a frame from resolved symbols, deriving the per-category
    /// fields. For single-valued categories the first symbol wins.
    pub fn from_symbols(
        raw: impl Into<String>,
        symbols: Vec<Symbol>,
        bindings: ToolBindings,
        rate_limit: Option<RateLimitSpec>,
        parse_confidence: f64,
    ) -> Self {
        let mut frame = Self {
            raw: raw.into(),
            symbols: Vec::new(),
            mode: None,
            modifiers: Vec::new(),
            domain: None,
            source: None,
            constraints: Vec::new(),
            action: None,
            entity: None,
            bindings,
            rate_limit,
            parse_confidence: parse_confidence.clamp(0.0, 1.0),
            unknown_glyphs: Vec::new(),
        };

        for symbol in &symbols {
            let slot = match symbol.category {
                SymbolCategory::Modifier => {
                    frame.modifiers.push(symbol.clone());
                    continue;
                }
                SymbolCategory::Constraint => {
                    frame.constraints.push(symbol.clone());
                    continue;
                }
                SymbolCategory::Mode => &mut frame.mode,
                SymbolCategory::Domain => &mut frame.domain,
                SymbolCategory::Source => &mut frame.source,
                SymbolCategory::Action => &mut frame.action,
                SymbolCategory::Entity => &mut frame.entity,
            };
            if slot.is_none() {
                *slot = Some(symbol.clone());
            }
        }

        frame.symbols = symbols;
        frame
    }

    /// Number of resolved symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn effective_mode(&self) -> Option<&str> {
        self.mode.as_ref().map(Symbol::name)
    }

    pub fn mode_strength(&self) -> Option<u8> {
        self.mode.as_ref().map(Symbol::strength)
    }

    pub fn effective_domain(&self) -> Option<&str> {
        self.domain.as_ref().map(Symbol::name)
    }

    pub fn effective_action(&self) -> Option<&str> {
        self.action.as_ref().map(Symbol::name)
    }

    /// The strongest constraint on the frame.
    pub fn effective_constraint(&self) -> Option<&Symbol> {
        self.constraints.iter().max_by_key(|c| c.strength())
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraints.iter().any(|c| c.name() == name)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.name() == name)
    }

    /// True when the frame's domain carries the `internal` scope extension.
    pub fn is_internal_only(&self) -> bool {
        self.domain
            .as_ref()
            .is_some_and(|d| d.has_extension("internal"))
    }

    /// Canonical rendering of the resolved content, independent of spacing
    /// and unknown glyphs in the raw text.
    pub fn canonical(&self) -> String {
        let mut out: String = self.symbols.iter().map(Symbol::canonical).collect();
        let mut clauses = Vec::new();
        if !self.bindings.allowed.is_empty() {
            clauses.push(format!("allow={}", self.bindings.allowed.join(",")));
        }
        if !self.bindings.blocked.is_empty() {
            clauses.push(format!("block={}", self.bindings.blocked.join(",")));
        }
        if let Some(rate) = &self.rate_limit {
            clauses.push(format!("rate={}", rate.raw));
        }
        if !clauses.is_empty() {
            out.push('|');
            out.push_str(&clauses.join(";"));
        }
        out
    }

    /// BLAKE3 digest of the canonical rendering, hex encoded.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.canonical().as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolDefinition;

    fn symbol(glyph: char, category: SymbolCategory, name: &str, strength: Option<u8>) -> Symbol {
        Symbol {
            glyph,
            category,
            definition: SymbolDefinition {
                name: name.into(),
                strength,
            },
            extensions: vec![],
        }
    }

    #[test]
    fn rate_limit_parses_known_units() {
        let spec = RateLimitSpec::parse("10/sec").unwrap();
        assert_eq!(spec.count, 10);
        assert_eq!(spec.window_seconds(), 1);

        let spec = RateLimitSpec::parse("3/hour").unwrap();
        assert_eq!(spec.window_seconds(), 3_600);
    }

    #[test]
    fn rate_limit_unknown_unit_defaults_to_minute() {
        let spec = RateLimitSpec::parse("5/fortnight").unwrap();
        assert_eq!(spec.unit, RateUnit::Minute);
        assert_eq!(spec.window_seconds(), 60);
    }

    #[test]
    fn rate_limit_rejects_zero_and_garbage() {
        assert!(RateLimitSpec::parse("0/min").is_err());
        assert!(RateLimitSpec::parse("-3/min").is_err());
        assert!(RateLimitSpec::parse("ten/min").is_err());
        assert!(RateLimitSpec::parse("10").is_err());
    }

    #[test]
    fn first_single_valued_symbol_wins() {
        let frame = Frame::from_symbols(
            "test",
            vec![
                symbol('◆', SymbolCategory::Mode, "strict", Some(3)),
                symbol('◇', SymbolCategory::Mode, "flexible", Some(1)),
                symbol('Ⓓ', SymbolCategory::Domain, "data", None),
            ],
            ToolBindings::default(),
            None,
            1.0,
        );
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.effective_mode(), Some("strict"));
        assert_eq!(frame.effective_domain(), Some("data"));
    }

    #[test]
    fn effective_constraint_is_strongest() {
        let frame = Frame::from_symbols(
            "test",
            vec![
                symbol('✓', SymbolCategory::Constraint, "approved", Some(0)),
                symbol('⊗', SymbolCategory::Constraint, "forbidden", Some(3)),
                symbol('⊡', SymbolCategory::Constraint, "audited", Some(1)),
            ],
            ToolBindings::default(),
            None,
            1.0,
        );
        assert_eq!(frame.effective_constraint().unwrap().name(), "forbidden");
        assert!(frame.has_constraint("approved"));
    }

    #[test]
    fn confidence_is_clamped() {
        let frame = Frame::from_symbols("x", vec![], ToolBindings::default(), None, -0.4);
        assert_eq!(frame.parse_confidence, 0.0);
    }
}
