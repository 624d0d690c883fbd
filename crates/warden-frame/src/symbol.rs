use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Action names that cause side effects outside the agent.
pub const EXECUTE_CLASS_ACTIONS: &[&str] = &["write", "execute", "delete", "send", "transfer"];

/// The seven glyph categories of the frame language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    Mode,
    Modifier,
    Domain,
    Source,
    Constraint,
    Action,
    Entity,
}

impl SymbolCategory {
    /// Categories that may appear at most once in a resolved frame.
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            SymbolCategory::Mode
                | SymbolCategory::Domain
                | SymbolCategory::Source
                | SymbolCategory::Action
                | SymbolCategory::Entity
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolCategory::Mode => "mode",
            SymbolCategory::Modifier => "modifier",
            SymbolCategory::Domain => "domain",
            SymbolCategory::Source => "source",
            SymbolCategory::Constraint => "constraint",
            SymbolCategory::Action => "action",
            SymbolCategory::Entity => "entity",
        }
    }
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meaning of a glyph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    pub name: String,
    /// Strength rank; used by modes and constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,
}

/// A resolved glyph inside a frame. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub glyph: char,
    pub category: SymbolCategory,
    pub definition: SymbolDefinition,
    /// Bracketed extensions following the glyph, e.g. `[internal]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Strength rank, 0 when the definition carries none.
    pub fn strength(&self) -> u8 {
        self.definition.strength.unwrap_or(0)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    pub fn is_execute_class(&self) -> bool {
        self.category == SymbolCategory::Action && EXECUTE_CLASS_ACTIONS.contains(&self.name())
    }

    /// Canonical text form: glyph plus extensions in written order.
    pub fn canonical(&self) -> String {
        if self.extensions.is_empty() {
            self.glyph.to_string()
        } else {
            format!("{}[{}]", self.glyph, self.extensions.join(","))
        }
    }
}

/// One row of the symbol table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub glyph: char,
    pub category: SymbolCategory,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,
}

impl SymbolEntry {
    pub fn definition(&self) -> SymbolDefinition {
        SymbolDefinition {
            name: self.name.clone(),
            strength: self.strength,
        }
    }
}

/// Closed glyph table used by the parser.
///
/// Serialized as a list of entries so it can be supplied from YAML or JSON
/// configuration and merged over the standard table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SymbolEntry>", into = "Vec<SymbolEntry>")]
pub struct SymbolTable {
    entries: BTreeMap<char, SymbolEntry>,
}

impl From<Vec<SymbolEntry>> for SymbolTable {
    fn from(entries: Vec<SymbolEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.glyph, e)).collect(),
        }
    }
}

impl From<SymbolTable> for Vec<SymbolEntry> {
    fn from(table: SymbolTable) -> Self {
        table.entries.into_values().collect()
    }
}

impl SymbolTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard vocabulary.
    pub fn standard() -> Self {
        use SymbolCategory::*;

        let rows: &[(char, SymbolCategory, &str, Option<u8>)] = &[
            ('◆', Mode, "strict", Some(3)),
            ('◈', Mode, "standard", Some(2)),
            ('◇', Mode, "flexible", Some(1)),
            ('◎', Mode, "exploratory", Some(0)),
            ('▲', Modifier, "high_priority", None),
            ('▼', Modifier, "low_priority", None),
            ('⟳', Modifier, "recurring", None),
            ('⧗', Modifier, "deferred", None),
            ('Ⓕ', Domain, "finance", None),
            ('Ⓒ', Domain, "code", None),
            ('Ⓓ', Domain, "data", None),
            ('Ⓝ', Domain, "network", None),
            ('Ⓜ', Domain, "messaging", None),
            ('Ⓢ', Domain, "system", None),
            ('Ⓡ', Domain, "research", None),
            ('⊳', Source, "user", None),
            ('⊲', Source, "agent", None),
            ('⊶', Source, "external", None),
            ('⊗', Constraint, "forbidden", Some(3)),
            ('⊙', Constraint, "read_only", Some(2)),
            ('⊡', Constraint, "audited", Some(1)),
            ('✓', Constraint, "approved", Some(0)),
            ('◉', Action, "read", None),
            ('⌕', Action, "search", None),
            ('∑', Action, "analyze", None),
            ('✎', Action, "write", None),
            ('⇒', Action, "execute", None),
            ('✂', Action, "delete", None),
            ('✉', Action, "send", None),
            ('⇄', Action, "transfer", None),
            ('⊞', Entity, "file", None),
            ('⛁', Entity, "database", None),
            ('⊠', Entity, "account", None),
            ('☺', Entity, "person", None),
            ('⌘', Entity, "service", None),
        ];

        let mut table = Self::empty();
        for (glyph, category, name, strength) in rows {
            table.insert(SymbolEntry {
                glyph: *glyph,
                category: *category,
                name: (*name).to_string(),
                strength: *strength,
            });
        }
        table
    }

    /// Insert or replace a glyph. Returns the previous entry, if any.
    pub fn insert(&mut self, entry: SymbolEntry) -> Option<SymbolEntry> {
        self.entries.insert(entry.glyph, entry)
    }

    /// Overlay `other` on top of this table; entries in `other` win.
    pub fn merge(&mut self, other: &SymbolTable) {
        for entry in other.entries.values() {
            self.insert(entry.clone());
        }
    }

    pub fn resolve(&self, glyph: char) -> Option<&SymbolEntry> {
        self.entries.get(&glyph)
    }

    /// Reverse lookup, used to render frames from names.
    pub fn glyph_for(&self, category: SymbolCategory, name: &str) -> Option<char> {
        self.entries
            .values()
            .find(|e| e.category == category && e.name == name)
            .map(|e| e.glyph)
    }

    /// Reject tables the parser cannot use unambiguously.
    pub fn validate(&self) -> Result<(), FrameError> {
        for entry in self.entries.values() {
            if entry.glyph.is_whitespace() || matches!(entry.glyph, '[' | ']' | '|' | ',') {
                return Err(FrameError::InvalidSymbolTable(format!(
                    "glyph {:?} is reserved by the frame grammar",
                    entry.glyph
                )));
            }
            if entry.name.trim().is_empty() {
                return Err(FrameError::InvalidSymbolTable(format!(
                    "glyph {:?} has an empty name",
                    entry.glyph
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_all_categories() {
        let table = SymbolTable::standard();
        for category in [
            SymbolCategory::Mode,
            SymbolCategory::Modifier,
            SymbolCategory::Domain,
            SymbolCategory::Source,
            SymbolCategory::Constraint,
            SymbolCategory::Action,
            SymbolCategory::Entity,
        ] {
            assert!(
                table.entries().any(|e| e.category == category),
                "no glyph for {category}"
            );
        }
        assert!(table.validate().is_ok());
    }

    #[test]
    fn reverse_lookup_finds_glyph() {
        let table = SymbolTable::standard();
        assert_eq!(table.glyph_for(SymbolCategory::Mode, "strict"), Some('◆'));
        assert_eq!(table.glyph_for(SymbolCategory::Constraint, "forbidden"), Some('⊗'));
        assert_eq!(table.glyph_for(SymbolCategory::Domain, "nowhere"), None);
    }

    #[test]
    fn merge_overrides_existing_glyphs() {
        let mut table = SymbolTable::standard();
        let mut overlay = SymbolTable::empty();
        overlay.insert(SymbolEntry {
            glyph: 'Ⓡ',
            category: SymbolCategory::Domain,
            name: "robotics".into(),
            strength: None,
        });
        overlay.insert(SymbolEntry {
            glyph: '♜',
            category: SymbolCategory::Entity,
            name: "robot".into(),
            strength: None,
        });
        let before = table.len();
        table.merge(&overlay);

        assert_eq!(table.len(), before + 1);
        assert_eq!(table.resolve('Ⓡ').unwrap().name, "robotics");
    }

    #[test]
    fn reserved_glyph_rejected() {
        let mut table = SymbolTable::empty();
        table.insert(SymbolEntry {
            glyph: '|',
            category: SymbolCategory::Action,
            name: "pipe".into(),
            strength: None,
        });
        assert!(table.validate().is_err());
    }

    #[test]
    fn execute_class_detection() {
        let table = SymbolTable::standard();
        let entry = table.resolve('⇒').unwrap();
        let symbol = Symbol {
            glyph: entry.glyph,
            category: entry.category,
            definition: entry.definition(),
            extensions: vec![],
        };
        assert!(symbol.is_execute_class());

        let read = table.resolve('◉').unwrap();
        let symbol = Symbol {
            glyph: read.glyph,
            category: read.category,
            definition: read.definition(),
            extensions: vec![],
        };
        assert!(!symbol.is_execute_class());
    }

    #[test]
    fn table_serialization_roundtrip() {
        let table = SymbolTable::standard();
        let json = serde_json::to_string(&table).unwrap();
        let restored: SymbolTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
    }
}
