use std::collections::HashMap;

use regex::Regex;
use warden_frame::ToolBindings;

/// Result of matching a tool against a frame's bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingMatch {
    Allowed { pattern: String },
    Blocked { pattern: String },
    /// No pattern matched; default deny.
    Unbound,
}

impl BindingMatch {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BindingMatch::Allowed { .. })
    }
}

/// Upper bound on cached globs; the cache is cleared when it fills.
pub const PATTERN_CACHE_CAPACITY: usize = 1024;

fn compile_glob(pattern: &str) -> Option<Regex> {
    let translated = format!(
        "^{}$",
        pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*")
    );
    Regex::new(&translated).ok()
}

/// Exact match, or a glob where `*` matches any substring.
///
/// Compiles the glob on every call; [`PatternCache`] keeps compiled globs.
pub fn pattern_matches(pattern: &str, tool: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == tool;
    }
    compile_glob(pattern).is_some_and(|re| re.is_match(tool))
}

/// Compiled globs keyed by pattern text.
#[derive(Clone, Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same result as [`pattern_matches`], compiling each glob once.
    pub fn matches(&mut self, pattern: &str, tool: &str) -> bool {
        if !pattern.contains('*') {
            return pattern == tool;
        }
        if let Some(compiled) = self.compiled.get(pattern) {
            return compiled.as_ref().is_some_and(|re| re.is_match(tool));
        }

        if self.compiled.len() >= PATTERN_CACHE_CAPACITY {
            self.compiled.clear();
        }
        let compiled = compile_glob(pattern);
        let matched = compiled.as_ref().is_some_and(|re| re.is_match(tool));
        self.compiled.insert(pattern.to_string(), compiled);
        matched
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Blocked patterns are consulted first and always win.
pub fn match_tool(bindings: &ToolBindings, tool: &str) -> BindingMatch {
    match_tool_with(bindings, tool, &mut PatternCache::new())
}

/// [`match_tool`] backed by a long-lived pattern cache.
pub fn match_tool_with(bindings: &ToolBindings, tool: &str, cache: &mut PatternCache) -> BindingMatch {
    if let Some(pattern) = bindings.blocked.iter().find(|p| cache.matches(p, tool)) {
        return BindingMatch::Blocked {
            pattern: pattern.clone(),
        };
    }
    if let Some(pattern) = bindings.allowed.iter().find(|p| cache.matches(p, tool)) {
        return BindingMatch::Allowed {
            pattern: pattern.clone(),
        };
    }
    BindingMatch::Unbound
}
