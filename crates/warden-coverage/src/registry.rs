use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoverageError;

/// Risk assumed for tools the registry has never heard of.
pub const UNKNOWN_TOOL_RISK: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    #[default]
    General,
    Financial,
}

/// Static metadata about one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolProfile {
    pub name: String,
    /// Frame domains this tool operates in.
    pub domains: Vec<String>,
    /// Frame actions this tool is compatible with.
    pub actions: Vec<String>,
    /// Inherent risk weight (0.0–1.0).
    pub risk: f64,
    #[serde(default)]
    pub category: ToolCategory,
}

impl ToolProfile {
    pub fn new(name: impl Into<String>, domains: &[&str], actions: &[&str], risk: f64) -> Self {
        Self {
            name: name.into(),
            domains: domains.iter().map(|d| (*d).to_string()).collect(),
            actions: actions.iter().map(|a| (*a).to_string()).collect(),
            risk,
            category: ToolCategory::General,
        }
    }

    pub fn financial(mut self) -> Self {
        self.category = ToolCategory::Financial;
        self
    }

    pub fn covers_domain(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }

    pub fn covers_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    fn validate(&self) -> Result<(), CoverageError> {
        if self.name.trim().is_empty() {
            return Err(CoverageError::EmptyToolName);
        }
        if !(0.0..=1.0).contains(&self.risk) {
            return Err(CoverageError::RiskOutOfRange {
                tool: self.name.clone(),
                risk: self.risk,
            });
        }
        Ok(())
    }
}

/// Tool name → profile lookup table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ToolProfile>", into = "Vec<ToolProfile>")]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolProfile>,
}

impl From<Vec<ToolProfile>> for ToolRegistry {
    fn from(profiles: Vec<ToolProfile>) -> Self {
        Self {
            tools: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }
}

impl From<ToolRegistry> for Vec<ToolProfile> {
    fn from(registry: ToolRegistry) -> Self {
        registry.tools.into_values().collect()
    }
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the common agent tool set.
    pub fn standard() -> Self {
        let profiles = vec![
            ToolProfile::new("read_file", &["data", "code"], &["read", "analyze"], 0.1),
            ToolProfile::new("search_files", &["data", "code"], &["search", "read"], 0.1),
            ToolProfile::new("write_file", &["data", "code"], &["write"], 0.5),
            ToolProfile::new("delete_file", &["data", "code", "system"], &["delete"], 0.8),
            ToolProfile::new("execute_command", &["system", "code"], &["execute"], 0.9),
            ToolProfile::new("query_database", &["data"], &["read", "search", "analyze"], 0.3),
            ToolProfile::new("http_request", &["network", "research"], &["read", "send"], 0.6),
            ToolProfile::new("web_search", &["research", "network"], &["search", "read"], 0.2),
            ToolProfile::new("send_email", &["messaging"], &["send", "write"], 0.6),
            ToolProfile::new("post_message", &["messaging"], &["send"], 0.4),
            ToolProfile::new("transfer_funds", &["finance"], &["transfer"], 0.95).financial(),
            ToolProfile::new("refund_payment", &["finance"], &["transfer", "write"], 0.75)
                .financial(),
        ];
        Self::from(profiles)
    }

    /// Add or replace a tool profile.
    pub fn register(&mut self, profile: ToolProfile) -> Result<(), CoverageError> {
        profile.validate()?;
        self.tools.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn get(&self, tool: &str) -> Option<&ToolProfile> {
        self.tools.get(tool)
    }

    /// Risk weight, falling back to [`UNKNOWN_TOOL_RISK`].
    pub fn risk(&self, tool: &str) -> f64 {
        self.get(tool).map(|p| p.risk).unwrap_or(UNKNOWN_TOOL_RISK)
    }

    pub fn validate(&self) -> Result<(), CoverageError> {
        self.tools.values().try_for_each(ToolProfile::validate)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_is_valid() {
        let registry = ToolRegistry::standard();
        assert!(registry.validate().is_ok());
        assert_eq!(
            registry.get("transfer_funds").unwrap().category,
            ToolCategory::Financial
        );
    }

    #[test]
    fn unknown_tool_uses_default_risk() {
        let registry = ToolRegistry::standard();
        assert_eq!(registry.risk("launch_rocket"), UNKNOWN_TOOL_RISK);
    }

    #[test]
    fn register_rejects_out_of_range_risk() {
        let mut registry = ToolRegistry::empty();
        let err = registry
            .register(ToolProfile::new("bad", &["data"], &["read"], 1.5))
            .unwrap_err();
        assert!(matches!(err, CoverageError::RiskOutOfRange { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_deserializes_from_list() {
        let json = r#"[{"name":"ping","domains":["network"],"actions":["read"],"risk":0.1}]"#;
        let registry: ToolRegistry = serde_json::from_str(json).unwrap();
        let ping = registry.get("ping").unwrap();
        assert!(ping.covers_domain("network"));
        assert_eq!(ping.category, ToolCategory::General);
    }
}
