use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_coverage::{CoverageCalculator, CoverageLimits, CoverageWeights, ToolProfile, ToolRegistry};
use warden_frame::{SymbolEntry, SymbolTable, ValidationOptions};
use warden_governance::{default_gates, AutonomyConfig, GateSpec, ModulationConfig};
use warden_interceptor::ConfidenceThresholds;

use crate::error::ConfigError;

const DEFAULT_VOCAB_SIZE: usize = 1024;

fn default_vocab_size() -> usize {
    DEFAULT_VOCAB_SIZE
}

/// Everything a [`crate::Warden`] session can be tuned with.
///
/// Every section is optional; missing sections take their defaults. Extra
/// symbols and tools are merged over the standard tables. The immutable
/// floor has no configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub thresholds: ConfidenceThresholds,
    pub validation: ValidationOptions,
    pub coverage_weights: CoverageWeights,
    pub coverage_limits: CoverageLimits,
    /// Symbols added to (or replacing entries of) the standard table.
    pub symbols: Vec<SymbolEntry>,
    /// Tools added to (or replacing entries of) the standard registry.
    pub tools: Vec<ToolProfile>,
    pub autonomy: AutonomyConfig,
    pub modulation: ModulationConfig,
    /// Replaces the default gate set when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gates: Option<Vec<GateSpec>>,
    /// Vocabulary size feeding the entropy gate floor (default: 1024)
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            validation: ValidationOptions::default(),
            coverage_weights: CoverageWeights::default(),
            coverage_limits: CoverageLimits::default(),
            symbols: Vec::new(),
            tools: Vec::new(),
            autonomy: AutonomyConfig::default(),
            modulation: ModulationConfig::default(),
            gates: None,
            vocab_size: DEFAULT_VOCAB_SIZE,
        }
    }
}

impl WardenConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents)?,
            "json" => Self::from_json_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        debug!(path = %path.display(), "Loaded warden config");
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.coverage_limits.validate()?;
        self.symbol_table().validate()?;
        self.tool_registry()?;
        self.autonomy.validate()?;
        self.modulation.validate()?;

        let mut seen = HashSet::new();
        for gate in self.gates() {
            gate.validate()?;
            if !seen.insert(gate.name.clone()) {
                return Err(ConfigError::DuplicateGate(gate.name));
            }
        }
        Ok(())
    }

    /// Standard symbols with configured entries merged over them.
    pub fn symbol_table(&self) -> SymbolTable {
        let mut table = SymbolTable::standard();
        table.merge(&SymbolTable::from(self.symbols.clone()));
        table
    }

    /// Standard tools with configured profiles registered over them.
    pub fn tool_registry(&self) -> Result<ToolRegistry, ConfigError> {
        let mut registry = ToolRegistry::standard();
        for profile in &self.tools {
            registry.register(profile.clone())?;
        }
        Ok(registry)
    }

    pub fn coverage_calculator(&self) -> Result<CoverageCalculator, ConfigError> {
        Ok(CoverageCalculator::new(self.tool_registry()?)
            .with_weights(self.coverage_weights)
            .with_limits(self.coverage_limits))
    }

    /// Configured gates, or the defaults for `vocab_size`.
    pub fn gates(&self) -> Vec<GateSpec> {
        self.gates
            .clone()
            .unwrap_or_else(|| default_gates(self.vocab_size))
    }
}
