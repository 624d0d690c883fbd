use serde::{Deserialize, Serialize};

use crate::error::InterceptorError;

/// Confidence thresholds applied by the interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Minimum frame parse confidence before any tool runs (default: 0.7)
    pub pre_execute: f64,
    /// Minimum observed confidence after execution (default: 0.8)
    pub post_audit: f64,
    /// Minimum coverage confidence (default: 0.6)
    pub coverage_minimum: f64,
    /// Largest tolerated gap between predicted coverage and observed
    /// confidence (default: 0.15)
    pub drift_threshold: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            pre_execute: 0.7,
            post_audit: 0.8,
            coverage_minimum: 0.6,
            drift_threshold: 0.15,
        }
    }
}

impl ConfidenceThresholds {
    pub fn validate(&self) -> Result<(), InterceptorError> {
        for (name, value) in [
            ("pre_execute", self.pre_execute),
            ("post_audit", self.post_audit),
            ("coverage_minimum", self.coverage_minimum),
            ("drift_threshold", self.drift_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InterceptorError::ThresholdOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConfidenceThresholds::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_rejected() {
        let thresholds = ConfidenceThresholds {
            coverage_minimum: 1.2,
            ..ConfidenceThresholds::default()
        };
        let err = thresholds.validate().unwrap_err();
        assert!(err.to_string().contains("coverage_minimum"));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let thresholds: ConfidenceThresholds =
            serde_json::from_str(r#"{"pre_execute": 0.9}"#).unwrap();
        assert_eq!(thresholds.pre_execute, 0.9);
        assert_eq!(thresholds.coverage_minimum, 0.6);
    }
}
