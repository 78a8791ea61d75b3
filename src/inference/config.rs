//! Inference configuration

use crate::error::CardioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a request's fields differ from the fitted schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftPolicy {
    /// Impute missing numerics, zero-encode missing categoricals, ignore extras
    #[default]
    FillDefaults,
    /// Reject the request with a 400
    Reject,
}

impl FromStr for DriftPolicy {
    type Err = CardioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill" | "fill_defaults" | "fill-defaults" => Ok(DriftPolicy::FillDefaults),
            "reject" => Ok(DriftPolicy::Reject),
            other => Err(CardioError::Config(format!(
                "Unknown drift policy '{}', expected 'fill_defaults' or 'reject'",
                other
            ))),
        }
    }
}

impl fmt::Display for DriftPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftPolicy::FillDefaults => write!(f, "fill_defaults"),
            DriftPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for request-time prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub drift_policy: DriftPolicy,

    /// Decimal places kept on returned probabilities
    pub probability_decimals: u32,

    /// Fields returned by the explanation endpoint
    pub explanation_top_k: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            drift_policy: DriftPolicy::default(),
            probability_decimals: 4,
            explanation_top_k: 3,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.drift_policy, DriftPolicy::FillDefaults);
        assert_eq!(config.probability_decimals, 4);
        assert_eq!(config.explanation_top_k, 3);
    }

    #[test]
    fn test_parse_drift_policy() {
        assert_eq!("reject".parse::<DriftPolicy>().unwrap(), DriftPolicy::Reject);
        assert_eq!("Fill_Defaults".parse::<DriftPolicy>().unwrap(), DriftPolicy::FillDefaults);
        assert!("strict".parse::<DriftPolicy>().is_err());
        assert_eq!(DriftPolicy::Reject.to_string(), "reject");
    }
}
