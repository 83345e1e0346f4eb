//! Configuration for the classification stack

use crate::bayes::{DEFAULT_HAM_WHITELIST, DEFAULT_WHITELIST_PENALTY};
use crate::decision::DecisionConfig;
use crate::inference::DEFAULT_INFERENCE_TIMEOUT;
use crate::keywords::{CHECKER_KEYWORDS, DETECTOR_KEYWORDS};
use serde::{Deserialize, Serialize};
use smsguard_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which classifier handles messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Bayes + inference + keywords through the decision tiers
    #[default]
    Hybrid,

    /// Keyword hit alone decides
    KeywordOnly,
}

/// Configuration for classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Classifier mode
    #[serde(default)]
    pub mode: ClassifierMode,

    /// Word model file; an empty model is used when unset or unreadable
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Upper bound on one inference call in milliseconds
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,

    /// Decision tiers and fusion weights
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Benign words that lower the Bayes spam score
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,

    /// Log-odds penalty applied when a whitelisted word is present
    #[serde(default = "default_whitelist_penalty")]
    pub whitelist_penalty: f64,

    /// Keyword set of the hybrid detector
    #[serde(default = "default_detector_keywords")]
    pub detector_keywords: Vec<String>,

    /// Keyword set of the keyword-only checker
    #[serde(default = "default_checker_keywords")]
    pub checker_keywords: Vec<String>,
}

fn default_inference_timeout_ms() -> u64 {
    DEFAULT_INFERENCE_TIMEOUT.as_millis() as u64
}

fn default_whitelist() -> Vec<String> {
    DEFAULT_HAM_WHITELIST.iter().map(|w| w.to_string()).collect()
}

fn default_whitelist_penalty() -> f64 {
    DEFAULT_WHITELIST_PENALTY
}

fn default_detector_keywords() -> Vec<String> {
    DETECTOR_KEYWORDS.iter().map(|w| w.to_string()).collect()
}

fn default_checker_keywords() -> Vec<String> {
    CHECKER_KEYWORDS.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::default(),
            model_path: None,
            inference_timeout_ms: default_inference_timeout_ms(),
            decision: DecisionConfig::default(),
            whitelist: default_whitelist(),
            whitelist_penalty: default_whitelist_penalty(),
            detector_keywords: default_detector_keywords(),
            checker_keywords: default_checker_keywords(),
        }
    }
}

impl ClassifierConfig {
    /// Parse from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse classifier config: {}", e)))
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Inference timeout as a duration
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = ClassifierConfig::from_yaml("{}").unwrap();
        assert_eq!(config.mode, ClassifierMode::Hybrid);
        assert_eq!(config.inference_timeout(), Duration::from_secs(2));
        assert_eq!(config.whitelist.len(), DEFAULT_HAM_WHITELIST.len());
        assert_eq!(config.whitelist_penalty, 2.0);
        assert_eq!(config.decision.tiers.len(), 4);
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let yaml = r#"
mode: keyword_only
model_path: /var/lib/smsguard/model.json
inference_timeout_ms: 250
checker_keywords: [jackpot]
decision:
  fusion:
    confident_ml_weight: 0.9
"#;
        let config = ClassifierConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.mode, ClassifierMode::KeywordOnly);
        assert_eq!(config.inference_timeout(), Duration::from_millis(250));
        assert_eq!(config.checker_keywords, vec!["jackpot".to_string()]);
        assert_eq!(config.decision.fusion.confident_ml_weight, 0.9);
        assert_eq!(config.decision.fusion.uncertain_ml_weight, 0.3);
        assert_eq!(config.decision.tiers.len(), 4);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = ClassifierConfig::from_yaml("mode: [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
