//! Service configuration

use serde::{Deserialize, Serialize};
use smsguard_classifiers::{ClassifierConfig, ClassifierMode};
use smsguard_reassembly::ReassemblyConfig;
use std::path::{Path, PathBuf};

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Classification settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Segment reassembly settings
    #[serde(default)]
    pub reassembly: ReassemblyConfig,

    /// Message store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Word model file
    pub model_path: Option<PathBuf>,

    /// Force keyword-only classification
    pub keyword_only: bool,

    /// Inference timeout in milliseconds
    pub inference_timeout_ms: Option<u64>,
}

impl ServiceConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(model_path) = &overrides.model_path {
            config.classifier.model_path = Some(model_path.clone());
        }

        if overrides.keyword_only {
            config.classifier.mode = ClassifierMode::KeywordOnly;
        }

        if let Some(timeout) = overrides.inference_timeout_ms {
            config.classifier.inference_timeout_ms = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.notifications.channel_capacity == 0 {
            anyhow::bail!("notifications.channel_capacity must be at least 1");
        }
        Ok(())
    }
}

/// Message store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Content length kept when a save is retried
    #[serde(default = "default_retry_truncate_chars")]
    pub retry_truncate_chars: usize,

    /// Messages older than this many days are purged after an ingest run
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            retry_truncate_chars: default_retry_truncate_chars(),
            retention_days: None,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Log every spam notification
    #[serde(default = "default_true")]
    pub log: bool,

    /// Buffer of the broadcast notification channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_retry_truncate_chars() -> usize {
    100
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}
