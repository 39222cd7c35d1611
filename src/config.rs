//! YAML configuration for the whole GovMatch pipeline.
//!
//! A single file configures every stage: engine budgets, scoring tunables,
//! quick filter thresholds, batch coordination, and optimizer policy. All
//! sections are optional and default to production values.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "staging"
//!
//! engine:
//!   cache_ttl_seconds: 86400
//!   scorer_hard_timeout_ms: 2000
//!   orchestrator_budget_ms: 5000
//!   scorer_pool_size: 4
//!
//! scoring:
//!   embedding_dimension: 1024
//!   max_chunks: 16
//!   recency_window_years: 3
//!
//! quick_filter:
//!   capacity:
//!     large_contract_floor: 10000000.0
//!     small_contract_ceiling: 100000.0
//!
//! batch:
//!   batch_size_default: 50
//!   concurrency_default: 4
//!
//! default_weights:
//!   semantic_similarity: 0.25
//!   past_performance: 0.20
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use batch::{BatchConfig, OptimizerConfig};
use engine::EngineConfig;
use filter::QuickFilterConfig;
use scoring::ScoringConfig;

/// Errors that can occur when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the matching pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GovMatchConfig {
    /// Configuration format version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Orchestrator budgets and cache TTLs.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Scoring component tunables.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Quick filter thresholds.
    #[serde(default)]
    pub quick_filter: QuickFilterConfig,

    /// Batch coordination settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Adaptive optimizer policy.
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Deployment-wide weight overrides merged over the component defaults.
    /// Tenant overrides from the weight store still apply on top.
    #[serde(default)]
    pub default_weights: Option<BTreeMap<String, f64>>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for GovMatchConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            engine: EngineConfig::default(),
            scoring: ScoringConfig::default(),
            quick_filter: QuickFilterConfig::default(),
            batch: BatchConfig::default(),
            optimizer: OptimizerConfig::default(),
            default_weights: None,
        }
    }
}

impl GovMatchConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: GovMatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.engine
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        if let Some(weights) = &self.default_weights {
            for (name, weight) in weights {
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(ConfigLoadError::Validation(format!(
                        "weight for {name:?} must be a non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(GovMatchConfig::default().validate().is_ok());
    }

    #[test]
    fn yaml_round_trip_with_overrides() {
        let yaml = r#"
version: "1.0"
name: "staging"
engine:
  cache_ttl_seconds: 3600
  scorer_pool_size: 8
scoring:
  embedding_dimension: 384
quick_filter:
  capacity:
    large_contract_floor: 5000000.0
default_weights:
  semantic_similarity: 0.4
  keyword_matching: 0.1
"#;
        let config = GovMatchConfig::from_yaml(yaml).expect("yaml should parse");
        assert_eq!(config.name.as_deref(), Some("staging"));
        assert_eq!(config.engine.cache_ttl_seconds, 3_600);
        assert_eq!(config.engine.scorer_pool_size, 8);
        assert_eq!(config.scoring.embedding_dimension, 384);
        assert_eq!(config.quick_filter.capacity.large_contract_floor, 5_000_000.0);
        assert_eq!(
            config.default_weights.as_ref().unwrap()["semantic_similarity"],
            0.4
        );
        // Unspecified sections fall back to defaults.
        assert_eq!(config.batch.batch_size_default, 50);
    }

    #[test]
    fn unsupported_version_rejected() {
        let yaml = r#"version: "2.0""#;
        assert!(matches!(
            GovMatchConfig::from_yaml(yaml),
            Err(ConfigLoadError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn negative_weight_rejected() {
        let yaml = r#"
version: "1.0"
default_weights:
  semantic_similarity: -0.5
"#;
        assert!(matches!(
            GovMatchConfig::from_yaml(yaml),
            Err(ConfigLoadError::Validation(_))
        ));
    }

    #[test]
    fn bad_yaml_is_a_parse_error() {
        assert!(matches!(
            GovMatchConfig::from_yaml(": not yaml"),
            Err(ConfigLoadError::YamlParse(_))
        ));
    }
}
