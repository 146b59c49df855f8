//! Runtime configuration: YAML file layered with environment-variable overrides.
//!
//! Everything the engine tunes at runtime lives in [`EngineConfig`] — concurrency
//! caps, retry/breaker policy, timeouts, and the checkpoint backend choice.

pub mod loader;

pub use loader::{deep_merge, load_yaml_config, load_yaml_file, load_yaml_str};

use kernel_core::BackoffStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which [`kernel_checkpoint::Checkpointer`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStoreKind {
    Memory,
    LocalDurable,
}

impl FromStr for CheckpointStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "local_durable" | "local-durable" | "sqlite" => Ok(Self::LocalDurable),
            other => Err(format!("unknown checkpoint store kind: {other}")),
        }
    }
}

/// Tunable knobs for the orchestration engine, loadable from YAML and
/// overridable by environment variables of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_policy: BackoffStrategy,
    pub breaker_threshold: u32,
    pub breaker_timeout_s: u64,
    pub agent_timeout_s: u64,
    pub run_deadline_s: u64,
    pub stream_hwm: usize,
    pub checkpoint_store: CheckpointStoreKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_retries: 3,
            retry_policy: BackoffStrategy::Exponential,
            breaker_threshold: 5,
            breaker_timeout_s: 60,
            agent_timeout_s: 60,
            run_deadline_s: 600,
            stream_hwm: 1024,
            checkpoint_store: CheckpointStoreKind::Memory,
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file, then apply environment overrides on top.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::OrchestratorError> {
        let mut config: Self = load_yaml_config(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse from an in-memory YAML document, then apply environment overrides.
    pub fn from_yaml_str(content: &str) -> Result<Self, crate::OrchestratorError> {
        let yaml = load_yaml_str(content)?;
        let mut config: Self = loader::deserialize_yaml(&yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override fields with `MAX_CONCURRENT`, `MAX_RETRIES`, etc. when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MAX_CONCURRENT") {
            if let Ok(parsed) = v.parse() {
                self.max_concurrent = parsed;
            }
        }
        if let Ok(v) = std::env::var("MAX_RETRIES") {
            if let Ok(parsed) = v.parse() {
                self.max_retries = parsed;
            }
        }
        if let Ok(v) = std::env::var("RETRY_POLICY") {
            if let Ok(parsed) = v.parse() {
                self.retry_policy = parsed;
            }
        }
        if let Ok(v) = std::env::var("BREAKER_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                self.breaker_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("BREAKER_TIMEOUT_S") {
            if let Ok(parsed) = v.parse() {
                self.breaker_timeout_s = parsed;
            }
        }
        if let Ok(v) = std::env::var("AGENT_TIMEOUT_S") {
            if let Ok(parsed) = v.parse() {
                self.agent_timeout_s = parsed;
            }
        }
        if let Ok(v) = std::env::var("RUN_DEADLINE_S") {
            if let Ok(parsed) = v.parse() {
                self.run_deadline_s = parsed;
            }
        }
        if let Ok(v) = std::env::var("STREAM_HWM") {
            if let Ok(parsed) = v.parse() {
                self.stream_hwm = parsed;
            }
        }
        if let Ok(v) = std::env::var("CHECKPOINT_STORE") {
            if let Ok(parsed) = v.parse() {
                self.checkpoint_store = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.breaker_threshold, 5);
        assert_eq!(config.breaker_timeout_s, 60);
        assert_eq!(config.agent_timeout_s, 60);
        assert_eq!(config.run_deadline_s, 600);
        assert_eq!(config.stream_hwm, 1024);
        assert_eq!(config.checkpoint_store, CheckpointStoreKind::Memory);
    }

    #[test]
    fn from_yaml_str_overrides_selected_fields() {
        let config = EngineConfig::from_yaml_str("max_concurrent: 8\nbreaker_threshold: 10\n").unwrap();
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.breaker_threshold, 10);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn env_override_wins_over_yaml() {
        std::env::set_var("MAX_CONCURRENT", "9");
        let config = EngineConfig::from_yaml_str("max_concurrent: 2\n").unwrap();
        assert_eq!(config.max_concurrent, 9);
        std::env::remove_var("MAX_CONCURRENT");
    }

    #[test]
    fn checkpoint_store_kind_parses_known_aliases() {
        assert_eq!("memory".parse::<CheckpointStoreKind>().unwrap(), CheckpointStoreKind::Memory);
        assert_eq!("local_durable".parse::<CheckpointStoreKind>().unwrap(), CheckpointStoreKind::LocalDurable);
        assert!("bogus".parse::<CheckpointStoreKind>().is_err());
    }
}
