//! Runtime configuration, loadable from YAML

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::MAX_FREE_IDS;
use crate::error::{HiveError, Result};

fn default_max_free_ids() -> usize {
    MAX_FREE_IDS
}

fn default_report_history() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

/// What the runtime does with a command no handler is bound for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutedPolicy {
    /// Drop it, logging at debug level
    #[default]
    Drop,
    /// Drop it with a warning
    Warn,
    /// Fail the step
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_max_free_ids")]
    pub max_free_ids: usize,
    #[serde(default = "default_report_history")]
    pub report_history: usize,
    #[serde(default)]
    pub unrouted: UnroutedPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_free_ids: default_max_free_ids(),
            report_history: default_report_history(),
            unrouted: UnroutedPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&read_to_string(path.as_ref())?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| HiveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = RuntimeConfig::from_yaml_str("report_history: 8\n").unwrap();

        assert_eq!(config.max_free_ids, MAX_FREE_IDS);
        assert_eq!(config.report_history, 8);
        assert_eq!(config.unrouted, UnroutedPolicy::Drop);
    }

    #[test]
    fn test_unrouted_policy_names() {
        let config = RuntimeConfig::from_yaml_str("unrouted: error\nmax_free_ids: 16\n").unwrap();
        assert_eq!(config.unrouted, UnroutedPolicy::Error);
        assert_eq!(config.max_free_ids, 16);

        assert!(RuntimeConfig::from_yaml_str("unrouted: explode\n").is_err());
    }

    #[test]
    fn test_config_yaml_file_roundtrip() {
        let config = RuntimeConfig {
            max_free_ids: 32,
            report_history: 4,
            unrouted: UnroutedPolicy::Warn,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.yaml");
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

        let loaded = RuntimeConfig::from_yaml_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RuntimeConfig::from_yaml_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, HiveError::Io { ref path, .. } if path.ends_with("exist.yaml")));
    }
}
