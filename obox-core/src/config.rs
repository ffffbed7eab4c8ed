// obox-core/src/config.rs

//! Configuration for the tool server, read from TOML.

use crate::process::DEFAULT_ERROR_PREFIX;
use crate::project::DEFAULT_MAX_DEPTH;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OboxConfig {
    pub process: ProcessConfig,
    pub project_root: ProjectRootConfig,
    pub read_file: ReadFileConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProcessConfig {
    pub error_prefix: String,
    /// Applied to `run_command` calls that don't pass their own timeout.
    pub default_timeout_secs: Option<f64>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            default_timeout_secs: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectRootConfig {
    pub max_depth: usize,
}

impl Default for ProjectRootConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReadFileConfig {
    pub max_lines: usize,
}

impl Default for ReadFileConfig {
    fn default() -> Self {
        Self { max_lines: 500 }
    }
}

impl OboxConfig {
    pub fn from_toml_str(content: &str) -> Result<OboxConfig> {
        let config: OboxConfig = match toml::from_str(content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e)).context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };

        if config.process.error_prefix.trim().is_empty() {
            return Err(anyhow!("'process.error_prefix' must not be empty."));
        }
        if let Some(secs) = config.process.default_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(anyhow!(
                    "'process.default_timeout_secs' must be a positive number of seconds, got {}.",
                    secs
                ));
            }
        }
        if config.project_root.max_depth == 0 {
            return Err(anyhow!("'project_root.max_depth' must be at least 1."));
        }
        if config.read_file.max_lines == 0 {
            return Err(anyhow!("'read_file.max_lines' must be at least 1."));
        }

        tracing::info!("Successfully parsed and validated obox configuration.");
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<OboxConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.process.default_timeout_secs.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = OboxConfig::from_toml_str("").unwrap();
        assert_eq!(config, OboxConfig::default());
        assert_eq!(config.process.error_prefix, "Error executing");
        assert_eq!(config.project_root.max_depth, 5);
        assert_eq!(config.read_file.max_lines, 500);
        assert_eq!(config.default_timeout(), None);
    }

    #[test]
    fn test_full_config_parse() {
        let content = r#"
            [process]
            error_prefix = "Tool failed"
            default_timeout_secs = 2.5

            [project_root]
            max_depth = 3

            [read_file]
            max_lines = 200
        "#;
        let config = OboxConfig::from_toml_str(content).unwrap();
        assert_eq!(config.process.error_prefix, "Tool failed");
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.project_root.max_depth, 3);
        assert_eq!(config.read_file.max_lines, 200);
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let result = OboxConfig::from_toml_str("[process]\ndefault_timeout_secs = 0.0\n");
        let error_string = result.unwrap_err().to_string();
        assert!(error_string.contains("default_timeout_secs"), "Unexpected error message: {}", error_string);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let result = OboxConfig::from_toml_str("[project_root]\nmax_depth = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_toml() {
        let result = OboxConfig::from_toml_str("[process\nerror_prefix = ");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[read_file]\nmax_lines = 42\n").unwrap();
        let config = OboxConfig::load(&path).unwrap();
        assert_eq!(config.read_file.max_lines, 42);

        assert!(OboxConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
