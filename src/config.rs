//! Configuration for the evaluator and the `kuba-eval` binary
//!
//! TOML files with per-field defaults, environment variable overrides, and
//! validation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Evaluation behaviour
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Evaluation behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvaluatorConfig {
    /// Deepest nesting of calls (synthesized ones included) before giving up
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,

    /// Evaluate sibling series arguments on the rayon pool
    #[serde(default)]
    pub parallel_arguments: bool,

    /// Drop groups whose callback fails instead of failing the grouping call
    #[serde(default = "default_true")]
    pub lenient_group_by: bool,

    /// Record per-function prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Logging
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Include targets in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

fn default_max_recursion_depth() -> usize { 64 }
fn default_log_level() -> String { "warn".to_string() }
fn default_true() -> bool { true }

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion_depth(),
            parallel_arguments: false,
            lenient_group_by: true,
            metrics_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            with_target: true,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("Failed to read config file {}: {}", path, e)))?;

        toml::from_str(&contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file {}: {}", path, e)))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(depth) = std::env::var("KUBA_EVAL_MAX_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.evaluator.max_recursion_depth = d;
            }
        }
        if let Some(b) = std::env::var("KUBA_EVAL_PARALLEL").ok().as_deref().and_then(parse_bool) {
            self.evaluator.parallel_arguments = b;
        }
        if let Some(b) = std::env::var("KUBA_EVAL_LENIENT_GROUP_BY")
            .ok()
            .as_deref()
            .and_then(parse_bool)
        {
            self.evaluator.lenient_group_by = b;
        }
        if let Some(b) = std::env::var("KUBA_EVAL_METRICS").ok().as_deref().and_then(parse_bool) {
            self.evaluator.metrics_enabled = b;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.evaluator.max_recursion_depth == 0 {
            return Err(Error::Configuration("Max recursion depth must be > 0".to_string()));
        }
        if self.evaluator.max_recursion_depth > 10_000 {
            return Err(Error::Configuration("Max recursion depth cannot exceed 10000".to_string()));
        }
        if self.logging.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Configuration(format!("Failed to write config file {}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.evaluator.max_recursion_depth, 64);
        assert!(config.evaluator.lenient_group_by);
        assert!(!config.evaluator.parallel_arguments);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_depth_is_invalid() {
        let mut config = Config::default();
        config.evaluator.max_recursion_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[evaluator]\nparallel_arguments = true\n").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(config.evaluator.parallel_arguments);
        assert_eq!(config.evaluator.max_recursion_depth, 64);
        assert_eq!(config.logging.log_level, "warn");
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let mut config = Config::default();
        config.evaluator.lenient_group_by = false;
        config.save_to_file(path).unwrap();

        assert_eq!(Config::from_file(path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[evaluator\n").unwrap();
        assert!(matches!(
            Config::from_file(file.path().to_str().unwrap()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("KUBA_EVAL_MAX_DEPTH", "12");
        let config = Config::from_env();
        assert_eq!(config.evaluator.max_recursion_depth, 12);
        std::env::remove_var("KUBA_EVAL_MAX_DEPTH");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
