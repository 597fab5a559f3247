//! Generation settings.
//!
//! A `GenerationConfig` fixes everything a run needs besides the rule table:
//! lattice size, seed and the per-tick step budget used by the plugin.
//!
//! ```ignore
//! let config = GenerationConfig::load("strata.json")?;
//! let solver = config.build_solver(geology_rules());
//! ```

use crate::rules::RuleTable;
use crate::solver::Solver;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Errors that can occur while loading a config.
#[derive(Debug)]
pub enum ConfigError {
    /// File system error
    Io(std::io::Error),
    /// JSON deserialization error
    Json(String),
    /// Width, height or depth is zero
    ZeroDimension,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
            ConfigError::ZeroDimension => write!(f, "grid dimensions must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Lattice size, seed and step budget for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub seed: u64,
    /// Maximum `step()` calls per tick
    pub steps_per_tick: usize,
    /// Stop after this many ticks even if unfinished
    pub max_ticks: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            depth: 64,
            seed: 0,
            steps_per_tick: 100,
            max_ticks: None,
        }
    }
}

impl GenerationConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Self =
            serde_json::from_reader(reader).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// A fresh solver over this config's lattice and seed.
    pub fn build_solver(&self, rules: RuleTable) -> Solver {
        Solver::new(self.width, self.height, self.depth, rules, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.steps_per_tick, 100);
        assert_eq!(config.cell_count(), 64 * 32 * 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GenerationConfig::from_json_str(r#"{"width": 8, "seed": 7}"#).unwrap();
        assert_eq!(config.width, 8);
        assert_eq!(config.seed, 7);
        assert_eq!(config.height, 32);
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = GenerationConfig::from_json_str(r#"{"depth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDimension));
    }

    #[test]
    fn test_bad_json_rejected() {
        let err = GenerationConfig::from_json_str("{width: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"width": 4, "height": 5, "depth": 6, "seed": 3, "steps_per_tick": 10, "max_ticks": 2}}"#
        )
        .unwrap();

        let config = GenerationConfig::load(file.path()).unwrap();
        assert_eq!(
            config,
            GenerationConfig {
                width: 4,
                height: 5,
                depth: 6,
                seed: 3,
                steps_per_tick: 10,
                max_ticks: Some(2),
            }
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GenerationConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
