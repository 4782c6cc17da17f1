//! Lab configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables, then validated. Every field has a default so an empty file (or
//! no file at all) is a valid configuration.
//!
//! Environment overrides:
//! - `AGENTLAB_TICK_MS`: tick interval in milliseconds
//! - `AGENTLAB_SEED`: fixed rng seed for reproducible runs
//! - `AGENTLAB_LOG_JSON`: `true`/`1` for JSON log lines
//! - `AGENTLAB_LOG_LEVEL`: default log level

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{LabError, Result, MAX_ITERATIONS, MIN_ITERATIONS};
use crate::simulator::RandomWalk;

pub const ENV_TICK_MS: &str = "AGENTLAB_TICK_MS";
pub const ENV_SEED: &str = "AGENTLAB_SEED";
pub const ENV_LOG_JSON: &str = "AGENTLAB_LOG_JSON";
pub const ENV_LOG_LEVEL: &str = "AGENTLAB_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Delay between experiment ticks.
    pub tick_interval_ms: u64,
    /// Iteration budget used when a request does not name one.
    pub default_max_iterations: u32,
    /// Fixed seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub scoring: ScoringConfig,
    pub log: LogConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            default_max_iterations: 10,
            seed: None,
            scoring: ScoringConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Parameters of the random-walk scoring strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub magnitude: f64,
    pub offset: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let walk = RandomWalk::default();
        Self {
            magnitude: walk.magnitude,
            offset: walk.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub json: bool,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

impl LabConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: LabConfig =
            toml::from_str(input).map_err(|e| LabError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// File (if any), then process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TICK_MS) {
            self.tick_interval_ms = parse_env(ENV_TICK_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            self.seed = Some(parse_env(ENV_SEED, &value)?);
        }
        if let Some(value) = lookup(ENV_LOG_JSON) {
            self.log.json = matches!(value.trim(), "1" | "true" | "TRUE" | "yes");
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log.level = value.trim().to_string();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `LabError::Config` describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(LabError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.default_max_iterations) {
            return Err(LabError::Config(format!(
                "default_max_iterations must be between {} and {}",
                MIN_ITERATIONS, MAX_ITERATIONS
            )));
        }
        if !(self.scoring.magnitude.is_finite() && self.scoring.magnitude > 0.0) {
            return Err(LabError::Config(
                "scoring.magnitude must be a positive number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scoring.offset) {
            return Err(LabError::Config(
                "scoring.offset must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn scoring_strategy(&self) -> RandomWalk {
        RandomWalk::new(self.scoring.magnitude, self.scoring.offset)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LabError::Config(format!("{key} has invalid value {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = LabConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.scoring_strategy().expected_increment() < 0.0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = LabConfig::from_toml_str("").expect("parse empty");
        assert_eq!(config, LabConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_fields() {
        let config = LabConfig::from_toml_str(
            r#"
            tick_interval_ms = 250
            seed = 7

            [scoring]
            offset = 0.3

            [log]
            json = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.scoring.offset, 0.3);
        assert_eq!(config.scoring.magnitude, 20.0);
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = LabConfig::from_toml_str("tick_rate = 5").unwrap_err();
        assert!(matches!(err, LabError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            "tick_interval_ms = 0",
            "default_max_iterations = 101",
            "[scoring]\nmagnitude = -1.0",
            "[scoring]\noffset = 1.5",
        ] {
            assert!(LabConfig::from_toml_str(doc).is_err(), "accepted {doc:?}");
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TICK_MS, "50"),
            (ENV_SEED, "123"),
            (ENV_LOG_JSON, "1"),
            (ENV_LOG_LEVEL, "debug"),
        ]
        .into_iter()
        .collect();
        let mut config = LabConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .expect("apply");
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.seed, Some(123));
        assert!(config.log.json);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut config = LabConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_TICK_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TICK_MS));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agentlab.toml");
        std::fs::write(&path, "default_max_iterations = 25\n").expect("write");
        let config = LabConfig::from_file(&path).expect("load");
        assert_eq!(config.default_max_iterations, 25);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            LabConfig::from_file(&missing).unwrap_err(),
            LabError::Io(_)
        ));
    }
}
