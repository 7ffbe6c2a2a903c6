// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration, loadable from RON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use orrery_jobs::PropagationMode;
use serde::{Deserialize, Serialize};

/// Errors loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The text is not a valid configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One aspect to instantiate by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectConfig {
    /// Name known to the aspect factory.
    pub name: String,
    /// Higher runs first.
    #[serde(default)]
    pub priority: f32,
}

impl AspectConfig {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, priority: f32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

/// Configuration for the [`AspectEngine`](crate::AspectEngine).
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler worker threads; `0` runs jobs on the ticking thread.
    pub worker_threads: usize,
    /// Aspects created by name when the engine is built from config.
    pub aspects: Vec<AspectConfig>,
    /// Target tick rate used when `paced` is set.
    pub tick_rate_hz: u32,
    /// Sleep between ticks to hold `tick_rate_hz`.
    pub paced: bool,
    /// World-transform propagation strategy.
    pub propagation: PropagationMode,
}

/// Available parallelism minus one (the ticking thread), at least one.
pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            aspects: vec![AspectConfig::new("logic", 10.0), AspectConfig::new("transform", 0.0)],
            tick_rate_hz: 60,
            paced: false,
            propagation: PropagationMode::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a RON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text)?;
        log::info!("EngineConfig: loaded {}", path.display());
        Ok(config)
    }

    /// Builder-style override of the worker count.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be greater than 0".into()));
        }
        if let Some(bad) = self.aspects.iter().find(|a| a.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "aspect name must not be empty (priority {})",
                bad.priority
            )));
        }
        if let Some(bad) = self.aspects.iter().find(|a| !a.priority.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "aspect '{}' has a non-finite priority",
                bad.name
            )));
        }
        Ok(())
    }

    /// The duration of one tick at `tick_rate_hz`.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EngineConfig::from_ron_str("(worker_threads: 3, propagation: per_level)").unwrap();
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.propagation, PropagationMode::PerLevel);
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.aspects.len(), 2);
        assert!(!config.paced);
    }

    #[test]
    fn aspects_list_replaces_default() {
        let config = EngineConfig::from_ron_str(r#"(aspects: [(name: "transform")])"#).unwrap();
        assert_eq!(config.aspects, vec![AspectConfig::new("transform", 0.0)]);
    }

    #[test]
    fn zero_tick_rate_is_invalid() {
        let err = EngineConfig::from_ron_str("(tick_rate_hz: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn syntax_error_is_a_parse_error() {
        let err = EngineConfig::from_ron_str("(worker_threads: \"many\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(tick_rate_hz: 30, paced: true)").unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.tick_rate_hz, 30);
        assert!(config.paced);
        assert_eq!(config.tick_duration(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_path(dir.path().join("absent.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_has_at_least_one_worker() {
        assert!(EngineConfig::default().worker_threads >= 1);
    }
}
