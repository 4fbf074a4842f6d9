//! Engine configuration loaded from TOML.
//!
//! ```toml
//! [engine]
//! run_history = 64
//! state_dir = "/var/lib/candlewick"
//!
//! [refresh.5m]
//! start_offset = "6h"
//! end_offset = "5m"
//! schedule_interval = "5m"
//! ```
//!
//! When no `[refresh]` table is present every timeframe runs with its
//! default policy. Otherwise only the listed timeframes are enabled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use candlewick_types::Timeframe;
use serde::Deserialize;

use crate::{ConfigError, RefreshPolicy, parse_duration};

/// Default number of runs kept per timeframe.
pub const DEFAULT_RUN_HISTORY: usize = 64;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    engine: RawEngine,
    #[serde(default)]
    refresh: BTreeMap<String, RawPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEngine {
    run_history: Option<usize>,
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicy {
    start_offset: String,
    end_offset: String,
    schedule_interval: String,
}

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Runs kept per timeframe in the history.
    pub run_history: usize,
    /// Archive directory; platform default when absent.
    pub state_dir: Option<PathBuf>,
    /// Enabled timeframes and their policies.
    pub policies: BTreeMap<Timeframe, RefreshPolicy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_history: DEFAULT_RUN_HISTORY,
            state_dir: None,
            policies: Timeframe::all()
                .iter()
                .map(|tf| (*tf, RefreshPolicy::default_for(*tf)))
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, names an unknown
    /// timeframe, or carries an invalid policy.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let run_history = raw.engine.run_history.unwrap_or(DEFAULT_RUN_HISTORY);
        if run_history == 0 {
            return Err(ConfigError::EmptyHistory);
        }

        let policies = if raw.refresh.is_empty() {
            Self::default().policies
        } else {
            let mut policies = BTreeMap::new();
            for (name, settings) in raw.refresh {
                let timeframe: Timeframe = name.parse()?;
                let policy = Self::parse_policy(&settings)
                    .map_err(|source| ConfigError::Policy { timeframe, source })?;
                policies.insert(timeframe, policy);
            }
            policies
        };

        Ok(Self {
            run_history,
            state_dir: raw.engine.state_dir,
            policies,
        })
    }

    fn parse_policy(settings: &RawPolicy) -> Result<RefreshPolicy, crate::PolicyError> {
        RefreshPolicy::new(
            parse_duration(&settings.start_offset)?,
            parse_duration(&settings.end_offset)?,
            parse_duration(&settings.schedule_interval)?,
        )
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), timeframes = config.policies.len(), "loaded engine config");
        Ok(config)
    }

    /// Returns the policy for a timeframe, if enabled.
    #[must_use]
    pub fn policy(&self, timeframe: Timeframe) -> Option<&RefreshPolicy> {
        self.policies.get(&timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyError;
    use chrono::TimeDelta;

    #[test]
    fn test_default_enables_every_timeframe() {
        let config = EngineConfig::default();
        assert_eq!(config.policies.len(), 6);
        assert_eq!(config.run_history, DEFAULT_RUN_HISTORY);
        let daily = config.policy(Timeframe::Day1).unwrap();
        assert_eq!(daily.start_offset(), TimeDelta::days(30));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_parse_selected_timeframes() {
        let config = EngineConfig::from_toml_str(
            r#"
            [engine]
            run_history = 8
            state_dir = "/tmp/candles"

            [refresh.1m]
            start_offset = "90m"
            end_offset = "30s"
            schedule_interval = "30s"

            [refresh.h4]
            start_offset = "2d"
            end_offset = "4h"
            schedule_interval = "1h"
            "#,
        )
        .unwrap();

        assert_eq!(config.run_history, 8);
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/candles")));
        assert_eq!(config.policies.len(), 2);
        let minute = config.policy(Timeframe::Minute1).unwrap();
        assert_eq!(minute.start_offset(), TimeDelta::minutes(90));
        assert_eq!(minute.end_offset(), TimeDelta::seconds(30));
        assert!(config.policy(Timeframe::Hour4).is_some());
        assert!(config.policy(Timeframe::Day1).is_none());
    }

    #[test]
    fn test_invalid_policy_is_reported() {
        let err = EngineConfig::from_toml_str(
            r#"
            [refresh.5m]
            start_offset = "5m"
            end_offset = "10m"
            schedule_interval = "5m"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy {
                timeframe: Timeframe::Minute5,
                source: PolicyError::EndNotBeforeStart { .. }
            }
        ));
    }

    #[test]
    fn test_oversized_offset_is_rejected() {
        let err = EngineConfig::from_toml_str(
            "[refresh.1m]\nstart_offset = \"1000000000d\"\nend_offset = \"1m\"\nschedule_interval = \"1m\"\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy {
                timeframe: Timeframe::Minute1,
                source: PolicyError::TooLarge(_)
            }
        ));
    }

    #[test]
    fn test_unknown_timeframe_and_fields() {
        let err = EngineConfig::from_toml_str(
            "[refresh.30m]\nstart_offset = \"1h\"\nend_offset = \"0s\"\nschedule_interval = \"1m\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Timeframe(_)));

        let err = EngineConfig::from_toml_str("[engine]\nworkers = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EngineConfig::from_toml_str("[engine]\nrun_history = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHistory));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("candlewick.toml");
        std::fs::write(&path, "[engine]\nrun_history = 3\n").unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap().run_history, 3);
        assert!(matches!(
            EngineConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
