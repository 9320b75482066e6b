use std::path::Path;

use serde::{Deserialize, Serialize};

use prep_core::policy::AssessmentPolicy;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Service settings, read from an optional TOML file.
///
/// ```toml
/// [policy]
/// pass_threshold = 60
/// auto_advance_millis = 1000
///
/// [retry]
/// max_attempts = 5
/// base_delay_ms = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesConfig {
    pub policy: AssessmentPolicy,
    pub retry: RetryPolicy,
}

impl ServicesConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for invalid TOML or unknown keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads the file at `path`, or returns defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServicesConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServicesConfig::default());
    }

    #[test]
    fn sections_override_independently() {
        let config = ServicesConfig::from_toml_str(
            "[policy]\npass_threshold = 60\n\n[retry]\nmax_attempts = 5\n",
        )
        .unwrap();
        assert_eq!(config.policy.pass_threshold.percent(), 60);
        assert_eq!(config.policy.practice_question_secs, 120);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(200));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ServicesConfig::from_toml_str("[policy]\npass_mark = 1\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(ServicesConfig::from_toml_str("[policy]\npass_threshold = 101\n").is_err());
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(ServicesConfig::load(None).unwrap(), ServicesConfig::default());
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = ServicesConfig::load(Some(Path::new("/nonexistent/prep.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/prep.toml"));
    }
}
