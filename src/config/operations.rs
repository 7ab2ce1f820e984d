//! Settings loading, validation, and utility operations.

use super::model::Settings;
use crate::error::{GateError, Result};
use std::path::Path;
use std::time::Duration;

impl Settings {
    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load settings from `path` if it exists, otherwise use the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        let settings: Settings = if yaml.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                GateError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            GateError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate values and return an error on invalid ones.
    ///
    /// Validation rules:
    /// - `lock_dir` must be non-empty
    /// - `default_lock_timeout_secs` must be positive
    /// - `default_max_lock_count` must be positive
    /// - `poll_interval_ms` must be positive and shorter than the default lease
    pub fn validate(&self) -> Result<()> {
        if self.lock_dir.as_os_str().is_empty() {
            return Err(GateError::InvalidConfig(
                "lock_dir must not be empty".to_string(),
            ));
        }

        if self.default_lock_timeout_secs == 0 {
            return Err(GateError::InvalidConfig(
                "default_lock_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.default_max_lock_count == 0 {
            return Err(GateError::InvalidConfig(
                "default_max_lock_count must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(GateError::InvalidConfig(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval_ms >= self.default_lock_timeout_secs.saturating_mul(1000) {
            return Err(GateError::InvalidConfig(format!(
                "poll_interval_ms ({}) must be shorter than the default lease ({}s)",
                self.poll_interval_ms, self.default_lock_timeout_secs
            )));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
