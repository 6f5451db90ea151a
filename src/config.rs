use std::path::Path;

use serde::Deserialize;

use crate::error::TelemetryError;

pub const ENABLE_LOGS_ENV: &str = "FOLIO_ENABLE_LOGS";
pub const CONFIG_PATH_ENV: &str = "FOLIO_TELEMETRY_CONFIG";

pub const DEFAULT_STORAGE_KEY: &str = "portfolio:telemetry:enabled";
pub const DEFAULT_THROTTLE_MS: f64 = 1200.0;
pub const DEFAULT_SAMPLE_SIZE: u32 = 45;
pub const AUTO_THROTTLE_MS: f64 = 2000.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Value of the enabled flag before any stored preference is consulted.
    pub enabled_by_default: bool,
    pub storage_key: String,
    pub default_throttle_ms: f64,
    pub default_sample_size: u32,
    /// Throttle applied by auto-instrumented wrappers.
    pub auto_throttle_ms: f64,
    pub excluded_components: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_throttle_ms: DEFAULT_THROTTLE_MS,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
            auto_throttle_ms: AUTO_THROTTLE_MS,
            excluded_components: Vec::new(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, TelemetryError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TelemetryError::Storage {
            key: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults, then the optional JSON file named by `FOLIO_TELEMETRY_CONFIG`,
    /// then `FOLIO_ENABLE_LOGS=true` as the build-time enable switch.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };

        if let Ok(flag) = std::env::var(ENABLE_LOGS_ENV) {
            config.enabled_by_default = flag == "true";
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.storage_key.trim().is_empty() {
            return Err(TelemetryError::Config("storage_key must not be empty".into()));
        }
        if !(self.default_throttle_ms >= 0.0) || !(self.auto_throttle_ms >= 0.0) {
            return Err(TelemetryError::Config(
                "throttle intervals must be non-negative numbers".into(),
            ));
        }
        if self.default_sample_size == 0 {
            return Err(TelemetryError::Config(
                "default_sample_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
