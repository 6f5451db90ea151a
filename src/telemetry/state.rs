use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::TelemetryError;

use super::instrumentation::Telemetry;

/// Durable key/value storage for the enabled preference.
pub trait PreferenceStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, TelemetryError>;
    fn write(&self, key: &str, value: &str) -> Result<(), TelemetryError>;
}

pub(crate) fn encode_flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

pub(crate) fn decode_flag(stored: &str) -> bool {
    stored == "1"
}

/// Store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn read(&self, key: &str) -> Result<Option<String>, TelemetryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| TelemetryError::StorageUnavailable("preference map poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TelemetryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TelemetryError::StorageUnavailable("preference map poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self, key: &str) -> Result<BTreeMap<String, String>, TelemetryError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(TelemetryError::Storage {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn read(&self, key: &str) -> Result<Option<String>, TelemetryError> {
        Ok(self.load(key)?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TelemetryError> {
        let mut entries = self.load(key)?;
        entries.insert(key.to_string(), value.to_string());

        let storage_err = |source: std::io::Error| TelemetryError::Storage {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let body = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, body).map_err(storage_err)
    }
}

/// Live switch for a running session.
///
/// Every clone controls the same context; the flag it reports is always the
/// current one.
#[derive(Clone)]
pub struct TelemetryBridge {
    telemetry: Telemetry,
}

impl TelemetryBridge {
    pub(crate) fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }

    pub fn enable(&self) -> Result<(), TelemetryError> {
        self.set_enabled(true, true)
    }

    pub fn disable(&self) -> Result<(), TelemetryError> {
        self.set_enabled(false, true)
    }

    /// Flips the flag and returns the new value. The flip happens even when
    /// persisting it fails.
    pub fn toggle(&self) -> Result<bool, TelemetryError> {
        let next = !self.telemetry.is_logging_enabled();
        self.set_enabled(next, true).map(|()| next)
    }

    pub fn set_enabled(&self, value: bool, persist: bool) -> Result<(), TelemetryError> {
        self.telemetry.set_logging_enabled(value, persist)
    }

    pub fn get_enabled(&self) -> bool {
        self.telemetry.is_logging_enabled()
    }

    pub fn enabled(&self) -> bool {
        self.get_enabled()
    }
}

impl std::fmt::Debug for TelemetryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBridge")
            .field("enabled", &self.enabled())
            .finish()
    }
}
