use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, info, info_span, warn};

use super::event::{LogLevel, LogRecord};

const MAX_EVENTS: usize = 10_000;

/// Destination for telemetry output.
///
/// `emit` only ever sees records that passed the enabled gate and the
/// throttle. `warn` carries problems of the telemetry layer itself and is
/// never gated.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);

    fn warn(&self, message: &str, cause: &str) {
        warn!(target: "folio_telemetry", cause, "[telemetry] {message}");
    }
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    fn write(record: &LogRecord) {
        let detail = record
            .detail
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        let component = record.component.as_str();
        let event = record.event.as_str();
        let message = record.message.as_str();

        match record.level {
            LogLevel::Log => debug!(target: "folio_telemetry", component, event, detail = %detail, "{message}"),
            LogLevel::Info => info!(target: "folio_telemetry", component, event, detail = %detail, "{message}"),
            LogLevel::Warn => warn!(target: "folio_telemetry", component, event, detail = %detail, "{message}"),
            LogLevel::Error => error!(target: "folio_telemetry", component, event, detail = %detail, "{message}"),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        if record.grouped {
            let span = info_span!(target: "folio_telemetry", "telemetry_group", message = %record.message);
            let _entered = span.enter();
            Self::write(record);
        } else {
            Self::write(record);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub cause: String,
}

/// In-memory sink keeping the most recent records.
#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: Mutex<VecDeque<LogRecord>>,
    warnings: Mutex<Vec<Warning>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(64)),
            warnings: Mutex::new(Vec::new()),
        }
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<LogRecord>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn warning_list(&self) -> MutexGuard<'_, Vec<Warning>> {
        self.warnings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.buffer().iter().cloned().collect()
    }

    /// Records of one event name, in emission order.
    pub fn events_named(&self, event: &str) -> Vec<LogRecord> {
        self.buffer()
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }

    pub fn events_for(&self, component: &str) -> Vec<LogRecord> {
        self.buffer()
            .iter()
            .filter(|r| r.component == component)
            .cloned()
            .collect()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warning_list().clone()
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    pub fn clear(&self) {
        self.buffer().clear();
        self.warning_list().clear();
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TelemetryRecorder {
    fn emit(&self, record: &LogRecord) {
        let mut buffer = self.buffer();
        if buffer.len() >= MAX_EVENTS {
            buffer.pop_front();
        }
        buffer.push_back(record.clone());
    }

    fn warn(&self, message: &str, cause: &str) {
        self.warning_list().push(Warning {
            message: message.to_string(),
            cause: cause.to_string(),
        });
    }
}
