use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name -> value mapping produced by snapshot callbacks.
pub type Snapshot = serde_json::Map<String, Value>;

/// Custom rendering of aggregated metric values.
pub type Formatter = Arc<dyn Fn(f64) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    #[default]
    Info,
    Warn,
    Error,
}

/// Payload of a single component event.
///
/// `throttle_ms` of `None` means the context default.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEvent {
    pub event: String,
    pub detail: Option<Value>,
    pub level: LogLevel,
    pub throttle_ms: Option<f64>,
    pub group: bool,
}

impl ComponentEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            detail: None,
            level: LogLevel::Info,
            throttle_ms: None,
            group: true,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn throttle_ms(mut self, throttle_ms: Option<f64>) -> Self {
        self.throttle_ms = throttle_ms;
        self
    }

    pub fn flat(mut self) -> Self {
        self.group = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderCycle {
    pub duration_ms: f64,
    pub render_count: u64,
    pub props: Option<Snapshot>,
    pub state: Option<Snapshot>,
    pub metrics: Option<Snapshot>,
    pub throttle_ms: Option<f64>,
}

#[derive(Clone, Default)]
pub struct MetricOptions {
    pub units: Option<String>,
    pub throttle_ms: Option<f64>,
    pub sample_size: Option<u32>,
    pub formatter: Option<Formatter>,
}

impl MetricOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn throttle_ms(mut self, throttle_ms: f64) -> Self {
        self.throttle_ms = Some(throttle_ms);
        self
    }

    pub fn sample_size(mut self, sample_size: u32) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    pub fn formatter(mut self, formatter: impl Fn(f64) -> Value + Send + Sync + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }
}

impl fmt::Debug for MetricOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricOptions")
            .field("units", &self.units)
            .field("throttle_ms", &self.throttle_ms)
            .field("sample_size", &self.sample_size)
            .field("formatter", &self.formatter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One emission as handed to a [`LogSink`](super::recorder::LogSink).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub component: String,
    pub event: String,
    /// `[Component] event`
    pub message: String,
    pub detail: Option<Value>,
    pub grouped: bool,
    pub at_ms: f64,
}

/// Rounds to two decimal places, the default rendering for timings.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Non-finite numbers have no JSON form and become `null`.
pub fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Object values become a snapshot as-is; anything else yields an empty one.
pub fn snapshot_of(value: Value) -> Snapshot {
    match value {
        Value::Object(map) => map,
        _ => Snapshot::new(),
    }
}
