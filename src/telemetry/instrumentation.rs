use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};

use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::time::{Clock, SystemClock};

use super::event::{number, round2, ComponentEvent, LogRecord, MetricOptions, RenderCycle, Snapshot};
use super::metrics::MetricBuffers;
use super::recorder::{LogSink, TracingSink};
use super::state::{decode_flag, encode_flag, PreferenceStore, TelemetryBridge};
use super::throttle::LogThrottle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    enabled: AtomicBool,
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LogSink>,
    store: Option<Arc<dyn PreferenceStore>>,
    throttle: Mutex<LogThrottle>,
    metrics: Mutex<MetricBuffers>,
    manual: Mutex<HashSet<String>>,
    excluded: Mutex<HashSet<String>>,
}

/// Telemetry context for one application session.
///
/// Cloning is cheap and every clone shares the same flag, throttle table,
/// metric buffers and registries. Create one at startup and hand it to
/// whatever needs to report.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

pub struct TelemetryBuilder {
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LogSink>,
    store: Option<Arc<dyn PreferenceStore>>,
}

impl TelemetryBuilder {
    pub fn config(mut self, config: TelemetryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolves the enabled flag: configured default first, then any stored
    /// preference. An unreadable store counts as "no preference".
    pub fn build(self) -> Telemetry {
        let mut enabled = self.config.enabled_by_default;

        if let Some(store) = &self.store {
            match store.read(&self.config.storage_key) {
                Ok(Some(stored)) => enabled = decode_flag(&stored),
                Ok(None) => {}
                Err(e) => self
                    .sink
                    .warn("unable to read logging preference", &e.to_string()),
            }
        }

        let excluded = self.config.excluded_components.iter().cloned().collect();

        Telemetry {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(enabled),
                config: self.config,
                clock: self.clock,
                sink: self.sink,
                store: self.store,
                throttle: Mutex::new(LogThrottle::new()),
                metrics: Mutex::new(MetricBuffers::new()),
                manual: Mutex::new(HashSet::new()),
                excluded: Mutex::new(excluded),
            }),
        }
    }
}

impl Telemetry {
    pub fn builder() -> TelemetryBuilder {
        TelemetryBuilder {
            config: TelemetryConfig::default(),
            clock: Arc::new(SystemClock::new()),
            sink: Arc::new(TracingSink),
            store: None,
        }
    }

    pub fn new(config: TelemetryConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.inner.config
    }

    pub fn now(&self) -> f64 {
        self.inner.clock.now_ms()
    }

    pub(crate) fn sink(&self) -> &dyn LogSink {
        self.inner.sink.as_ref()
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Updates the flag, then persists it when asked to.
    ///
    /// The in-memory flag changes even if the write fails; the failure is
    /// reported to the sink and returned.
    pub fn set_logging_enabled(&self, value: bool, persist: bool) -> Result<(), TelemetryError> {
        self.inner.enabled.store(value, Ordering::SeqCst);

        if !persist {
            return Ok(());
        }
        let Some(store) = &self.inner.store else {
            return Ok(());
        };

        store
            .write(&self.inner.config.storage_key, encode_flag(value))
            .map_err(|e| {
                self.inner
                    .sink
                    .warn("failed to persist logging preference", &e.to_string());
                e
            })
    }

    pub fn bridge(&self) -> TelemetryBridge {
        TelemetryBridge::new(self.clone())
    }

    pub fn log_component_event(&self, component: &str, payload: ComponentEvent) {
        if !self.is_logging_enabled() {
            return;
        }

        let now = self.now();
        let throttle_ms = payload
            .throttle_ms
            .unwrap_or(self.inner.config.default_throttle_ms);

        let allowed = lock(&self.inner.throttle).should_log(component, &payload.event, now, throttle_ms);
        if !allowed {
            return;
        }

        let record = LogRecord {
            level: payload.level,
            component: component.to_string(),
            message: format!("[{component}] {}", payload.event),
            event: payload.event,
            detail: Some(payload.detail.unwrap_or_else(|| Value::Object(Snapshot::new()))),
            grouped: payload.group,
            at_ms: now,
        };
        self.inner.sink.emit(&record);
    }

    pub fn log_render_cycle(&self, component: &str, payload: RenderCycle) {
        if !self.is_logging_enabled() {
            return;
        }

        let mut detail = Snapshot::new();
        detail.insert("durationMs".into(), number(round2(payload.duration_ms)));
        detail.insert("renderCount".into(), Value::from(payload.render_count));
        if let Some(props) = payload.props {
            detail.insert("props".into(), Value::Object(props));
        }
        if let Some(state) = payload.state {
            detail.insert("state".into(), Value::Object(state));
        }
        if let Some(metrics) = payload.metrics {
            detail.insert("metrics".into(), Value::Object(metrics));
        }

        self.log_component_event(
            component,
            ComponentEvent::new("render")
                .with_detail(Value::Object(detail))
                .throttle_ms(payload.throttle_ms),
        );
    }

    /// Feeds one sample into the `(component, metric)` buffer.
    ///
    /// Most calls only buffer. A `metric:<metric>` event is emitted once
    /// `sample_size` samples are held or `throttle_ms` passed since the last
    /// flush.
    pub fn record_metric(&self, component: &str, metric: &str, value: f64, options: &MetricOptions) {
        if !self.is_logging_enabled() {
            return;
        }

        let config = &self.inner.config;
        let throttle_ms = options.throttle_ms.unwrap_or(config.default_throttle_ms);
        let sample_size = options.sample_size.unwrap_or(config.default_sample_size).max(1);
        let now = self.now();

        let summary =
            lock(&self.inner.metrics).record(component, metric, value, now, throttle_ms, sample_size);
        let Some(summary) = summary else {
            return;
        };

        let format = |v: f64| match &options.formatter {
            Some(formatter) => formatter(v),
            None => number(round2(v)),
        };
        let detail = json!({
            "samples": summary.samples,
            "average": format(summary.average),
            "min": format(summary.min),
            "max": format(summary.max),
            "units": options.units.as_deref().unwrap_or("ms"),
        });

        self.log_component_event(
            component,
            ComponentEvent::new(format!("metric:{metric}"))
                .with_detail(detail)
                .throttle_ms(Some(throttle_ms)),
        );
    }

    pub fn create_duration_tracker(
        &self,
        component: &str,
        metric: &str,
        options: MetricOptions,
    ) -> DurationTracker {
        DurationTracker {
            telemetry: self.clone(),
            component: component.to_string(),
            metric: metric.to_string(),
            options,
            started_at: self.now(),
        }
    }

    /// Bumps `version` and reports it under `event`.
    pub fn track_mutation(
        &self,
        component: &str,
        version: &mut MutationVersion,
        event: &str,
        throttle_ms: Option<f64>,
    ) -> u64 {
        version.0 += 1;
        self.log_component_event(
            component,
            ComponentEvent::new(event)
                .with_detail(json!({ "version": version.0 }))
                .throttle_ms(throttle_ms),
        );
        version.0
    }

    /// Marks `name` as instrumenting itself. Idempotent.
    pub fn register_manual_instrumentation(&self, name: &str) {
        let mut manual = lock(&self.inner.manual);
        if !manual.contains(name) {
            manual.insert(name.to_string());
        }
    }

    pub fn is_component_manually_instrumented(&self, name: &str) -> bool {
        lock(&self.inner.manual).contains(name)
    }

    pub fn exclude_from_auto_instrumentation(&self, name: &str) {
        lock(&self.inner.excluded).insert(name.to_string());
    }

    pub fn is_excluded_from_auto_instrumentation(&self, name: &str) -> bool {
        lock(&self.inner.excluded).contains(name)
    }

    /// Samples currently waiting in a metric buffer.
    pub fn pending_samples(&self, component: &str, metric: &str) -> u32 {
        lock(&self.inner.metrics)
            .get(component, metric)
            .map(|record| record.count)
            .unwrap_or(0)
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.is_logging_enabled())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Stopwatch that reports one metric sample when stopped.
#[must_use = "a tracker records nothing until `stop` is called"]
pub struct DurationTracker {
    telemetry: Telemetry,
    component: String,
    metric: String,
    options: MetricOptions,
    started_at: f64,
}

impl DurationTracker {
    pub fn elapsed_ms(&self) -> f64 {
        self.telemetry.now() - self.started_at
    }

    /// Records the elapsed time as exactly one sample and returns it.
    pub fn stop(self) -> f64 {
        let elapsed = self.elapsed_ms();
        self.telemetry
            .record_metric(&self.component, &self.metric, elapsed, &self.options);
        elapsed
    }
}

impl fmt::Debug for DurationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurationTracker")
            .field("component", &self.component)
            .field("metric", &self.metric)
            .field("started_at", &self.started_at)
            .finish()
    }
}

/// Caller-owned version counter for [`Telemetry::track_mutation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationVersion(pub u64);
