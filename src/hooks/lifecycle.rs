use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::telemetry::event::{ComponentEvent, RenderCycle, Snapshot};
use crate::telemetry::Telemetry;

/// Produces a snapshot on demand. An `Err` is reported and treated as
/// "no snapshot".
pub type SnapshotProducer = Box<dyn Fn() -> anyhow::Result<Snapshot>>;

#[derive(Default)]
pub struct ComponentOptions {
    pub props_snapshot: Option<SnapshotProducer>,
    pub state_snapshot: Option<SnapshotProducer>,
    pub metrics_snapshot: Option<SnapshotProducer>,
    pub track_values: Option<SnapshotProducer>,
    pub throttle_ms: Option<f64>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(mut self, producer: impl Fn() -> anyhow::Result<Snapshot> + 'static) -> Self {
        self.props_snapshot = Some(Box::new(producer));
        self
    }

    pub fn state(mut self, producer: impl Fn() -> anyhow::Result<Snapshot> + 'static) -> Self {
        self.state_snapshot = Some(Box::new(producer));
        self
    }

    pub fn metrics(mut self, producer: impl Fn() -> anyhow::Result<Snapshot> + 'static) -> Self {
        self.metrics_snapshot = Some(Box::new(producer));
        self
    }

    pub fn track_values(mut self, producer: impl Fn() -> anyhow::Result<Snapshot> + 'static) -> Self {
        self.track_values = Some(Box::new(producer));
        self
    }

    pub fn throttle_ms(mut self, throttle_ms: f64) -> Self {
        self.throttle_ms = Some(throttle_ms);
        self
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("props_snapshot", &self.props_snapshot.is_some())
            .field("state_snapshot", &self.state_snapshot.is_some())
            .field("metrics_snapshot", &self.metrics_snapshot.is_some())
            .field("track_values", &self.track_values.is_some())
            .field("throttle_ms", &self.throttle_ms)
            .finish()
    }
}

/// Old and new value of one tracked field. `None` means the field was absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Value>,
}

/// Field-by-field comparison over the union of both key sets.
pub fn diff_tracked_values(previous: &Snapshot, next: &Snapshot) -> BTreeMap<String, ValueChange> {
    previous
        .keys()
        .chain(next.keys())
        .filter_map(|key| {
            let before = previous.get(key);
            let after = next.get(key);
            (before != after).then(|| {
                (
                    key.clone(),
                    ValueChange {
                        previous: before.cloned(),
                        next: after.cloned(),
                    },
                )
            })
        })
        .collect()
}

/// Lifecycle telemetry for one component instance.
///
/// The host calls [`begin_render`](Self::begin_render) at the start of every
/// render, [`commit`](Self::commit) once the render is committed, and
/// [`unmount`](Self::unmount) when the instance goes away. For a given
/// instance `mount` is logged before any `render`, and `unmount` last.
pub struct ComponentInstrumentation {
    telemetry: Telemetry,
    name: String,
    options: ComponentOptions,
    registers_manual: bool,
    render_count: u64,
    render_started_at: f64,
    mounted: bool,
    // only armed when the mount itself was logged
    unmount_armed: bool,
    previous_values: Snapshot,
}

impl ComponentInstrumentation {
    /// For components that instrument themselves. The name is recorded so
    /// auto-instrumentation leaves the component alone.
    pub fn new(telemetry: &Telemetry, name: &str) -> Self {
        Self::build(telemetry, name, true)
    }

    /// For wrappers that instrument some other component from the outside.
    pub(crate) fn external(telemetry: &Telemetry, name: &str) -> Self {
        Self::build(telemetry, name, false)
    }

    fn build(telemetry: &Telemetry, name: &str, registers_manual: bool) -> Self {
        Self {
            telemetry: telemetry.clone(),
            name: name.to_string(),
            options: ComponentOptions::default(),
            registers_manual,
            render_count: 0,
            render_started_at: 0.0,
            mounted: false,
            unmount_armed: false,
            previous_values: Snapshot::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Start of a render. Options apply to the matching `commit`.
    pub fn begin_render(&mut self, options: ComponentOptions) {
        self.render_count += 1;
        self.render_started_at = self.telemetry.now();
        self.options = options;

        if self.registers_manual {
            self.telemetry.register_manual_instrumentation(&self.name);
        }
    }

    pub fn commit(&mut self) {
        if !self.mounted {
            self.mounted = true;
            self.log_mount();
        }
        self.log_render();
        self.log_value_changes();
    }

    /// Logs `unmount` once, and only if `mount` was logged.
    pub fn unmount(&mut self) {
        if !self.unmount_armed {
            return;
        }
        self.unmount_armed = false;
        self.telemetry.log_component_event(
            &self.name,
            ComponentEvent::new("unmount").throttle_ms(self.options.throttle_ms),
        );
    }

    fn log_mount(&mut self) {
        if !self.telemetry.is_logging_enabled() {
            return;
        }

        let props = self.capture(self.options.props_snapshot.as_ref(), "props");
        let mut event = ComponentEvent::new("mount").throttle_ms(self.options.throttle_ms);
        if let Some(props) = props {
            event = event.with_detail(json!({ "props": props }));
        }
        self.telemetry.log_component_event(&self.name, event);
        self.unmount_armed = true;
    }

    fn log_render(&self) {
        if !self.telemetry.is_logging_enabled() {
            return;
        }

        let duration_ms = self.telemetry.now() - self.render_started_at;
        let state = self.capture(self.options.state_snapshot.as_ref(), "state");
        let props = self.capture(self.options.props_snapshot.as_ref(), "props");
        let metrics = self.capture(self.options.metrics_snapshot.as_ref(), "metrics");

        self.telemetry.log_render_cycle(
            &self.name,
            RenderCycle {
                duration_ms,
                render_count: self.render_count,
                props,
                state,
                metrics,
                throttle_ms: self.options.throttle_ms,
            },
        );
    }

    fn log_value_changes(&mut self) {
        if !self.telemetry.is_logging_enabled() || self.options.track_values.is_none() {
            return;
        }

        let next = self
            .capture(self.options.track_values.as_ref(), "tracked-values")
            .unwrap_or_default();
        let changes = diff_tracked_values(&self.previous_values, &next);
        self.previous_values = next;

        if changes.is_empty() {
            return;
        }
        let detail = serde_json::to_value(&changes).unwrap_or(Value::Null);
        self.telemetry.log_component_event(
            &self.name,
            ComponentEvent::new("value-change")
                .with_detail(detail)
                .throttle_ms(self.options.throttle_ms),
        );
    }

    fn capture(&self, producer: Option<&SnapshotProducer>, kind: &str) -> Option<Snapshot> {
        let producer = producer?;
        match producer() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.telemetry.sink().warn(
                    &format!("failed to capture {kind} snapshot for {}", self.name),
                    &format!("{e:#}"),
                );
                None
            }
        }
    }
}

impl fmt::Debug for ComponentInstrumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstrumentation")
            .field("name", &self.name)
            .field("render_count", &self.render_count)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}
