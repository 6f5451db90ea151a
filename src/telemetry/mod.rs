//! Client-side render and event telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a diagnostic side-effect layer. It must **NEVER** change what
//! the application renders or does, and no failure inside it may reach the
//! caller as a panic. The worst outcome is a dropped diagnostic event.
//!
//! # COST INVARIANT
//! With the flag off, every logging entry point returns after one atomic load:
//! no snapshots, no bookkeeping, no output.

pub mod event;
pub mod global;
pub mod instrumentation;
pub mod metrics;
pub mod recorder;
pub mod state;
pub mod throttle;

pub use event::{snapshot_of, ComponentEvent, LogLevel, LogRecord, MetricOptions, RenderCycle, Snapshot};
pub use instrumentation::{DurationTracker, MutationVersion, Telemetry, TelemetryBuilder};
pub use recorder::{LogSink, TelemetryRecorder, TracingSink};
pub use state::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, TelemetryBridge};
