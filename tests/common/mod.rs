#![allow(dead_code)]

use std::sync::Arc;

use folio_telemetry::telemetry::{LogRecord, TelemetryRecorder};
use folio_telemetry::time::ManualClock;
use folio_telemetry::{Telemetry, TelemetryConfig};

pub struct Harness {
    pub telemetry: Telemetry,
    pub clock: Arc<ManualClock>,
    pub recorder: Arc<TelemetryRecorder>,
}

pub fn harness(enabled: bool) -> Harness {
    harness_with(TelemetryConfig {
        enabled_by_default: enabled,
        ..TelemetryConfig::default()
    })
}

pub fn harness_with(config: TelemetryConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(10_000.0));
    let recorder = Arc::new(TelemetryRecorder::new());
    let telemetry = Telemetry::builder()
        .config(config)
        .clock(clock.clone())
        .sink(recorder.clone())
        .build();
    Harness {
        telemetry,
        clock,
        recorder,
    }
}

pub fn detail_f64(record: &LogRecord, field: &str) -> f64 {
    record
        .detail
        .as_ref()
        .and_then(|d| d.get(field))
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN)
}
