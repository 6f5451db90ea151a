//! Process-wide telemetry context.
//!
//! Nothing is installed until [`install`] is called; before that every
//! forwarding function is a no-op and the flag reads as disabled.

use std::sync::OnceLock;

use crate::error::TelemetryError;

use super::event::{ComponentEvent, MetricOptions, RenderCycle};
use super::instrumentation::{DurationTracker, Telemetry};
use super::state::TelemetryBridge;

static GLOBAL: OnceLock<Telemetry> = OnceLock::new();

pub fn install(telemetry: Telemetry) -> Result<(), TelemetryError> {
    GLOBAL
        .set(telemetry)
        .map_err(|_| TelemetryError::AlreadyInstalled)
}

pub fn get() -> Option<&'static Telemetry> {
    GLOBAL.get()
}

/// The console switch of the installed context.
pub fn bridge() -> Option<TelemetryBridge> {
    get().map(Telemetry::bridge)
}

pub fn is_logging_enabled() -> bool {
    get().is_some_and(Telemetry::is_logging_enabled)
}

pub fn set_logging_enabled(value: bool, persist: bool) -> Result<(), TelemetryError> {
    match get() {
        Some(telemetry) => telemetry.set_logging_enabled(value, persist),
        None => Ok(()),
    }
}

pub fn log_component_event(component: &str, payload: ComponentEvent) {
    if let Some(telemetry) = get() {
        telemetry.log_component_event(component, payload);
    }
}

pub fn log_render_cycle(component: &str, payload: RenderCycle) {
    if let Some(telemetry) = get() {
        telemetry.log_render_cycle(component, payload);
    }
}

pub fn record_metric(component: &str, metric: &str, value: f64, options: &MetricOptions) {
    if let Some(telemetry) = get() {
        telemetry.record_metric(component, metric, value, options);
    }
}

pub fn create_duration_tracker(
    component: &str,
    metric: &str,
    options: MetricOptions,
) -> Option<DurationTracker> {
    get().map(|telemetry| telemetry.create_duration_tracker(component, metric, options))
}
