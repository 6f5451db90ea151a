use crate::telemetry::event::{number, round2, MetricOptions};
use crate::telemetry::{DurationTracker, Telemetry};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOptions {
    pub metric_name: String,
    pub throttle_ms: Option<f64>,
    pub sample_size: Option<u32>,
    /// Also report the gap between consecutive frames as `<metric>:interval`.
    pub track_interval: bool,
    pub units: String,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            metric_name: "frame".to_string(),
            throttle_ms: None,
            sample_size: None,
            track_interval: false,
            units: "ms".to_string(),
        }
    }
}

impl FrameOptions {
    fn metric_options(&self) -> MetricOptions {
        MetricOptions {
            units: Some(self.units.clone()),
            throttle_ms: self.throttle_ms,
            sample_size: self.sample_size,
            formatter: None,
        }
        .formatter(|value| number(round2(value)))
    }
}

/// Stops the tracker when dropped, so a panicking callback still yields
/// its sample.
struct StopOnDrop(Option<DurationTracker>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if let Some(tracker) = self.0.take() {
            tracker.stop();
        }
    }
}

/// A per-frame callback that reports its own duration.
///
/// Calling it behaves exactly like calling the wrapped callback. Register the
/// wrapper once with the frame scheduler and keep it for the life of the
/// component.
pub struct FrameInstrumentation<F> {
    telemetry: Telemetry,
    component: String,
    callback: F,
    options: FrameOptions,
    metric_options: MetricOptions,
    interval_metric: String,
    last_frame_at: Option<f64>,
}

impl<F> FrameInstrumentation<F> {
    pub fn new(telemetry: &Telemetry, component: &str, callback: F, options: FrameOptions) -> Self {
        Self {
            telemetry: telemetry.clone(),
            component: component.to_string(),
            callback,
            metric_options: options.metric_options(),
            interval_metric: format!("{}:interval", options.metric_name),
            options,
            last_frame_at: None,
        }
    }

    pub fn options(&self) -> &FrameOptions {
        &self.options
    }

    pub fn into_inner(self) -> F {
        self.callback
    }

    pub fn call<A, R>(&mut self, args: A) -> R
    where
        F: FnMut(A) -> R,
    {
        if !self.telemetry.is_logging_enabled() {
            return (self.callback)(args);
        }

        if self.options.track_interval {
            let now = self.telemetry.now();
            if let Some(last) = self.last_frame_at {
                self.telemetry.record_metric(
                    &self.component,
                    &self.interval_metric,
                    now - last,
                    &self.metric_options,
                );
            }
            self.last_frame_at = Some(now);
        }

        let _stop = StopOnDrop(Some(self.telemetry.create_duration_tracker(
            &self.component,
            &self.options.metric_name,
            self.metric_options.clone(),
        )));
        (self.callback)(args)
    }
}

impl<F> std::fmt::Debug for FrameInstrumentation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameInstrumentation")
            .field("component", &self.component)
            .field("options", &self.options)
            .field("last_frame_at", &self.last_frame_at)
            .finish()
    }
}
