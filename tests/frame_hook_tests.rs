mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use common::{detail_f64, harness};
use folio_telemetry::hooks::{FrameInstrumentation, FrameOptions};

fn single_sample() -> FrameOptions {
    FrameOptions {
        sample_size: Some(1),
        throttle_ms: Some(0.0),
        ..FrameOptions::default()
    }
}

#[test]
fn test_disabled_wrapper_is_transparent() {
    let h = harness(false);
    let mut calls = 0;

    let mut frame = FrameInstrumentation::new(
        &h.telemetry,
        "Background",
        |delta: f64| {
            calls += 1;
            delta * 2.0
        },
        single_sample(),
    );

    assert_eq!(frame.call(8.0), 16.0, "Return value passes through");
    assert_eq!(frame.call(1.5), 3.0);
    drop(frame);

    assert_eq!(calls, 2);
    assert!(h.recorder.is_empty());
}

#[test]
fn test_frame_duration_is_recorded() {
    let h = harness(true);
    let clock = h.clock.clone();

    let mut frame = FrameInstrumentation::new(
        &h.telemetry,
        "Background",
        move |work_ms: f64| clock.advance(work_ms),
        single_sample(),
    );
    frame.call(3.456);

    let records = h.recorder.events_named("metric:frame");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].component, "Background");
    assert_eq!(detail_f64(&records[0], "average"), 3.46, "Frame timings use two decimals");
    assert_eq!(
        records[0].detail.as_ref().and_then(|d| d.get("units")),
        Some(&serde_json::json!("ms"))
    );
}

#[test]
fn test_interval_skips_first_frame() {
    let h = harness(true);
    let options = FrameOptions {
        metric_name: "grid".to_string(),
        track_interval: true,
        ..single_sample()
    };
    let mut frame = FrameInstrumentation::new(&h.telemetry, "HexGrid", |_: ()| {}, options);

    frame.call(());
    assert!(
        h.recorder.events_named("metric:grid:interval").is_empty(),
        "No previous frame to measure against"
    );

    h.clock.advance(16.7);
    frame.call(());

    let intervals = h.recorder.events_named("metric:grid:interval");
    assert_eq!(intervals.len(), 1);
    assert_eq!(detail_f64(&intervals[0], "average"), 16.7);
    assert_eq!(h.recorder.events_named("metric:grid").len(), 2);
}

#[test]
fn test_panicking_callback_still_records() {
    let h = harness(true);
    let clock = h.clock.clone();

    let mut frame = FrameInstrumentation::new(
        &h.telemetry,
        "Background",
        move |_: ()| {
            clock.advance(5.0);
            panic!("shader compile failed");
        },
        single_sample(),
    );

    let outcome: std::thread::Result<()> = catch_unwind(AssertUnwindSafe(|| frame.call(())));
    assert!(outcome.is_err(), "The panic still propagates");

    let records = h.recorder.events_named("metric:frame");
    assert_eq!(records.len(), 1);
    assert_eq!(detail_f64(&records[0], "average"), 5.0);
}

#[test]
fn test_toggle_mid_stream_changes_behaviour() {
    let h = harness(false);
    let mut frame = FrameInstrumentation::new(&h.telemetry, "Background", |_: ()| {}, single_sample());

    frame.call(());
    assert!(h.recorder.is_empty());

    h.telemetry.set_logging_enabled(true, false).unwrap();
    frame.call(());
    assert_eq!(h.recorder.events_named("metric:frame").len(), 1);
}

#[tokio::test]
async fn test_frame_loop_on_runtime_interval() {
    let h = harness(true);
    let clock = h.clock.clone();
    let mut frame = FrameInstrumentation::new(
        &h.telemetry,
        "Background",
        move |_: ()| clock.advance(2.0),
        FrameOptions {
            sample_size: Some(5),
            ..FrameOptions::default()
        },
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(1));
    for _ in 0..12 {
        ticker.tick().await;
        frame.call(());
        h.clock.advance(250.0);
    }

    // Two full windows of five, two samples pending.
    let records = h.recorder.events_named("metric:frame");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| detail_f64(r, "samples") == 5.0));
    assert_eq!(h.telemetry.pending_samples("Background", "frame"), 2);
}
