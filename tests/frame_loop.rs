#![cfg(feature = "server")]

mod common;

use std::time::Duration;

use uuid::Uuid;

use blink_monitor::config::SyntheticConfig;
use blink_monitor::pipeline::{BlinkPipeline, DetectorConfig};
use blink_monitor::runner::{ControlCommand, FrameLoop, ResetScope};
use blink_monitor::source::{SyntheticSource, TraceSource};

use common::app::{spawn_with, test_config};

const LOOP_DEADLINE: Duration = Duration::from_secs(10);

fn trace_text() -> String {
    let mut lines = vec!["50"; 10];
    lines.extend(["-", "140", "140", "50", "50", "150", "45"]);
    lines.join("\n")
}

#[tokio::test]
async fn it_trace_replay_publishes_blinks_and_telemetry() {
    let app = spawn_with(test_config(10, 4));
    let mut events = app.state.subscribe_events();
    let telemetry_rx = app.state.telemetry_rx();

    let pipeline = BlinkPipeline::new(app.config.detector).unwrap();
    let source = TraceSource::parse(&trace_text(), 64, 48).unwrap();
    let frame_loop = FrameLoop::new(
        pipeline,
        Box::new(source),
        Duration::from_millis(1),
        app.state.session_id(),
    );

    let summary = tokio::time::timeout(LOOP_DEADLINE, frame_loop.run(app.channels))
        .await
        .expect("loop finishes when trace is exhausted");

    assert_eq!(summary.ticks, 17);
    assert_eq!(summary.blinks, 2);

    let telemetry = telemetry_rx.borrow().clone();
    assert_eq!(telemetry.blink_count, 2);
    assert_eq!(telemetry.frames_skipped, 1);
    assert_eq!(telemetry.frames_processed, 16);
    assert!(telemetry.warmed_up);

    let first = events.recv().await.expect("first blink");
    let second = events.recv().await.expect("second blink");
    assert_eq!(first.event.count, 1);
    assert_eq!(second.event.count, 2);
    assert_eq!(first.session_id, app.state.session_id());
}

#[tokio::test]
async fn it_shutdown_stops_endless_source() {
    let app = spawn_with(test_config(20, 4));
    let pipeline = BlinkPipeline::new(DetectorConfig {
        window_size: 20,
        ..DetectorConfig::default()
    })
    .unwrap();
    let source = SyntheticSource::new(SyntheticConfig {
        width: 64,
        height: 48,
        blink_period_frames: 10,
        blink_length_frames: 2,
        face_loss_rate: 0.0,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let frame_loop = FrameLoop::new(
        pipeline,
        Box::new(source),
        Duration::from_millis(1),
        Uuid::new_v4(),
    );

    let mut telemetry_rx = app.state.telemetry_rx();
    let handle = tokio::spawn(frame_loop.run(app.channels));

    // 等到至少有一次眨眼
    tokio::time::timeout(LOOP_DEADLINE, async {
        loop {
            telemetry_rx.changed().await.expect("loop alive");
            if telemetry_rx.borrow().blink_count >= 1 {
                break;
            }
        }
    })
    .await
    .expect("synthetic source produces a blink");

    app.shutdown_tx.send(()).expect("loop subscribed to shutdown");
    let summary = tokio::time::timeout(LOOP_DEADLINE, handle)
        .await
        .expect("loop stops after shutdown")
        .expect("loop task joined");
    assert!(summary.blinks >= 1);
    assert!(summary.ticks >= 20);
}

#[tokio::test]
async fn it_reset_command_applies_between_ticks() {
    let app = spawn_with(test_config(10, 4));
    let control = app.state.control().clone();
    let mut telemetry_rx = app.state.telemetry_rx();

    let pipeline = BlinkPipeline::new(app.config.detector).unwrap();
    let source = SyntheticSource::new(SyntheticConfig {
        width: 64,
        height: 48,
        blink_period_frames: 12,
        blink_length_frames: 2,
        face_loss_rate: 0.0,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let frame_loop = FrameLoop::new(
        pipeline,
        Box::new(source),
        Duration::from_millis(1),
        Uuid::new_v4(),
    );
    let handle = tokio::spawn(frame_loop.run(app.channels));

    tokio::time::timeout(LOOP_DEADLINE, async {
        loop {
            telemetry_rx.changed().await.expect("loop alive");
            if telemetry_rx.borrow().warmed_up {
                break;
            }
        }
    })
    .await
    .expect("window warms up");

    control
        .send(ControlCommand::Reset(ResetScope::All))
        .await
        .expect("loop accepts commands");

    tokio::time::timeout(LOOP_DEADLINE, async {
        loop {
            telemetry_rx.changed().await.expect("loop alive");
            if !telemetry_rx.borrow().warmed_up {
                break;
            }
        }
    })
    .await
    .expect("reset empties the window");

    app.shutdown_tx.send(()).expect("shutdown");
    handle.await.expect("loop task joined");
}
