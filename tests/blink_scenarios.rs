use blink_monitor::blink::{BlinkState, BlinkStateMachine};
use blink_monitor::frame::Frame;
use blink_monitor::landmarks::{EyeRegion, FaceLandmarks, Point};
use blink_monitor::pipeline::{BlinkPipeline, DetectorConfig, SkipReason, TickOutcome};
use blink_monitor::sampler::LuminanceSampler;
use blink_monitor::window::{LuminanceSample, SlidingWindow};
use blink_monitor::BlinkError;

fn filled(value: u8) -> SlidingWindow {
    let mut window = SlidingWindow::with_capacity(100).unwrap();
    for _ in 0..100 {
        window.push(LuminanceSample::new(value));
    }
    window
}

#[test]
fn it_edge_trigger_counts_once_on_reopen() {
    let mut window = filled(100);
    let mut machine = BlinkStateMachine::default();

    let mut transitions = Vec::new();
    for (i, v) in [160_u8, 160, 80].into_iter().enumerate() {
        let state = window.push(LuminanceSample::new(v));
        let eval = machine.evaluate(&state, i as f64 * 33.0).unwrap();
        transitions.push((eval.previous, eval.state, eval.blink_completed));
    }

    assert_eq!(
        transitions,
        vec![
            (BlinkState::Open, BlinkState::Closed, false),
            (BlinkState::Closed, BlinkState::Closed, false),
            (BlinkState::Closed, BlinkState::Open, true),
        ]
    );
    assert_eq!(machine.count(), 1);
}

#[test]
fn it_baseline_fifty_blink_scenario() {
    let mut pipeline = BlinkPipeline::new(DetectorConfig::default()).unwrap();
    for i in 0..100 {
        pipeline.tick_sample(Some(50.0), f64::from(i) * 33.0);
    }
    assert_eq!(pipeline.threshold(), Some(75.0));

    let closed = pipeline.tick_sample(Some(90.0), 3300.0);
    assert_eq!(closed.evaluation().unwrap().state, BlinkState::Closed);
    assert_eq!(pipeline.blink_count(), 0);

    let opened = pipeline.tick_sample(Some(40.0), 3333.0);
    let eval = opened.evaluation().unwrap();
    assert_eq!(eval.state, BlinkState::Open);
    assert!(eval.blink_completed);
    assert_eq!(pipeline.blink_count(), 1);
    assert_eq!(eval.blink.unwrap().closed_for_ms, 33.0);
}

#[test]
fn it_zero_width_region_leaves_window_unchanged() {
    let (w, h) = (64_u32, 48_u32);
    let pixels = vec![128_u8; (w * h * 4) as usize];
    let frame = Frame::rgba(w, h, &pixels).unwrap();

    let err = LuminanceSampler::default()
        .sample(&frame, &EyeRegion::new(10.0, 10.0, 0.0, 4.0))
        .unwrap_err();
    assert!(matches!(err, BlinkError::InvalidRegion(_)));

    // 右眼宽度为 0 的人脸
    let mut points = vec![Point::new(20.0, 20.0); 68];
    points[43] = Point::new(30.0, 20.0);
    points[44] = Point::new(30.0, 20.0);
    points[47] = Point::new(30.0, 24.0);
    let face = FaceLandmarks::new(points).unwrap();

    let mut pipeline = BlinkPipeline::new(DetectorConfig::default()).unwrap();
    pipeline.tick_sample(Some(60.0), 0.0);
    let outcome = pipeline.tick(Some((&frame, &face)), 33.0);
    assert_eq!(outcome, TickOutcome::Skipped(SkipReason::InvalidRegion));
    assert_eq!(pipeline.window().len(), 1);
}

#[test]
fn it_noisy_signal_near_threshold_can_flicker() {
    // 无迟滞：阈值附近来回穿越会重复计数
    let mut pipeline = BlinkPipeline::new(DetectorConfig {
        window_size: 10,
        threshold_multiplier: 1.0,
        ..DetectorConfig::default()
    })
    .unwrap();
    for i in 0..10 {
        pipeline.tick_sample(Some(100.0), f64::from(i));
    }
    for (i, v) in [101.0, 99.0, 101.0, 99.0].into_iter().enumerate() {
        pipeline.tick_sample(Some(v), 10.0 + i as f64);
    }
    assert_eq!(pipeline.blink_count(), 2);
}
