//! Fixed-cadence frame loop.
//!
//! The loop is the only owner of the [`BlinkPipeline`]. Observers get
//! snapshots over channels, and reset commands are queued on an mpsc channel
//! and applied between ticks, so detector state is never shared.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::blink::BlinkEvent;
use crate::frame::PixelFormat;
use crate::pipeline::{BlinkPipeline, TickOutcome};
use crate::source::{FrameSource, SourceError};
use crate::telemetry::Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetScope {
    /// 只清零眨眼计数
    Count,
    /// 清空窗口、状态与计数
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reset(ResetScope),
}

/// Blink event as published to subscribers of the running service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkNotification {
    pub session_id: Uuid,
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BlinkEvent,
}

/// Loop-side ends of the channels shared with the HTTP layer.
pub struct LoopChannels {
    pub telemetry_tx: watch::Sender<Telemetry>,
    pub events_tx: broadcast::Sender<BlinkNotification>,
    pub control_rx: mpsc::Receiver<ControlCommand>,
    pub shutdown_rx: broadcast::Receiver<()>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub blinks: u64,
    pub source_errors: u64,
}

pub struct FrameLoop {
    pipeline: BlinkPipeline,
    source: Box<dyn FrameSource>,
    tick: Duration,
    session_id: Uuid,
    started_at: Instant,
}

impl FrameLoop {
    pub fn new(
        pipeline: BlinkPipeline,
        source: Box<dyn FrameSource>,
        tick: Duration,
        session_id: Uuid,
    ) -> Self {
        Self {
            pipeline,
            source,
            tick,
            session_id,
            started_at: Instant::now(),
        }
    }

    /// Runs until shutdown is signalled or the source runs dry.
    pub async fn run(mut self, channels: LoopChannels) -> LoopSummary {
        let LoopChannels {
            telemetry_tx,
            events_tx,
            mut control_rx,
            mut shutdown_rx,
        } = channels;

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = LoopSummary::default();
        self.started_at = Instant::now();

        tracing::info!(
            source = self.source.name(),
            tick_ms = self.tick.as_millis() as u64,
            session_id = %self.session_id,
            "frame loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("frame loop received shutdown");
                    break;
                }
                Some(cmd) = control_rx.recv() => {
                    self.apply(cmd);
                    telemetry_tx.send_replace(self.pipeline.telemetry());
                }
                _ = interval.tick() => {
                    match self.step() {
                        Ok(Some(outcome)) => {
                            summary.ticks += 1;
                            if let Some(event) = outcome.evaluation().and_then(|e| e.blink) {
                                summary.blinks += 1;
                                // 没有订阅者时发送失败属于正常情况
                                let _ = events_tx.send(BlinkNotification {
                                    session_id: self.session_id,
                                    observed_at: Utc::now(),
                                    event,
                                });
                            }
                            telemetry_tx.send_replace(self.pipeline.telemetry());
                        }
                        Ok(None) => {
                            tracing::info!(ticks = summary.ticks, "frame source exhausted");
                            break;
                        }
                        Err(e) => {
                            summary.source_errors += 1;
                            tracing::warn!(error = %e, "frame capture failed, skipping tick");
                        }
                    }
                }
            }
        }

        tracing::info!(
            ticks = summary.ticks,
            blinks = summary.blinks,
            count = self.pipeline.blink_count(),
            "frame loop stopped"
        );
        summary
    }

    /// Captures and processes one frame.
    pub fn step(&mut self) -> Result<Option<TickOutcome>, SourceError> {
        let Some(captured) = self.source.capture()? else {
            return Ok(None);
        };
        let timestamp_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;

        let outcome = self.pipeline.tick_pixels(
            &captured.pixels,
            captured.width,
            captured.height,
            PixelFormat::Rgba,
            captured.landmarks.as_ref(),
            timestamp_ms,
        );
        Ok(Some(outcome))
    }

    pub fn pipeline(&self) -> &BlinkPipeline {
        &self.pipeline
    }

    fn apply(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::Reset(ResetScope::Count) => self.pipeline.reset_count(),
            ControlCommand::Reset(ResetScope::All) => self.pipeline.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DetectorConfig;
    use crate::source::TraceSource;

    fn trace_loop(trace: &str, window_size: usize) -> FrameLoop {
        let pipeline = BlinkPipeline::new(DetectorConfig {
            window_size,
            ..DetectorConfig::default()
        })
        .unwrap();
        let source = TraceSource::parse(trace, 64, 48).unwrap();
        FrameLoop::new(pipeline, Box::new(source), Duration::from_millis(1), Uuid::new_v4())
    }

    #[test]
    fn step_feeds_pipeline_until_exhausted() {
        let mut frame_loop = trace_loop("50\n50\n50\n-\n120\n40\n", 3);
        let mut outcomes = Vec::new();
        while let Some(outcome) = frame_loop.step().unwrap() {
            outcomes.push(outcome);
        }
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes[5].blink_completed());
        assert_eq!(frame_loop.pipeline().blink_count(), 1);
        assert_eq!(frame_loop.pipeline().frames_skipped(), 1);
    }

    #[test]
    fn reset_commands_apply_to_pipeline() {
        let mut frame_loop = trace_loop("50\n50\n50\n120\n40\n", 3);
        while frame_loop.step().unwrap().is_some() {}
        assert_eq!(frame_loop.pipeline().blink_count(), 1);

        frame_loop.apply(ControlCommand::Reset(ResetScope::Count));
        assert_eq!(frame_loop.pipeline().blink_count(), 0);
        assert!(frame_loop.pipeline().window().is_full());

        frame_loop.apply(ControlCommand::Reset(ResetScope::All));
        assert!(frame_loop.pipeline().window().is_empty());
    }
}
