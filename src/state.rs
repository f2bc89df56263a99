use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::config::Config;
use crate::runner::{BlinkNotification, ControlCommand, LoopChannels};
use crate::telemetry::Telemetry;

/// Control commands queued ahead of the frame loop.
const CONTROL_QUEUE_CAPACITY: usize = 8;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    session_id: Uuid,
    telemetry_rx: watch::Receiver<Telemetry>,
    events_tx: broadcast::Sender<BlinkNotification>,
    control_tx: mpsc::Sender<ControlCommand>,
    shutdown_tx: broadcast::Sender<()>,
    sse_connections: Arc<AtomicUsize>,
    started_at: Instant,
}

impl AppState {
    /// Wires the HTTP side and returns the channel ends the frame loop owns.
    pub fn new(
        config: &Config,
        session_id: Uuid,
        shutdown_tx: broadcast::Sender<()>,
    ) -> (Self, LoopChannels) {
        let (telemetry_tx, telemetry_rx) =
            watch::channel(Telemetry::empty(config.detector.window_size));
        let (events_tx, _) = broadcast::channel(config.telemetry.event_channel_capacity);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);

        let channels = LoopChannels {
            telemetry_tx,
            events_tx: events_tx.clone(),
            control_rx,
            shutdown_rx: shutdown_tx.subscribe(),
        };

        let state = Self {
            config: Arc::new(config.clone()),
            session_id,
            telemetry_rx,
            events_tx,
            control_tx,
            shutdown_tx,
            sse_connections: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        };
        (state, channels)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Latest snapshot published by the frame loop.
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry_rx.borrow().clone()
    }

    pub fn telemetry_rx(&self) -> watch::Receiver<Telemetry> {
        self.telemetry_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BlinkNotification> {
        self.events_tx.subscribe()
    }

    pub fn control(&self) -> &mpsc::Sender<ControlCommand> {
        &self.control_tx
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn sse_connections(&self) -> &Arc<AtomicUsize> {
        &self.sse_connections
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
