//! Polling loop that samples the button source at a fixed period
//!
//! Runs as a dedicated tokio task, mirroring the hardware reality of a
//! GPIO level poll. Read failures are the driver's concern; the source
//! only ever reports a boolean level.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::events::EngineEvent;

use super::edge::EdgeDetector;

/// Capability trait for reading the raw button level
///
/// Implemented by the GPIO driver out of tree; `true` means pressed.
pub trait ButtonSource: Send + Sync + 'static {
    /// Read the current level
    fn is_pressed(&self) -> bool;
}

/// In-memory button backed by an atomic flag
///
/// Used for development wiring (keyboard-driven presses) and tests.
#[derive(Debug, Clone, Default)]
pub struct SharedButton {
    level: Arc<AtomicBool>,
}

impl SharedButton {
    /// Create a released button
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the level high
    pub fn press(&self) {
        self.level.store(true, Ordering::SeqCst);
    }

    /// Drive the level low
    pub fn release(&self) {
        self.level.store(false, Ordering::SeqCst);
    }
}

impl ButtonSource for SharedButton {
    fn is_pressed(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

/// Samples a [`ButtonSource`] at a fixed period and emits press events
pub struct ButtonPoller {
    source: Arc<dyn ButtonSource>,
    poll_interval: Duration,
    events_tx: mpsc::Sender<EngineEvent>,
}

impl ButtonPoller {
    /// Create a poller feeding the engine channel
    pub fn new(
        source: Arc<dyn ButtonSource>,
        poll_interval: Duration,
        events_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            source,
            poll_interval,
            events_tx,
        }
    }

    /// Spawn the polling task
    ///
    /// The task exits when the engine channel closes.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(poll_interval = ?self.poll_interval, "button poller started");

            let mut detector = EdgeDetector::new();
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if detector.sample(self.source.is_pressed()).is_some() {
                    debug!("button press detected");
                    if self.events_tx.send(EngineEvent::ButtonPressed).await.is_err() {
                        break;
                    }
                }
            }

            info!("button poller stopped");
        })
    }
}
