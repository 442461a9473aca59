//! Feedback engine: the mailbox loop around the state machine
//!
//! All inputs (button edges, session outcomes, speech activity, timer
//! expiries) arrive through one mpsc channel and are applied to the
//! machine by this single task, so no transition can interleave with
//! another. Session begin/end run in spawned tasks: the transport may
//! block, and it must never stall event delivery.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::{EngineEvent, StateEvent};
use crate::feedback::{startup_pattern, FeedbackRenderer, Indicator};
use crate::session::{SessionEvent, SessionFacade, SessionTransport};
use crate::state::{Effect, FeedbackState, Machine};
use crate::timer::{TimerRegistry, TimerSlot};

/// Engine mailbox capacity
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives the feedback state machine from merged event streams
pub struct Engine {
    machine: Machine,
    timers: TimerRegistry,
    renderer: FeedbackRenderer,
    facade: Arc<SessionFacade>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
    session_tx: mpsc::Sender<SessionEvent>,
    session_rx: Option<mpsc::Receiver<SessionEvent>>,
    state_tx: broadcast::Sender<StateEvent>,
    session_started_at: Option<Instant>,
}

impl Engine {
    /// Wire an engine around a transport and an indicator
    pub fn new(
        config: &Config,
        transport: Arc<dyn SessionTransport>,
        indicator: Arc<dyn Indicator>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (session_tx, session_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            machine: Machine::new(config.clone()),
            timers: TimerRegistry::new(),
            renderer: FeedbackRenderer::new(indicator),
            facade: Arc::new(SessionFacade::new(transport)),
            events_tx,
            events_rx,
            session_tx,
            session_rx: Some(session_rx),
            state_tx,
            session_started_at: None,
        }
    }

    /// Sender for feeding events into the mailbox
    pub fn event_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.events_tx.clone()
    }

    /// Subscribe to committed state transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.state_tx.subscribe()
    }

    /// Run the mailbox loop until shutdown or channel closure
    pub async fn run(mut self) {
        info!("feedback engine started");

        // Startup indicator self-test; the first real render replaces it
        self.renderer.apply(startup_pattern()).await;

        // Pump transport events into the mailbox, preserving order
        let pump = self.session_rx.take().map(|mut session_rx| {
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = session_rx.recv().await {
                    let mapped = match event {
                        SessionEvent::UserSpoke => EngineEvent::UserSpoke,
                        SessionEvent::AgentSpoke => EngineEvent::AgentSpoke,
                        SessionEvent::Failed { message } => EngineEvent::SessionFailed(message),
                    };
                    if events_tx.send(mapped).await.is_err() {
                        break;
                    }
                }
            })
        });

        while let Some(event) = self.events_rx.recv().await {
            debug!(%event, "engine event");

            if event == EngineEvent::Shutdown {
                self.shutdown().await;
                break;
            }

            // The transport already considers the session dead; drop
            // the handle so end() is not attempted against it.
            if matches!(event, EngineEvent::SessionFailed(_)) {
                self.facade.forget().await;
            }

            let previous = self.machine.state();
            let effects = self.machine.handle(event);
            self.perform(effects).await;
            self.announce(previous);
        }

        if let Some(pump) = pump {
            pump.abort();
        }
        info!("feedback engine stopped");
    }

    /// Execute the effects of a committed transition
    async fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render(pattern) => self.renderer.apply(pattern).await,

                Effect::Arm { slot, duration } => {
                    let events_tx = self.events_tx.clone();
                    self.timers.arm(slot, duration, move || {
                        forward_timer_fire(events_tx, slot);
                    });
                }

                Effect::Cancel { slot } => {
                    self.timers.cancel(slot);
                }

                Effect::StartSession => {
                    let facade = Arc::clone(&self.facade);
                    let events_tx = self.events_tx.clone();
                    let session_tx = self.session_tx.clone();
                    tokio::spawn(async move {
                        let outcome = match facade.begin(session_tx).await {
                            Ok(()) => EngineEvent::SessionStarted,
                            Err(e) => EngineEvent::SessionStartFailed(e.to_string()),
                        };
                        let _ = events_tx.send(outcome).await;
                    });
                }

                Effect::EndSession => {
                    let facade = Arc::clone(&self.facade);
                    let events_tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        let outcome = match facade.end().await {
                            Ok(()) => EngineEvent::SessionEnded,
                            Err(e) => EngineEvent::SessionEndFailed(e.to_string()),
                        };
                        let _ = events_tx.send(outcome).await;
                    });
                }
            }
        }
    }

    /// Broadcast a state event if the transition changed state
    fn announce(&mut self, previous: FeedbackState) {
        let current = self.machine.state();
        if current == previous {
            return;
        }

        let event = match current {
            FeedbackState::Starting => {
                self.session_started_at = Some(Instant::now());
                StateEvent::SessionStarting
            }
            FeedbackState::Listening => StateEvent::SessionActive,
            FeedbackState::UserSpeaking => StateEvent::UserSpeaking,
            FeedbackState::AgentSpeaking => StateEvent::AgentSpeaking,
            FeedbackState::Ending => StateEvent::SessionEnding,
            FeedbackState::Idle => StateEvent::SessionClosed {
                duration_ms: self
                    .session_started_at
                    .take()
                    .map(|t| t.elapsed().as_millis() as u64)
                    .unwrap_or(0),
            },
            FeedbackState::Error => StateEvent::SessionError {
                message: self.machine.last_error().unwrap_or_default().to_string(),
            },
        };

        debug!(%event, "state event");
        let _ = self.state_tx.send(event);
    }

    /// Cancel timers, end the session, and darken the indicator
    ///
    /// Runs inline so nothing outlives the engine: by the time `run`
    /// returns, no timer or pattern task remains.
    async fn shutdown(&mut self) {
        info!("engine shutting down");

        let was_active = self.machine.shutdown();
        self.timers.cancel_all();

        if was_active {
            if let Err(e) = self.facade.end().await {
                warn!(error = %e, "session close failed during shutdown");
            }
        }
        self.renderer.stop().await;

        if let Some(started) = self.session_started_at.take() {
            let _ = self.state_tx.send(StateEvent::SessionClosed {
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }
    }
}

/// Forward a timer expiry into the mailbox
///
/// Sends from a task: a momentarily full mailbox delays the fire
/// instead of losing it, so a speaking state never loses its pending
/// reversion.
fn forward_timer_fire(events_tx: mpsc::Sender<EngineEvent>, slot: TimerSlot) {
    tokio::spawn(async move {
        if events_tx.send(EngineEvent::TimerFired(slot)).await.is_err() {
            debug!(%slot, "engine stopped, timer fire dropped");
        }
    });
}
