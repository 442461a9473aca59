//! parley-daemon: push-button voice assistant front-end
//!
//! Polls a physical button, drives a conversational session through
//! the transport boundary, and mirrors the session phase on an LED:
//! - Debounced rising-edge detection over a 50 ms button poll
//! - Timer-governed feedback state machine (single mailbox task)
//! - Pattern renderer with one continuous animation task at a time
//!
//! The GPIO button, LED driver, and conversational transport are
//! capabilities behind traits; this binary wires in development
//! stand-ins (keyboard presses, log-traced frames, simulated speech).

mod button;
mod config;
mod engine;
mod events;
mod feedback;
mod lifecycle;
mod session;
mod state;
mod timer;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::button::{ButtonPoller, SharedButton};
use crate::config::Config;
use crate::engine::Engine;
use crate::events::EngineEvent;
use crate::feedback::LogIndicator;
use crate::lifecycle::ShutdownSignal;
use crate::session::{SessionEvent, SimulatedTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "parley-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(?config, "configuration loaded");

    // Development stand-ins for the hardware and transport boundaries
    let button = SharedButton::new();
    let indicator = Arc::new(LogIndicator);
    let transport = Arc::new(
        SimulatedTransport::new()
            .with_event(Duration::from_secs(2), SessionEvent::UserSpoke)
            .with_event(Duration::from_secs(4), SessionEvent::AgentSpoke),
    );

    // Create the engine and its input channels
    let engine = Engine::new(&config, transport, indicator);
    let events_tx = engine.event_sender();
    let mut state_rx = engine.subscribe();

    // Start the button polling loop
    let poller = ButtonPoller::new(
        Arc::new(button.clone()),
        config.poll_interval,
        events_tx.clone(),
    )
    .spawn();

    // Keyboard stand-in for the physical button: each input line is
    // one press (level high for two polling periods, then released)
    let keyboard = tokio::spawn({
        let button = button.clone();
        let hold = config.poll_interval * 2;
        async move {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            info!("press Enter to toggle the conversation");
            while let Ok(Some(_)) = lines.next_line().await {
                button.press();
                tokio::time::sleep(hold).await;
                button.release();
            }
        }
    });

    // Log committed state transitions
    let observer = tokio::spawn(async move {
        loop {
            match state_rx.recv().await {
                Ok(event) => info!(%event, "session state"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "state event receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("daemon initialized, entering main loop");

    let mut engine_task = tokio::spawn(engine.run());
    let mut shutdown = ShutdownSignal::new()?;

    tokio::select! {
        _ = shutdown.wait() => {
            info!("shutdown signal received");
            let _ = events_tx.send(EngineEvent::Shutdown).await;
            if let Err(e) = (&mut engine_task).await {
                warn!(?e, "engine task failed during shutdown");
            }
        }
        result = &mut engine_task => {
            if let Err(e) = result {
                warn!(?e, "engine task exited abnormally");
            }
        }
    }

    // Cleanup
    info!("shutting down...");
    poller.abort();
    keyboard.abort();
    observer.abort();

    info!("parley-daemon stopped");

    Ok(())
}
