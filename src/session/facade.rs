//! Thin adapter owning the session handle
//!
//! Serializes begin/end against the handle slot so a repeated request
//! while already in the target state is a no-op outcome, not a second
//! transport call.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use super::transport::{SessionError, SessionEvent, SessionHandle, SessionTransport};

/// Facade over the conversational transport
pub struct SessionFacade {
    transport: Arc<dyn SessionTransport>,
    handle: Mutex<Option<SessionHandle>>,
}

impl SessionFacade {
    /// Wrap a transport
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self {
            transport,
            handle: Mutex::new(None),
        }
    }

    /// Open a session and retain its handle
    ///
    /// Idempotent: if a session is already live the call succeeds
    /// without touching the transport.
    pub async fn begin(&self, events: mpsc::Sender<SessionEvent>) -> Result<(), SessionError> {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            warn!("begin requested while session already active, ignoring");
            return Ok(());
        }

        let handle = self.transport.begin(events).await?;
        info!(?handle, "session opened");
        *slot = Some(handle);
        Ok(())
    }

    /// Close the current session, if any
    ///
    /// The handle is dropped before the transport result is inspected:
    /// a failed end must never strand the session as active.
    pub async fn end(&self) -> Result<(), SessionError> {
        let handle = {
            let mut slot = self.handle.lock().await;
            slot.take()
        };

        match handle {
            Some(handle) => {
                let result = self.transport.end(handle).await;
                match &result {
                    Ok(()) => info!(?handle, "session closed"),
                    Err(e) => warn!(?handle, error = %e, "session close failed"),
                }
                result
            }
            None => {
                warn!("end requested with no active session, ignoring");
                Ok(())
            }
        }
    }

    /// Drop the handle without calling the transport
    ///
    /// Used when the transport itself reported the session as failed.
    pub async fn forget(&self) {
        let mut slot = self.handle.lock().await;
        if slot.take().is_some() {
            info!("session handle discarded after transport failure");
        }
    }

    /// Whether a session handle is currently held
    pub async fn is_active(&self) -> bool {
        self.handle.lock().await.is_some()
    }
}
