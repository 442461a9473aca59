//! Transport capability trait and session boundary types

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Opaque identifier for an active session
///
/// Only the facade holds one; the state machine tracks liveness with a
/// plain boolean and never inspects the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Wrap a transport-assigned session id
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Speech-activity and failure events delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A user transcript fragment arrived
    UserSpoke,
    /// An agent response fragment arrived
    AgentSpoke,
    /// The transport lost the session
    Failed {
        /// Failure description
        message: String,
    },
}

/// Failures surfaced at the session boundary
///
/// All transport faults are caught here and handed to the state
/// machine as typed outcomes, never as panics.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("session begin failed: {0}")]
    BeginFailed(String),

    #[error("session end failed: {0}")]
    EndFailed(String),
}

/// Capability exposed by whatever conversational transport is wired in
///
/// `begin` hands the transport a sender for the lifetime of the
/// returned handle; the transport pushes [`SessionEvent`]s through it
/// until `end` is called or the session fails.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Open a session, delivering events through `events`
    async fn begin(
        &self,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<SessionHandle, SessionError>;

    /// Close a previously opened session
    async fn end(&self, handle: SessionHandle) -> Result<(), SessionError>;
}
