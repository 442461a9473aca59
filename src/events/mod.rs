//! Event types flowing through the feedback engine
//!
//! `EngineEvent` is the engine's mailbox input: button edges, session
//! lifecycle outcomes, speech activity, and timer expiries all funnel
//! into one channel so transitions never interleave. `StateEvent` is
//! the broadcast notification emitted after each committed transition.

use serde::{Deserialize, Serialize};

use crate::timer::TimerSlot;

/// Inputs consumed by the feedback state machine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Debounced rising edge from the physical button
    ButtonPressed,

    /// `begin()` on the session transport succeeded
    SessionStarted,

    /// `begin()` on the session transport failed
    SessionStartFailed(String),

    /// `end()` on the session transport completed
    SessionEnded,

    /// `end()` on the session transport failed
    SessionEndFailed(String),

    /// Transcript activity: the user spoke
    UserSpoke,

    /// Response activity: the agent spoke
    AgentSpoke,

    /// The transport lost the session mid-flight
    SessionFailed(String),

    /// A registry timer expired for the given slot
    TimerFired(TimerSlot),

    /// Graceful shutdown request
    Shutdown,
}

impl std::fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::ButtonPressed => write!(f, "ButtonPressed"),
            EngineEvent::SessionStarted => write!(f, "SessionStarted"),
            EngineEvent::SessionStartFailed(m) => write!(f, "SessionStartFailed({m})"),
            EngineEvent::SessionEnded => write!(f, "SessionEnded"),
            EngineEvent::SessionEndFailed(m) => write!(f, "SessionEndFailed({m})"),
            EngineEvent::UserSpoke => write!(f, "UserSpoke"),
            EngineEvent::AgentSpoke => write!(f, "AgentSpoke"),
            EngineEvent::SessionFailed(m) => write!(f, "SessionFailed({m})"),
            EngineEvent::TimerFired(slot) => write!(f, "TimerFired({slot})"),
            EngineEvent::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Notifications broadcast after committed state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Session start requested, waiting on the transport
    SessionStarting,

    /// Session is live and listening for speech
    SessionActive,

    /// User speech activity detected
    UserSpeaking,

    /// Agent speech activity detected
    AgentSpeaking,

    /// Session end requested, waiting on the transport
    SessionEnding,

    /// Session closed, back to idle
    SessionClosed {
        /// Milliseconds from start request to close
        duration_ms: u64,
    },

    /// Session attempt failed; error feedback is showing
    SessionError {
        /// Failure description from the transport boundary
        message: String,
    },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::SessionStarting => write!(f, "SESSION_STARTING"),
            StateEvent::SessionActive => write!(f, "SESSION_ACTIVE"),
            StateEvent::UserSpeaking => write!(f, "USER_SPEAKING"),
            StateEvent::AgentSpeaking => write!(f, "AGENT_SPEAKING"),
            StateEvent::SessionEnding => write!(f, "SESSION_ENDING"),
            StateEvent::SessionClosed { duration_ms } => {
                write!(f, "SESSION_CLOSED ({duration_ms}ms)")
            }
            StateEvent::SessionError { message } => write!(f, "SESSION_ERROR ({message})"),
        }
    }
}
