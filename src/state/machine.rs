//! Core state machine implementation
//!
//! Consumes button, session-lifecycle, speech-activity, and timer
//! events; decides the next feedback state and the side effects to
//! run. Effects are returned as data, never executed here.
//!
//! Timer discipline: repeated same-kind speech events re-arm the
//! return-to-listening timer (cancel-and-replace), so the speaking
//! states always have exactly one pending timer and `Listening` has
//! none.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::events::EngineEvent;
use crate::feedback::{pattern_for, OutputPattern};
use crate::timer::TimerSlot;

/// The feedback phases of the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    /// No session, waiting for a button press
    Idle,
    /// Start requested, waiting on the transport
    Starting,
    /// Session live, no recent speech activity
    Listening,
    /// User transcript activity within the user timeout
    UserSpeaking,
    /// Agent response activity within the agent timeout
    AgentSpeaking,
    /// End requested, waiting on the transport
    Ending,
    /// A begin/end failed; error feedback is showing
    Error,
}

impl FeedbackState {
    /// Name for logs and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackState::Idle => "Idle",
            FeedbackState::Starting => "Starting",
            FeedbackState::Listening => "Listening",
            FeedbackState::UserSpeaking => "UserSpeaking",
            FeedbackState::AgentSpeaking => "AgentSpeaking",
            FeedbackState::Ending => "Ending",
            FeedbackState::Error => "Error",
        }
    }
}

impl Default for FeedbackState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for FeedbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Side effects requested by a transition
///
/// `Arm` carries cancel-and-replace semantics: the registry supersedes
/// any timer already pending for the slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a session via the facade
    StartSession,
    /// Close the session via the facade
    EndSession,
    /// Show a feedback pattern on the indicator
    Render(OutputPattern),
    /// Schedule a slot timer
    Arm { slot: TimerSlot, duration: Duration },
    /// Cancel a slot timer if pending
    Cancel { slot: TimerSlot },
}

/// The session/feedback state machine
///
/// Owned by a single engine task; all event handling is serialized
/// through that mailbox, so no internal locking is needed.
pub struct Machine {
    state: FeedbackState,
    /// Session liveness as committed by begin/end outcomes
    active: bool,
    /// Message from the most recent failure, for observers
    last_error: Option<String>,
    config: Config,
}

impl Machine {
    /// Create a machine in `Idle`
    pub fn new(config: Config) -> Self {
        Self {
            state: FeedbackState::Idle,
            active: false,
            last_error: None,
            config,
        }
    }

    /// Current state
    pub fn state(&self) -> FeedbackState {
        self.state
    }

    /// Whether a session is live
    pub fn active(&self) -> bool {
        self.active
    }

    /// Message from the most recent failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Process one event, returning the effects to execute
    pub fn handle(&mut self, event: EngineEvent) -> Vec<Effect> {
        use FeedbackState::*;

        match (self.state, event) {
            (Idle, EngineEvent::ButtonPressed) => {
                self.set_state(Starting);
                vec![Effect::Render(pattern_for(Starting)), Effect::StartSession]
            }

            (Listening | UserSpeaking | AgentSpeaking, EngineEvent::ButtonPressed) => {
                self.set_state(Ending);
                vec![
                    Effect::Cancel {
                        slot: TimerSlot::ReturnToListening,
                    },
                    Effect::Render(pattern_for(Ending)),
                    Effect::EndSession,
                ]
            }

            // Semantic debounce: a press while a session command is in
            // flight must not issue a second one.
            (Starting | Ending, EngineEvent::ButtonPressed) => {
                debug!(state = %self.state, "press ignored, session command in flight");
                vec![]
            }

            (Error, EngineEvent::ButtonPressed) => {
                debug!("press ignored during error feedback");
                vec![]
            }

            (Starting, EngineEvent::SessionStarted) => {
                self.active = true;
                self.set_state(Listening);
                vec![Effect::Render(pattern_for(Listening))]
            }

            (Starting, EngineEvent::SessionStartFailed(message)) => {
                self.fail(message);
                vec![
                    Effect::Render(pattern_for(Error)),
                    Effect::Arm {
                        slot: TimerSlot::ErrorFeedback,
                        duration: self.config.error_feedback,
                    },
                ]
            }

            (Listening | AgentSpeaking, EngineEvent::UserSpoke) => {
                self.set_state(UserSpeaking);
                vec![
                    Effect::Arm {
                        slot: TimerSlot::ReturnToListening,
                        duration: self.config.user_timeout,
                    },
                    Effect::Render(pattern_for(UserSpeaking)),
                ]
            }

            // Repeat activity restarts the timer, same render
            (UserSpeaking, EngineEvent::UserSpoke) => {
                vec![Effect::Arm {
                    slot: TimerSlot::ReturnToListening,
                    duration: self.config.user_timeout,
                }]
            }

            (Listening | UserSpeaking, EngineEvent::AgentSpoke) => {
                self.set_state(AgentSpeaking);
                vec![
                    Effect::Arm {
                        slot: TimerSlot::ReturnToListening,
                        duration: self.config.agent_timeout,
                    },
                    Effect::Render(pattern_for(AgentSpeaking)),
                ]
            }

            (AgentSpeaking, EngineEvent::AgentSpoke) => {
                vec![Effect::Arm {
                    slot: TimerSlot::ReturnToListening,
                    duration: self.config.agent_timeout,
                }]
            }

            (
                UserSpeaking | AgentSpeaking,
                EngineEvent::TimerFired(TimerSlot::ReturnToListening),
            ) => {
                if self.active {
                    self.set_state(Listening);
                    vec![Effect::Render(pattern_for(Listening))]
                } else {
                    self.set_state(Idle);
                    vec![Effect::Render(OutputPattern::Off)]
                }
            }

            (Error, EngineEvent::TimerFired(TimerSlot::ErrorFeedback)) => {
                self.set_state(Idle);
                vec![Effect::Render(OutputPattern::Off)]
            }

            // A fired timer whose target state moved on is advisory
            (_, EngineEvent::TimerFired(slot)) => {
                debug!(state = %self.state, %slot, "stale timer fire ignored");
                vec![]
            }

            (Ending, EngineEvent::SessionEnded) => {
                self.active = false;
                self.set_state(Idle);
                vec![Effect::Render(OutputPattern::Off)]
            }

            // A failed end must not strand the session as active
            (Ending, EngineEvent::SessionEndFailed(message)) => {
                self.fail(message);
                vec![
                    Effect::Render(pattern_for(Error)),
                    Effect::Arm {
                        slot: TimerSlot::ErrorFeedback,
                        duration: self.config.error_feedback,
                    },
                ]
            }

            (Listening | UserSpeaking | AgentSpeaking, EngineEvent::SessionFailed(message)) => {
                self.fail(message);
                vec![
                    Effect::Cancel {
                        slot: TimerSlot::ReturnToListening,
                    },
                    Effect::Render(pattern_for(Error)),
                    Effect::Arm {
                        slot: TimerSlot::ErrorFeedback,
                        duration: self.config.error_feedback,
                    },
                ]
            }

            // No defined rule: dropped with a diagnostic, never fatal
            (state, event) => {
                debug!(%state, %event, "event has no transition in current state, dropped");
                vec![]
            }
        }
    }

    /// Reset for shutdown; returns whether a session still needs ending
    ///
    /// The caller cancels timers, ends the session, and clears the
    /// indicator; this only commits the state change.
    pub fn shutdown(&mut self) -> bool {
        let was_active = self.active;
        if self.state != FeedbackState::Idle {
            self.set_state(FeedbackState::Idle);
        }
        self.active = false;
        was_active
    }

    /// Commit a failure: record the message, leave the session inactive
    fn fail(&mut self, message: String) {
        info!(error = %message, "session attempt failed");
        self.last_error = Some(message);
        self.active = false;
        self.set_state(FeedbackState::Error);
    }

    /// Commit a state change with a transition log
    fn set_state(&mut self, new_state: FeedbackState) {
        info!(from = %self.state, to = %new_state, "state transition");
        self.state = new_state;
    }
}
