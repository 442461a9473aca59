//! Timer registry for slot-keyed deferred actions
//!
//! At most one timer is ever pending per slot; arming a slot again
//! cancels and replaces the previous timer. Used by the feedback
//! engine for speech-activity timeouts and error-feedback reversion.

mod registry;

pub use registry::{TimerRegistry, TimerSlot};
