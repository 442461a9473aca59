//! Feedback state machine
//!
//! The single authority over session phase and visual feedback. The
//! transition core is side-effect free: it consumes one event and
//! returns the effects to execute, which keeps every rule testable
//! without hardware or a transport.

mod machine;

pub use machine::{Effect, FeedbackState, Machine};
