//! Button input: edge detection over a polled boolean level
//!
//! The physical GPIO read lives behind the [`ButtonSource`] trait; this
//! module only turns sampled levels into discrete press events and
//! feeds them to the feedback engine.

mod edge;
mod poller;

pub use edge::{EdgeDetector, Pressed};
pub use poller::{ButtonPoller, ButtonSource, SharedButton};
