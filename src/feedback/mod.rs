//! Visual feedback: patterns and the indicator driver
//!
//! Patterns are abstract descriptors (color, animation, duration)
//! independent of the physical indicator; the renderer turns them into
//! frame writes through the [`Indicator`] capability and owns the one
//! continuous-pattern task allowed at a time.

mod pattern;
mod renderer;

pub use pattern::{breathe_level, pattern_for, pulse_level, startup_pattern, Color, OutputPattern};
pub use renderer::{FeedbackRenderer, Indicator, LogIndicator};
