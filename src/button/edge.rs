//! Rising-edge detection for a sampled button level
//!
//! Debouncing comes from the sampling interval itself: mechanical
//! bounce settles well inside one 50 ms polling period, so a single
//! previous-sample comparison is sufficient.

/// Marker for a detected press (rising edge)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pressed;

/// Converts a raw polled boolean into discrete press events
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last_sample: bool,
}

impl EdgeDetector {
    /// Create a detector with the button assumed released
    pub fn new() -> Self {
        Self { last_sample: false }
    }

    /// Feed one raw sample (true = pressed)
    ///
    /// Returns `Some(Pressed)` only on a false-to-true transition.
    /// Must be called at a steady period; a larger period adds input
    /// latency but never changes which edges are reported.
    pub fn sample(&mut self, raw: bool) -> Option<Pressed> {
        let rising = raw && !self.last_sample;
        self.last_sample = raw;
        rising.then_some(Pressed)
    }
}
