//! Renderer driver: one continuous-pattern task at a time
//!
//! Continuous patterns (breathe/pulse) run as a repeating task writing
//! frames through the [`Indicator`] capability. Switching patterns is
//! cancel-then-start: the previous task is aborted and joined before
//! the next one begins, so two patterns never write concurrently.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::trace;

use super::pattern::{breathe_level, pulse_level, Color, OutputPattern};

/// Capability trait for the physical indicator
///
/// The real driver (single LED or addressable ring) lives out of tree;
/// writes must be fast and non-blocking.
pub trait Indicator: Send + Sync + 'static {
    /// Write one frame
    fn set(&self, color: Color);
}

/// Indicator stand-in that traces frames instead of driving hardware
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&self, color: Color) {
        trace!(r = color.r, g = color.g, b = color.b, "indicator frame");
    }
}

/// Owns the indicator and the current continuous-pattern task
pub struct FeedbackRenderer {
    indicator: Arc<dyn Indicator>,
    task: Option<JoinHandle<()>>,
}

impl FeedbackRenderer {
    /// Create a renderer with a dark indicator
    pub fn new(indicator: Arc<dyn Indicator>) -> Self {
        indicator.set(Color::OFF);
        Self {
            indicator,
            task: None,
        }
    }

    /// Show `pattern`, replacing whatever is currently showing
    pub async fn apply(&mut self, pattern: OutputPattern) {
        self.cancel_current().await;

        match pattern {
            OutputPattern::Off => self.indicator.set(Color::OFF),
            OutputPattern::Solid { color } => self.indicator.set(color),
            animated => {
                let indicator = Arc::clone(&self.indicator);
                self.task = Some(tokio::spawn(run_animation(indicator, animated)));
            }
        }
    }

    /// Stop any running pattern and darken the indicator
    pub async fn stop(&mut self) {
        self.cancel_current().await;
        self.indicator.set(Color::OFF);
    }

    /// Abort the current task and wait for it to finish
    ///
    /// The join is bounded: an aborted task stops at its next await
    /// point, which is at most one frame away.
    async fn cancel_current(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// Frame loop for an animated pattern
async fn run_animation(indicator: Arc<dyn Indicator>, pattern: OutputPattern) {
    match pattern {
        OutputPattern::Breathe {
            color,
            period,
            steps,
        } => {
            let frame = period / steps.max(1);
            loop {
                for step in 0..steps {
                    indicator.set(color.scaled(breathe_level(step, steps)));
                    tokio::time::sleep(frame).await;
                }
            }
        }
        OutputPattern::Pulse {
            color,
            period,
            steps,
        } => {
            let frame = period / steps.max(1);
            loop {
                for step in 0..steps {
                    indicator.set(color.scaled(pulse_level(step, steps)));
                    tokio::time::sleep(frame).await;
                }
            }
        }
        OutputPattern::PulseOnce {
            color,
            duration,
            steps,
        } => {
            let frame = duration / steps.max(1);
            for step in 0..steps {
                indicator.set(color.scaled(pulse_level(step, steps)));
                tokio::time::sleep(frame).await;
            }
            indicator.set(Color::OFF);
        }
        OutputPattern::Blink {
            color,
            period,
            count,
        } => {
            let half = period / 2;
            for _ in 0..count {
                indicator.set(color);
                tokio::time::sleep(half).await;
                indicator.set(Color::OFF);
                tokio::time::sleep(half).await;
            }
        }
        // Off and Solid are applied directly by the renderer
        OutputPattern::Off | OutputPattern::Solid { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every frame written
    #[derive(Default)]
    struct RecordingIndicator {
        frames: Mutex<Vec<Color>>,
    }

    impl RecordingIndicator {
        fn frames(&self) -> Vec<Color> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl Indicator for RecordingIndicator {
        fn set(&self, color: Color) {
            self.frames.lock().unwrap().push(color);
        }
    }

    fn renderer() -> (FeedbackRenderer, Arc<RecordingIndicator>) {
        let indicator = Arc::new(RecordingIndicator::default());
        let renderer = FeedbackRenderer::new(Arc::clone(&indicator) as Arc<dyn Indicator>);
        (renderer, indicator)
    }

    #[tokio::test]
    async fn test_solid_writes_immediately() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Solid { color: Color::BLUE }).await;
        assert_eq!(indicator.frames().last(), Some(&Color::BLUE));
    }

    #[tokio::test]
    async fn test_off_darkens() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Solid { color: Color::RED }).await;
        r.apply(OutputPattern::Off).await;
        assert_eq!(indicator.frames().last(), Some(&Color::OFF));
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_pattern_produces_frames() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Pulse {
            color: Color::GREEN,
            period: Duration::from_millis(600),
            steps: 12,
        })
        .await;

        tokio::time::sleep(Duration::from_millis(700)).await;
        // More than one cycle's worth of frames, with varying intensity
        let frames = indicator.frames();
        assert!(frames.len() > 12, "only {} frames", frames.len());
        assert!(frames.iter().any(|c| *c != frames[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_pattern_stops_previous_writes() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Breathe {
            color: Color::BLUE,
            period: Duration::from_millis(1200),
            steps: 24,
        })
        .await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        r.apply(OutputPattern::Off).await;
        let count = indicator.frames().len();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(indicator.frames().len(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_once_ends_dark() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::PulseOnce {
            color: Color::RED,
            duration: Duration::from_millis(400),
            steps: 8,
        })
        .await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        let frames = indicator.frames();
        assert_eq!(frames.last(), Some(&Color::OFF));
        // One cycle only: initial clear + 8 steps + trailing off
        assert_eq!(frames.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_cycles_then_dark() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Blink {
            color: Color::WHITE,
            period: Duration::from_millis(300),
            count: 3,
        })
        .await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        let frames = indicator.frames();
        // Initial clear, then three on/off pairs
        assert_eq!(frames.len(), 7);
        assert_eq!(frames.iter().filter(|c| **c == Color::WHITE).count(), 3);
        assert_eq!(frames.last(), Some(&Color::OFF));

        // Finished: no further frames
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(indicator.frames().len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_and_darkens() {
        let (mut r, indicator) = renderer();
        r.apply(OutputPattern::Pulse {
            color: Color::CYAN,
            period: Duration::from_millis(800),
            steps: 16,
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        r.stop().await;
        assert_eq!(indicator.frames().last(), Some(&Color::OFF));

        let count = indicator.frames().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(indicator.frames().len(), count);
    }
}
