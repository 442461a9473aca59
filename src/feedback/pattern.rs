//! Pattern descriptors and the state-to-pattern table
//!
//! Everything here is pure: the same input always yields the same
//! output, which is what makes the feedback mapping unit-testable
//! without an LED attached.

use std::time::Duration;

use crate::state::FeedbackState;

/// RGB color for the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::new(0, 0, 0);
    pub const BLUE: Color = Color::new(0, 64, 255);
    pub const GREEN: Color = Color::new(0, 255, 96);
    pub const CYAN: Color = Color::new(0, 200, 200);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 32, 0);

    /// Dim neutral blue for the listening indication
    pub const LISTENING: Color = Color::new(0, 24, 96);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale intensity by a 0.0..=1.0 factor
    pub fn scaled(&self, level: f32) -> Color {
        let level = level.clamp(0.0, 1.0);
        Color {
            r: (self.r as f32 * level) as u8,
            g: (self.g as f32 * level) as u8,
            b: (self.b as f32 * level) as u8,
        }
    }
}

/// Abstract feedback pattern descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputPattern {
    /// Indicator dark
    Off,

    /// Steady color at full intensity
    Solid { color: Color },

    /// Slow two-phase fade loop (raised-cosine envelope)
    Breathe {
        color: Color,
        period: Duration,
        steps: u32,
    },

    /// Faster fade in/out loop (triangle envelope)
    Pulse {
        color: Color,
        period: Duration,
        steps: u32,
    },

    /// Single fade-in-out, then dark
    PulseOnce {
        color: Color,
        duration: Duration,
        steps: u32,
    },

    /// Hard on/off cycles, then dark
    Blink {
        color: Color,
        period: Duration,
        count: u32,
    },
}

/// Map a feedback state to its output pattern
///
/// Table-driven and total: every state has exactly one pattern.
pub fn pattern_for(state: FeedbackState) -> OutputPattern {
    match state {
        FeedbackState::Idle => OutputPattern::Off,
        FeedbackState::Starting => OutputPattern::Breathe {
            color: Color::BLUE,
            period: Duration::from_millis(1200),
            steps: 24,
        },
        FeedbackState::Listening => OutputPattern::Solid {
            color: Color::LISTENING,
        },
        FeedbackState::UserSpeaking => OutputPattern::Pulse {
            color: Color::GREEN,
            period: Duration::from_millis(600),
            steps: 12,
        },
        FeedbackState::AgentSpeaking => OutputPattern::Pulse {
            color: Color::CYAN,
            period: Duration::from_millis(800),
            steps: 16,
        },
        FeedbackState::Ending => OutputPattern::PulseOnce {
            color: Color::WHITE,
            duration: Duration::from_millis(400),
            steps: 8,
        },
        FeedbackState::Error => OutputPattern::PulseOnce {
            color: Color::RED,
            duration: Duration::from_millis(1500),
            steps: 15,
        },
    }
}

/// Indicator self-test shown once at startup
///
/// Three hard blinks confirm the indicator wiring before the first
/// session.
pub fn startup_pattern() -> OutputPattern {
    OutputPattern::Blink {
        color: Color::WHITE,
        period: Duration::from_millis(300),
        count: 3,
    }
}

/// Raised-cosine intensity for step `n` of a breathing cycle
pub fn breathe_level(step: u32, steps: u32) -> f32 {
    if steps == 0 {
        return 0.0;
    }
    let phase = (step % steps) as f32 / steps as f32;
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * phase).cos())
}

/// Triangle intensity for step `n` of a pulse cycle
pub fn pulse_level(step: u32, steps: u32) -> f32 {
    if steps == 0 {
        return 0.0;
    }
    let phase = (step % steps) as f32 / steps as f32;
    1.0 - (2.0 * phase - 1.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [FeedbackState; 7] = [
        FeedbackState::Idle,
        FeedbackState::Starting,
        FeedbackState::Listening,
        FeedbackState::UserSpeaking,
        FeedbackState::AgentSpeaking,
        FeedbackState::Ending,
        FeedbackState::Error,
    ];

    #[test]
    fn test_mapping_is_deterministic() {
        for state in ALL_STATES {
            assert_eq!(pattern_for(state), pattern_for(state));
        }
    }

    #[test]
    fn test_distinct_states_have_distinct_patterns() {
        for (i, a) in ALL_STATES.iter().enumerate() {
            for b in &ALL_STATES[i + 1..] {
                assert_ne!(
                    pattern_for(*a),
                    pattern_for(*b),
                    "{a} and {b} share a pattern"
                );
            }
        }
    }

    #[test]
    fn test_idle_is_off() {
        assert_eq!(pattern_for(FeedbackState::Idle), OutputPattern::Off);
    }

    #[test]
    fn test_error_pattern_is_one_shot_red() {
        match pattern_for(FeedbackState::Error) {
            OutputPattern::PulseOnce { color, .. } => assert_eq!(color, Color::RED),
            other => panic!("expected one-shot error pattern, got {other:?}"),
        }
    }

    #[test]
    fn test_startup_pattern_is_finite_blink() {
        match startup_pattern() {
            OutputPattern::Blink { count, color, .. } => {
                assert_eq!(count, 3);
                assert_eq!(color, Color::WHITE);
            }
            other => panic!("expected blink self-test, got {other:?}"),
        }
    }

    #[test]
    fn test_scaled_bounds() {
        let c = Color::new(200, 100, 50);
        assert_eq!(c.scaled(0.0), Color::OFF);
        assert_eq!(c.scaled(1.0), c);
        assert_eq!(c.scaled(2.0), c);
        assert_eq!(c.scaled(-1.0), Color::OFF);
        assert_eq!(c.scaled(0.5), Color::new(100, 50, 25));
    }

    #[test]
    fn test_envelopes_stay_in_range() {
        for steps in [1u32, 8, 24] {
            for step in 0..steps * 2 {
                let b = breathe_level(step, steps);
                let p = pulse_level(step, steps);
                assert!((0.0..=1.0).contains(&b), "breathe {b} out of range");
                assert!((0.0..=1.0).contains(&p), "pulse {p} out of range");
            }
        }
    }

    #[test]
    fn test_envelopes_start_dark() {
        assert!(breathe_level(0, 24) < 0.05);
        assert!(pulse_level(0, 12) < 0.05);
    }

    #[test]
    fn test_envelopes_peak_mid_cycle() {
        assert!(breathe_level(12, 24) > 0.95);
        assert!(pulse_level(6, 12) > 0.95);
    }

    #[test]
    fn test_zero_steps_is_dark() {
        assert_eq!(breathe_level(0, 0), 0.0);
        assert_eq!(pulse_level(3, 0), 0.0);
    }
}
