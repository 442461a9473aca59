//! Configuration loading and management

use std::time::Duration;

use anyhow::{Context, Result};

/// Default user-speaking timeout before feedback reverts to listening
pub const DEFAULT_USER_TIMEOUT_MS: u64 = 3000;
/// Default agent-speaking timeout before feedback reverts to listening
pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 2000;
/// Default button polling period
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
/// Default duration the error pattern stays up before returning to idle
pub const DEFAULT_ERROR_FEEDBACK_MS: u64 = 1500;

/// Daemon configuration
///
/// Supplied at construction time and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long `UserSpeaking` feedback persists without further speech
    pub user_timeout: Duration,

    /// How long `AgentSpeaking` feedback persists without further speech
    pub agent_timeout: Duration,

    /// Button sampling period
    pub poll_interval: Duration,

    /// How long error feedback is shown before reverting to idle
    pub error_feedback: Duration,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn load() -> Result<Self> {
        Ok(Self {
            user_timeout: env_duration_ms("PARLEY_USER_TIMEOUT_MS", DEFAULT_USER_TIMEOUT_MS)?,
            agent_timeout: env_duration_ms("PARLEY_AGENT_TIMEOUT_MS", DEFAULT_AGENT_TIMEOUT_MS)?,
            poll_interval: env_duration_ms("PARLEY_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            error_feedback: env_duration_ms("PARLEY_ERROR_FEEDBACK_MS", DEFAULT_ERROR_FEEDBACK_MS)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_timeout: Duration::from_millis(DEFAULT_USER_TIMEOUT_MS),
            agent_timeout: Duration::from_millis(DEFAULT_AGENT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            error_feedback: Duration::from_millis(DEFAULT_ERROR_FEEDBACK_MS),
        }
    }
}

/// Read a millisecond duration from an environment variable
fn env_duration_ms(name: &str, default_ms: u64) -> Result<Duration> {
    match std::env::var(name) {
        Ok(value) => parse_duration_ms(&value)
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// Parse a millisecond count into a duration
fn parse_duration_ms(value: &str) -> Result<Duration> {
    let ms: u64 = value.trim().parse().context("expected milliseconds")?;
    Ok(Duration::from_millis(ms))
}
