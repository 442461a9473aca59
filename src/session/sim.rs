//! Simulated session transport
//!
//! Stands in for the real conversational transport during development
//! and in tests: failures are injectable and speech activity can be
//! scripted on a timeline relative to `begin`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use super::transport::{SessionError, SessionEvent, SessionHandle, SessionTransport};

/// Scripted, failure-injectable transport stand-in
#[derive(Default)]
pub struct SimulatedTransport {
    fail_begin: Option<String>,
    fail_end: Option<String>,
    script: Vec<(Duration, SessionEvent)>,
    begin_calls: Arc<AtomicUsize>,
    end_calls: Arc<AtomicUsize>,
    next_id: AtomicU64,
    script_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SimulatedTransport {
    /// A transport that opens and closes sessions without any activity
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `begin` fail with the given message
    pub fn fail_begin(mut self, message: &str) -> Self {
        self.fail_begin = Some(message.to_string());
        self
    }

    /// Make `end` fail with the given message
    pub fn fail_end(mut self, message: &str) -> Self {
        self.fail_end = Some(message.to_string());
        self
    }

    /// Emit `event` at `offset` after each successful `begin`
    pub fn with_event(mut self, offset: Duration, event: SessionEvent) -> Self {
        self.script.push((offset, event));
        self
    }

    /// Shared counter of `begin` invocations
    pub fn begin_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.begin_calls)
    }

    /// Shared counter of `end` invocations
    pub fn end_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.end_calls)
    }
}

#[async_trait]
impl SessionTransport for SimulatedTransport {
    async fn begin(
        &self,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<SessionHandle, SessionError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_begin {
            return Err(SessionError::BeginFailed(message.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(id, "simulated session opened");

        if !self.script.is_empty() {
            let script = self.script.clone();
            let task = tokio::spawn(async move {
                let mut elapsed = Duration::ZERO;
                for (offset, event) in script {
                    if offset > elapsed {
                        tokio::time::sleep(offset - elapsed).await;
                        elapsed = offset;
                    }
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            });
            *self.script_task.lock().await = Some(task);
        }

        Ok(SessionHandle::new(id))
    }

    async fn end(&self, handle: SessionHandle) -> Result<(), SessionError> {
        self.end_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(task) = self.script_task.lock().await.take() {
            task.abort();
        }
        debug!(?handle, "simulated session closed");

        if let Some(message) = &self.fail_end {
            return Err(SessionError::EndFailed(message.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_events_arrive_in_order() {
        let transport = SimulatedTransport::new()
            .with_event(Duration::from_millis(100), SessionEvent::UserSpoke)
            .with_event(Duration::from_millis(300), SessionEvent::AgentSpoke);
        let (tx, mut rx) = mpsc::channel(8);

        transport.begin(tx).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(first, Some(SessionEvent::UserSpoke));

        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(second, Some(SessionEvent::AgentSpoke));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_stops_script() {
        let transport = SimulatedTransport::new()
            .with_event(Duration::from_secs(10), SessionEvent::UserSpoke);
        let (tx, mut rx) = mpsc::channel(8);

        let handle = transport.begin(tx).await.unwrap();
        transport.end(handle).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
