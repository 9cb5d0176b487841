//! Fire-and-forget mirror of button presses and survey answers.
//!
//! Logging never blocks a transition: each write runs on its own tokio task
//! and a failure only produces a warning. [`EventLogger::flush`] waits for
//! outstanding writes before the process exits.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use study_common::SessionContext;
use tokio::task::JoinHandle;

use super::{ButtonEvent, StudyBackend, SurveyLog, TurnSurvey, timestamp_now};
use crate::errors::RemoteError;
use crate::survey::SurveyResponse;

#[derive(Clone)]
pub struct EventLogger {
    backend: Arc<dyn StudyBackend>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl EventLogger {
    pub fn new(backend: Arc<dyn StudyBackend>) -> Self {
        Self {
            backend,
            pending: Arc::default(),
        }
    }

    /// Record a button press on `page`.
    pub fn button(&self, ctx: &SessionContext, page: &str, button: &str) {
        let event = ButtonEvent {
            participant_id: ctx.wire_id().to_string(),
            page: page.to_string(),
            button: button.to_string(),
            timestamp: timestamp_now(),
        };
        tracing::debug!(page = %event.page, button = %event.button, "Logging button event");
        let backend = self.backend.clone();
        self.spawn("log_event", async move { backend.log_event(&event).await });
    }

    /// Record an evaluation-page survey.
    pub fn survey(&self, ctx: &SessionContext, page: &str, responses: SurveyResponse) {
        let log = SurveyLog {
            participant_id: ctx.wire_id().to_string(),
            page: page.to_string(),
            responses,
            timestamp: timestamp_now(),
        };
        let backend = self.backend.clone();
        self.spawn("log_survey", async move { backend.log_survey(&log).await });
    }

    /// Submit a per-turn chat survey.
    pub fn turn_survey(&self, survey: TurnSurvey) {
        let backend = self.backend.clone();
        self.spawn("submit_survey", async move {
            backend.submit_survey(&survey).await
        });
    }

    fn spawn<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = write.await {
                tracing::warn!(error = %e, endpoint = e.endpoint(), "Failed to {}", what);
            }
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Writes spawned and not yet finished.
    pub fn outstanding(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every write spawned so far.
    pub async fn flush(&self) {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Log task did not complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryBackend;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn button_event_is_recorded_after_flush() {
        let backend = Arc::new(InMemoryBackend::new());
        let logger = EventLogger::new(backend.clone());
        let ctx = SessionContext::from_param(Some("P5"));

        logger.button(&ctx, "Intro", "Start");
        logger.flush().await;

        let events = backend.recorded().events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].participant_id, "P5");
        assert_eq!(events[0].page, "Intro");
        assert_eq!(logger.outstanding(), 0);
    }

    #[tokio::test]
    async fn unknown_participant_is_logged_as_sentinel() {
        let backend = Arc::new(InMemoryBackend::new());
        let logger = EventLogger::new(backend.clone());

        logger.survey(&SessionContext::Unknown, "PerEval Tag", BTreeMap::new());
        logger.flush().await;

        assert_eq!(backend.recorded().survey_logs[0].participant_id, "Unknown");
    }

    #[tokio::test]
    async fn failed_write_does_not_propagate() {
        let backend = Arc::new(InMemoryBackend::new().with_failing_writes());
        let logger = EventLogger::new(backend.clone());
        let ctx = SessionContext::from_param(Some("P5"));

        logger.button(&ctx, "Final", "Finish");
        logger.flush().await;

        assert!(backend.recorded().events.is_empty());
    }
}
