//! One chat turn with a persona.
//!
//! A [`StreamingChatSession`] sends a participant message, folds the
//! streamed reply into the transcript chunk by chunk and publishes every
//! intermediate transcript to subscribers. Only one reply can be in flight;
//! a submit that arrives while one is pending is dropped, never queued.

use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use study_common::{Message, PersonaKind, SessionContext};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{Pacer, Utf8ChunkDecoder};
use crate::errors::{ChatError, RemoteError};
use crate::remote::{ChatLog, ChatRequest, EventLogger, StudyBackend};
use crate::survey::chat_page;

/// Button name logged when a turn is ended.
pub const END_CHAT_BUTTON: &str = "End Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    /// Request sent, no chunk received yet.
    Sending,
    /// At least one chunk applied.
    Streaming,
}

/// How a submit ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    Completed,
    /// Blank input or a reply already in flight. Nothing changed.
    Dropped,
    /// The request or the stream failed. Any partial reply is kept.
    Failed(RemoteError),
    /// Stopped by [`StreamingChatSession::cancel`]. Any partial reply is kept.
    Cancelled,
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed)
    }
}

/// Identity of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub ctx: SessionContext,
    pub persona: PersonaKind,
    /// 1-based.
    pub turn: u32,
    pub topic: String,
}

impl ChatTurn {
    /// `chat{n}/{turn}`
    pub fn session_id(&self) -> String {
        format!("chat{}/{}", self.persona.ordinal(), self.turn)
    }

    /// Page name for the audit log, `chat{n}({slug})/{turn}`.
    pub fn page(&self) -> String {
        chat_page(self.persona, self.turn)
    }
}

#[derive(Debug)]
struct Inner {
    state: ChatState,
    transcript: Vec<Message>,
    cancel: Option<CancellationToken>,
}

/// Cheap to clone; clones share the same transcript and state.
#[derive(Clone)]
pub struct StreamingChatSession {
    turn: Arc<ChatTurn>,
    backend: Arc<dyn StudyBackend>,
    logger: EventLogger,
    pacer: Pacer,
    inner: Arc<Mutex<Inner>>,
    transcript_tx: Arc<watch::Sender<Vec<Message>>>,
}

impl StreamingChatSession {
    pub fn new(
        turn: ChatTurn,
        backend: Arc<dyn StudyBackend>,
        logger: EventLogger,
        pacer: Pacer,
    ) -> Self {
        let (transcript_tx, _) = watch::channel(Vec::new());
        Self {
            turn: Arc::new(turn),
            backend,
            logger,
            pacer,
            inner: Arc::new(Mutex::new(Inner {
                state: ChatState::Idle,
                transcript: Vec::new(),
                cancel: None,
            })),
            transcript_tx: Arc::new(transcript_tx),
        }
    }

    pub fn turn(&self) -> &ChatTurn {
        &self.turn
    }

    pub fn state(&self) -> ChatState {
        self.lock().state
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    /// Receive the whole transcript every time it changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.transcript_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.transcript_tx.send_replace(inner.transcript.clone());
    }

    /// Send `text` and stream the reply into the transcript.
    ///
    /// The text is stored and sent as typed. Blank input, or any call while
    /// a reply is in flight, returns [`SubmitOutcome::Dropped`] without
    /// touching the transcript.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let cancel = {
            let mut inner = self.lock();
            if text.trim().is_empty() || inner.state != ChatState::Idle {
                tracing::debug!(state = ?inner.state, "Dropping chat submit");
                return SubmitOutcome::Dropped;
            }
            inner.state = ChatState::Sending;
            inner.transcript.push(Message::user(text));
            let token = CancellationToken::new();
            inner.cancel = Some(token.clone());
            self.publish(&inner);
            token
        };

        tracing::debug!(session_id = %self.turn.session_id(), "Sending chat message");
        let mut agent_started = false;
        let outcome = self.stream_reply(text, &cancel, &mut agent_started).await;

        let mut inner = self.lock();
        if outcome.is_completed() && !agent_started {
            inner.transcript.push(Message::agent(""));
        }
        inner.state = ChatState::Idle;
        inner.cancel = None;
        self.publish(&inner);
        outcome
    }

    async fn stream_reply(
        &self,
        text: &str,
        cancel: &CancellationToken,
        agent_started: &mut bool,
    ) -> SubmitOutcome {
        let request = ChatRequest {
            user_number: self.turn.ctx.wire_id().to_string(),
            session_id: self.turn.session_id(),
            persona_type: self.turn.persona,
            input_text: text.to_string(),
            topic: self.turn.topic.clone(),
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SubmitOutcome::Cancelled,
            opened = self.backend.open_chat_stream(&request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, session_id = %request.session_id, "Failed to open chat stream");
                return SubmitOutcome::Failed(e);
            }
        };

        let mut decoder = Utf8ChunkDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(session_id = %request.session_id, "Chat reply cancelled");
                    return SubmitOutcome::Cancelled;
                }
                next = stream.next() => next,
            };
            match next {
                Some(Ok(bytes)) => {
                    let text = decoder.decode(&bytes);
                    self.append_agent(&text, agent_started);
                    self.pacer.pause().await;
                }
                Some(Err(e)) => {
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        self.append_agent(&tail, agent_started);
                    }
                    tracing::warn!(error = %e, session_id = %request.session_id, "Chat stream failed");
                    return SubmitOutcome::Failed(e);
                }
                None => break,
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            self.append_agent(&tail, agent_started);
        }
        SubmitOutcome::Completed
    }

    /// Apply one decoded chunk. The first chunk opens the agent message.
    fn append_agent(&self, text: &str, agent_started: &mut bool) {
        let mut inner = self.lock();
        if !*agent_started {
            inner.transcript.push(Message::agent(""));
            inner.state = ChatState::Streaming;
            *agent_started = true;
        }
        if let Some(message) = inner.transcript.last_mut() {
            message.content.push_str(text);
        }
        self.publish(&inner);
    }

    /// Stop the reply in flight at the next chunk boundary. Returns false
    /// when nothing was streaming.
    pub fn cancel(&self) -> bool {
        match &self.lock().cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Persist the transcript and clear it for the next turn.
    ///
    /// An empty transcript is refused without contacting the backend. If
    /// saving fails the transcript is kept so the participant can retry.
    pub async fn end_session(&self) -> Result<ChatLog, ChatError> {
        let messages = {
            let inner = self.lock();
            if inner.state != ChatState::Idle {
                return Err(ChatError::Busy);
            }
            if inner.transcript.is_empty() {
                return Err(ChatError::EmptyTranscript);
            }
            inner.transcript.clone()
        };

        let log = ChatLog {
            user_number: self.turn.ctx.wire_id().to_string(),
            session_id: self.turn.session_id(),
            persona_type: self.turn.persona,
            messages,
        };
        self.backend.save_chat_log(&log).await.inspect_err(|e| {
            tracing::warn!(error = %e, session_id = %log.session_id, "Failed to save chat log");
        })?;

        self.logger
            .button(&self.turn.ctx, &self.turn.page(), END_CHAT_BUTTON);

        {
            let mut inner = self.lock();
            // Only what was saved; anything sent meanwhile stays.
            let saved = log.messages.len().min(inner.transcript.len());
            inner.transcript.drain(..saved);
            self.publish(&inner);
        }

        tracing::info!(
            session_id = %log.session_id,
            messages = log.messages.len(),
            "Chat turn saved"
        );
        Ok(log)
    }
}
