//! In-process [`StudyBackend`] used by `run --offline` and by tests.
//!
//! Every write is recorded and can be inspected with
//! [`InMemoryBackend::recorded`]. Topics saved for a participant are served
//! back by `fetch_user_topics`. Chat requests are answered from a reply
//! script, by default an echo of the participant's message cut into small
//! chunks.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use study_common::{ParticipantId, SessionContext};

use super::{
    ButtonEvent, ChatLog, ChatRequest, ChunkStream, GeneratedEpisodes, RoleEpisodes, StudyBackend,
    SurveyLog, TurnSurvey, UserInfo, UserTopics, stream_endpoint,
};
use crate::errors::RemoteError;

/// Characters per chunk of the default echo reply.
const ECHO_CHUNK_CHARS: usize = 4;

/// Sender half of a reply fed by the caller, see
/// [`InMemoryBackend::with_reply_channel`].
pub type ReplySender = mpsc::UnboundedSender<Result<Bytes, RemoteError>>;

/// Everything written to the backend so far.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub registrations: Vec<String>,
    pub user_info: Vec<(String, UserInfo)>,
    pub selected_topics: BTreeMap<String, UserTopics>,
    pub chat_requests: Vec<ChatRequest>,
    pub chat_logs: Vec<ChatLog>,
    pub turn_surveys: Vec<TurnSurvey>,
    pub survey_logs: Vec<SurveyLog>,
    pub events: Vec<ButtonEvent>,
}

enum Reply {
    Echo,
    Chunks(Vec<Bytes>),
    FailOpen,
    FailAfter(Vec<Bytes>),
    Channel(Option<mpsc::UnboundedReceiver<Result<Bytes, RemoteError>>>),
}

pub struct InMemoryBackend {
    recorded: Mutex<Recorded>,
    reply: Mutex<Reply>,
    identities: BTreeMap<String, RoleEpisodes>,
    experiencable: GeneratedEpisodes,
    fail_writes: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(Recorded::default()),
            reply: Mutex::new(Reply::Echo),
            identities: BTreeMap::new(),
            experiencable: GeneratedEpisodes::default(),
            fail_writes: false,
        }
    }

    /// Answer every chat request with these chunks.
    pub fn with_reply_chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.reply = Mutex::new(Reply::Chunks(chunks.into_iter().map(Into::into).collect()));
        self
    }

    /// Send these chunks, then fail the stream.
    pub fn with_reply_failing_after<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.reply = Mutex::new(Reply::FailAfter(chunks.into_iter().map(Into::into).collect()));
        self
    }

    /// Refuse to open any chat stream.
    pub fn with_unreachable_chat(mut self) -> Self {
        self.reply = Mutex::new(Reply::FailOpen);
        self
    }

    /// Serve the next chat reply from a channel the caller feeds. The stream
    /// ends when the sender is dropped. Only one request can be answered
    /// this way.
    pub fn with_reply_channel(mut self) -> (Self, ReplySender) {
        let (tx, rx) = mpsc::unbounded();
        self.reply = Mutex::new(Reply::Channel(Some(rx)));
        (self, tx)
    }

    /// Fail every write with a 503.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn with_identities(mut self, identities: BTreeMap<String, RoleEpisodes>) -> Self {
        self.identities = identities;
        self
    }

    pub fn with_experiencable(mut self, experiencable: GeneratedEpisodes) -> Self {
        self.experiencable = experiencable;
        self
    }

    /// Snapshot of everything written so far.
    pub fn recorded(&self) -> Recorded {
        self.lock_recorded().clone()
    }

    fn lock_recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write<F>(&self, endpoint: &str, apply: F) -> Result<(), RemoteError>
    where
        F: FnOnce(&mut Recorded),
    {
        if self.fail_writes {
            return Err(unavailable(endpoint));
        }
        apply(&mut self.lock_recorded());
        Ok(())
    }
}

fn unavailable(endpoint: &str) -> RemoteError {
    RemoteError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
    }
}

fn echo_chunks(request: &ChatRequest) -> Vec<Bytes> {
    let reply = format!(
        "[{} persona] You said: {}",
        request.persona_type.wire_name(),
        request.input_text
    );
    let chars: Vec<char> = reply.chars().collect();
    chars
        .chunks(ECHO_CHUNK_CHARS)
        .map(|chunk| Bytes::from(chunk.iter().collect::<String>()))
        .collect()
}

#[async_trait]
impl StudyBackend for InMemoryBackend {
    async fn register_participant(&self, participant: &ParticipantId) -> Result<(), RemoteError> {
        self.write("/submit", |r| r.registrations.push(participant.to_string()))
    }

    async fn save_user_info(&self, ctx: &SessionContext, info: &UserInfo) -> Result<(), RemoteError> {
        self.write("/save_user_info", |r| {
            r.user_info.push((ctx.wire_id().to_string(), info.clone()))
        })
    }

    async fn save_selected_topics(
        &self,
        ctx: &SessionContext,
        topics: &UserTopics,
    ) -> Result<(), RemoteError> {
        self.write("/save_selected_topics", |r| {
            r.selected_topics
                .insert(ctx.wire_id().to_string(), topics.clone());
        })
    }

    async fn fetch_user_topics(&self, ctx: &SessionContext) -> Result<UserTopics, RemoteError> {
        self.lock_recorded()
            .selected_topics
            .get(ctx.wire_id())
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                endpoint: "/get_user_topics".to_string(),
                status: 404,
            })
    }

    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, RemoteError> {
        let endpoint = stream_endpoint(request.persona_type);
        self.lock_recorded().chat_requests.push(request.clone());

        let mut reply = self.reply.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = match &mut *reply {
            Reply::Echo => futures::stream::iter(echo_chunks(request).into_iter().map(Ok)).boxed(),
            Reply::Chunks(chunks) => futures::stream::iter(chunks.clone().into_iter().map(Ok)).boxed(),
            Reply::FailOpen => return Err(unavailable(endpoint)),
            Reply::FailAfter(chunks) => {
                let items = chunks
                    .clone()
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(RemoteError::Decode {
                        endpoint: endpoint.to_string(),
                        message: "connection reset mid-reply".to_string(),
                    })));
                futures::stream::iter(items.collect::<Vec<_>>()).boxed()
            }
            Reply::Channel(rx) => match rx.take() {
                Some(rx) => rx.boxed(),
                None => return Err(unavailable(endpoint)),
            },
        };
        Ok(stream)
    }

    async fn save_chat_log(&self, log: &ChatLog) -> Result<(), RemoteError> {
        self.write("/save_chat_log", |r| r.chat_logs.push(log.clone()))
    }

    async fn submit_survey(&self, survey: &TurnSurvey) -> Result<(), RemoteError> {
        self.write("/submit_survey", |r| r.turn_surveys.push(survey.clone()))
    }

    async fn log_survey(&self, log: &SurveyLog) -> Result<(), RemoteError> {
        self.write("/log_survey", |r| r.survey_logs.push(log.clone()))
    }

    async fn log_event(&self, event: &ButtonEvent) -> Result<(), RemoteError> {
        self.write("/log_event", |r| r.events.push(event.clone()))
    }

    async fn fetch_identities(
        &self,
        _ctx: &SessionContext,
    ) -> Result<BTreeMap<String, RoleEpisodes>, RemoteError> {
        Ok(self.identities.clone())
    }

    async fn fetch_experiencable(
        &self,
        _ctx: &SessionContext,
    ) -> Result<GeneratedEpisodes, RemoteError> {
        Ok(self.experiencable.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use study_common::PersonaKind;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            user_number: "P1".into(),
            session_id: "chat1/1".into(),
            persona_type: PersonaKind::Tag,
            input_text: text.into(),
            topic: "Free topic".into(),
        }
    }

    async fn collect(stream: ChunkStream) -> Vec<Result<Bytes, RemoteError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn echo_reply_is_chunked() {
        let backend = InMemoryBackend::new();
        let chunks = collect(backend.open_chat_stream(&request("hi")).await.unwrap()).await;
        assert!(chunks.len() > 1);
        let text: String = chunks
            .into_iter()
            .map(|c| String::from_utf8(c.unwrap().to_vec()).unwrap())
            .collect();
        assert_eq!(text, "[Tag persona] You said: hi");
        assert_eq!(backend.recorded().chat_requests.len(), 1);
    }

    #[tokio::test]
    async fn scripted_chunks_are_replayed_for_every_request() {
        let backend = InMemoryBackend::new().with_reply_chunks(["Hel", "lo"]);
        for _ in 0..2 {
            let chunks = collect(backend.open_chat_stream(&request("x")).await.unwrap()).await;
            assert_eq!(chunks.len(), 2);
        }
    }

    #[tokio::test]
    async fn failing_reply_ends_with_error() {
        let backend = InMemoryBackend::new().with_reply_failing_after(["par"]);
        let chunks = collect(backend.open_chat_stream(&request("x")).await.unwrap()).await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn reply_channel_is_single_use() {
        let (backend, tx) = InMemoryBackend::new().with_reply_channel();
        let stream = backend.open_chat_stream(&request("x")).await.unwrap();
        tx.unbounded_send(Ok(Bytes::from_static(b"ok"))).unwrap();
        drop(tx);
        assert_eq!(collect(stream).await.len(), 1);
        assert!(backend.open_chat_stream(&request("y")).await.is_err());
    }

    #[tokio::test]
    async fn saved_topics_are_served_back() {
        let backend = InMemoryBackend::new();
        let ctx = SessionContext::from_param(Some("P2"));
        assert!(backend.fetch_user_topics(&ctx).await.is_err());

        let topics = UserTopics {
            tag_topics: vec!["a".into()],
            ..Default::default()
        };
        backend.save_selected_topics(&ctx, &topics).await.unwrap();
        assert_eq!(backend.fetch_user_topics(&ctx).await.unwrap(), topics);
    }

    #[tokio::test]
    async fn failing_writes_record_nothing() {
        let backend = InMemoryBackend::new().with_failing_writes();
        let log = ChatLog {
            user_number: "P1".into(),
            session_id: "chat1/1".into(),
            persona_type: PersonaKind::Tag,
            messages: vec![],
        };
        let err = backend.save_chat_log(&log).await.unwrap_err();
        assert_eq!(err.endpoint(), "/save_chat_log");
        assert!(backend.recorded().chat_logs.is_empty());
    }
}
