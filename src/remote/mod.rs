//! Boundary to the remote study backend.
//!
//! Everything the orchestrator stores or fetches goes through
//! [`StudyBackend`]. [`HttpBackend`] talks to the real service;
//! [`InMemoryBackend`] keeps everything in process for rehearsals and tests.

pub mod client;
pub mod event_logger;
pub mod memory;
pub mod payloads;

pub use client::HttpBackend;
pub use event_logger::EventLogger;
pub use memory::InMemoryBackend;
pub use payloads::{
    ButtonEvent, ChatLog, ChatRequest, FREE_TOPIC, GeneratedEpisodes, Registration, RoleEpisodes,
    SurveyLog, TurnSurvey, UserInfo, UserTopics, timestamp_now,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::BTreeMap;
use study_common::{ParticipantId, PersonaKind, SessionContext};

use crate::errors::RemoteError;

/// Raw reply chunks of a streamed chat request, consumed once.
pub type ChunkStream = BoxStream<'static, Result<Bytes, RemoteError>>;

/// Streaming endpoint for a persona.
pub fn stream_endpoint(persona: PersonaKind) -> &'static str {
    match persona {
        PersonaKind::Tag => "/chat_tag_stream",
        PersonaKind::Epi => "/chat_epi_stream",
    }
}

#[async_trait]
pub trait StudyBackend: Send + Sync {
    /// `POST /submit`
    async fn register_participant(&self, participant: &ParticipantId) -> Result<(), RemoteError>;

    /// `POST /save_user_info/{participant}`
    async fn save_user_info(&self, ctx: &SessionContext, info: &UserInfo)
    -> Result<(), RemoteError>;

    /// `POST /save_selected_topics/{participant}`
    async fn save_selected_topics(
        &self,
        ctx: &SessionContext,
        topics: &UserTopics,
    ) -> Result<(), RemoteError>;

    /// `GET /get_user_topics/{participant}`
    async fn fetch_user_topics(&self, ctx: &SessionContext) -> Result<UserTopics, RemoteError>;

    /// `POST /chat_tag_stream` or `/chat_epi_stream`, depending on the persona.
    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, RemoteError>;

    /// `POST /save_chat_log`
    async fn save_chat_log(&self, log: &ChatLog) -> Result<(), RemoteError>;

    /// `POST /submit_survey`
    async fn submit_survey(&self, survey: &TurnSurvey) -> Result<(), RemoteError>;

    /// `POST /log_survey`
    async fn log_survey(&self, log: &SurveyLog) -> Result<(), RemoteError>;

    /// `POST /log_event`
    async fn log_event(&self, event: &ButtonEvent) -> Result<(), RemoteError>;

    /// `GET /get_identity/{participant}`, keyed by role.
    async fn fetch_identities(
        &self,
        ctx: &SessionContext,
    ) -> Result<BTreeMap<String, RoleEpisodes>, RemoteError>;

    /// `GET /get_experiencable/{participant}`, roles in served order.
    async fn fetch_experiencable(
        &self,
        ctx: &SessionContext,
    ) -> Result<GeneratedEpisodes, RemoteError>;
}
