use anyhow::{Context, bail};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use study_common::{ParticipantId, SessionContext};
use url::Url;

use super::payloads::{ExperiencableResponse, IdentitiesResponse};
use super::{
    ButtonEvent, ChatLog, ChatRequest, ChunkStream, GeneratedEpisodes, Registration, RoleEpisodes,
    StudyBackend, SurveyLog, TurnSurvey, UserInfo, UserTopics, stream_endpoint,
};
use crate::errors::RemoteError;

/// [`StudyBackend`] over HTTP.
///
/// The timeout bounds every JSON request. Streamed chat replies are only
/// bounded by the connect timeout, since a long answer is not a failure.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;
        if base.cannot_be_a_base() {
            bail!("Backend URL cannot carry a path: {}", base_url);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        url: Url,
        body: &T,
    ) -> Result<reqwest::Response, RemoteError> {
        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        check_status(endpoint, resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<T, RemoteError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        check_status(endpoint, resp)?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}

fn check_status(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

#[async_trait]
impl StudyBackend for HttpBackend {
    async fn register_participant(&self, participant: &ParticipantId) -> Result<(), RemoteError> {
        let body = Registration {
            participant_id: participant.to_string(),
        };
        self.post_json("/submit", self.url(&["submit"]), &body).await?;
        Ok(())
    }

    async fn save_user_info(&self, ctx: &SessionContext, info: &UserInfo) -> Result<(), RemoteError> {
        let url = self.url(&["save_user_info", ctx.wire_id()]);
        self.post_json("/save_user_info", url, info).await?;
        Ok(())
    }

    async fn save_selected_topics(
        &self,
        ctx: &SessionContext,
        topics: &UserTopics,
    ) -> Result<(), RemoteError> {
        let url = self.url(&["save_selected_topics", ctx.wire_id()]);
        self.post_json("/save_selected_topics", url, topics).await?;
        Ok(())
    }

    async fn fetch_user_topics(&self, ctx: &SessionContext) -> Result<UserTopics, RemoteError> {
        let url = self.url(&["get_user_topics", ctx.wire_id()]);
        self.get_json("/get_user_topics", url).await
    }

    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, RemoteError> {
        let endpoint = stream_endpoint(request.persona_type);
        let url = self.url(&[endpoint.trim_start_matches('/')]);
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let resp = check_status(endpoint, resp)?;

        let stream = resp.bytes_stream().map(move |chunk| {
            chunk.map_err(|source| RemoteError::Request {
                endpoint: endpoint.to_string(),
                source,
            })
        });
        Ok(stream.boxed())
    }

    async fn save_chat_log(&self, log: &ChatLog) -> Result<(), RemoteError> {
        self.post_json("/save_chat_log", self.url(&["save_chat_log"]), log)
            .await?;
        Ok(())
    }

    async fn submit_survey(&self, survey: &TurnSurvey) -> Result<(), RemoteError> {
        self.post_json("/submit_survey", self.url(&["submit_survey"]), survey)
            .await?;
        Ok(())
    }

    async fn log_survey(&self, log: &SurveyLog) -> Result<(), RemoteError> {
        self.post_json("/log_survey", self.url(&["log_survey"]), log)
            .await?;
        Ok(())
    }

    async fn log_event(&self, event: &ButtonEvent) -> Result<(), RemoteError> {
        self.post_json("/log_event", self.url(&["log_event"]), event)
            .await?;
        Ok(())
    }

    async fn fetch_identities(
        &self,
        ctx: &SessionContext,
    ) -> Result<BTreeMap<String, RoleEpisodes>, RemoteError> {
        let url = self.url(&["get_identity", ctx.wire_id()]);
        let resp: IdentitiesResponse = self.get_json("/get_identity", url).await?;
        Ok(resp.identities)
    }

    async fn fetch_experiencable(
        &self,
        ctx: &SessionContext,
    ) -> Result<GeneratedEpisodes, RemoteError> {
        let url = self.url(&["get_experiencable", ctx.wire_id()]);
        let resp: ExperiencableResponse = self.get_json("/get_experiencable", url).await?;
        Ok(resp.experiencable)
    }
}
