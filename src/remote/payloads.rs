//! Request and response bodies of the study backend.
//!
//! Field names follow the backend's wire format, which mixes snake_case
//! (`user_number`) with camelCase (`participantId`).

use chrono::{SecondsFormat, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use study_common::{Message, PersonaKind, TURNS_PER_PERSONA};

use crate::survey::SurveyResponse;
use crate::topic::TopicAssignment;

/// Topic label used when a turn has no assigned topic.
pub const FREE_TOPIC: &str = "Free topic";

/// Millisecond-precision UTC timestamp, e.g. `2026-03-01T09:30:00.123Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub participant_id: String,
}

/// Body of a streamed chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_number: String,
    pub session_id: String,
    pub persona_type: PersonaKind,
    pub input_text: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLog {
    pub user_number: String,
    pub session_id: String,
    pub persona_type: PersonaKind,
    pub messages: Vec<Message>,
}

/// Per-turn chat experience survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSurvey {
    pub user_number: String,
    pub session_id: String,
    pub topic: String,
    pub responses: SurveyResponse,
    pub timestamp: String,
}

/// Evaluation-page survey mirrored to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyLog {
    #[serde(rename = "participantId")]
    pub participant_id: String,
    pub page: String,
    pub responses: SurveyResponse,
    pub timestamp: String,
}

/// A button press mirrored to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    #[serde(rename = "participantId")]
    pub participant_id: String,
    pub page: String,
    pub button: String,
    pub timestamp: String,
}

/// Assigned topics as stored for a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTopics {
    pub tag_topics: Vec<String>,
    pub epi_topics: Vec<String>,
    #[serde(default)]
    pub tag_topic_descriptions: Vec<String>,
    #[serde(default)]
    pub epi_topic_descriptions: Vec<String>,
}

impl UserTopics {
    /// Topic title for a 1-based chat turn, falling back to [`FREE_TOPIC`]
    /// when the turn is past the end of the list.
    pub fn topic_for(&self, persona: PersonaKind, turn: u32) -> String {
        let topics = match persona {
            PersonaKind::Tag => &self.tag_topics,
            PersonaKind::Epi => &self.epi_topics,
        };
        if turn == 0 || turn > TURNS_PER_PERSONA {
            return FREE_TOPIC.to_string();
        }
        topics
            .get(turn as usize - 1)
            .cloned()
            .unwrap_or_else(|| FREE_TOPIC.to_string())
    }
}

impl From<&TopicAssignment> for UserTopics {
    fn from(assignment: &TopicAssignment) -> Self {
        let titles = |persona| {
            assignment
                .for_persona(persona)
                .iter()
                .map(|t| t.title.clone())
                .collect()
        };
        let descriptions = |persona| {
            assignment
                .for_persona(persona)
                .iter()
                .map(|t| t.description.clone())
                .collect()
        };
        Self {
            tag_topics: titles(PersonaKind::Tag),
            epi_topics: titles(PersonaKind::Epi),
            tag_topic_descriptions: descriptions(PersonaKind::Tag),
            epi_topic_descriptions: descriptions(PersonaKind::Epi),
        }
    }
}

/// One role the participant described during onboarding, with two episodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEpisodes {
    #[serde(rename = "Role", default)]
    pub role: String,
    #[serde(rename = "Ep1", default)]
    pub ep1: String,
    #[serde(rename = "Ep2", default)]
    pub ep2: String,
}

impl RoleEpisodes {
    /// Non-empty episodes in order.
    pub fn episodes(&self) -> Vec<&str> {
        [self.ep1.as_str(), self.ep2.as_str()]
            .into_iter()
            .filter(|e| !e.trim().is_empty())
            .collect()
    }
}

/// Participant profile collected on the info page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Job")]
    pub job: String,
    #[serde(rename = "Major")]
    pub major: String,
    #[serde(rename = "MBTI")]
    pub mbti: String,
    /// Comma-separated self-description tags.
    #[serde(rename = "Self_tag")]
    pub self_tag: String,
    /// Keyed `Role 1`, `Role 2`, `Role 3`.
    #[serde(rename = "Episode")]
    pub episodes: BTreeMap<String, RoleEpisodes>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct IdentitiesResponse {
    #[serde(rename = "Identities", default)]
    pub identities: BTreeMap<String, RoleEpisodes>,
}

/// Generated episodes per role, in the order the backend lists the roles.
///
/// Episodic survey keys are positional, so the role order of the JSON
/// object is kept instead of being re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedEpisodes(Vec<(String, Vec<String>)>);

impl GeneratedEpisodes {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(role, episodes)| (role.as_str(), episodes.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<R: Into<String>> FromIterator<(R, Vec<String>)> for GeneratedEpisodes {
    fn from_iter<I: IntoIterator<Item = (R, Vec<String>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(role, episodes)| (role.into(), episodes))
                .collect(),
        )
    }
}

impl Serialize for GeneratedEpisodes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (role, episodes) in &self.0 {
            map.serialize_entry(role, episodes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GeneratedEpisodes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RolesVisitor;

        impl<'de> Visitor<'de> for RolesVisitor {
            type Value = GeneratedEpisodes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of role to episode list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut roles = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((role, episodes)) = access.next_entry::<String, Vec<String>>()? {
                    roles.push((role, episodes));
                }
                Ok(GeneratedEpisodes(roles))
            }
        }

        deserializer.deserialize_map(RolesVisitor)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct ExperiencableResponse {
    #[serde(rename = "Experiencable", default)]
    pub experiencable: GeneratedEpisodes,
}
