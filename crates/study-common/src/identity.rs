//! Participant identity threaded through every phase.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire value used when a page is entered without a participant parameter.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Participant id must not be empty")]
pub struct EmptyParticipantId;

/// A non-empty, trimmed participant token (e.g. `P50`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EmptyParticipantId> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmptyParticipantId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = EmptyParticipantId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who the current page belongs to.
///
/// Identity is never looked up from shared state: each phase receives it
/// explicitly, and a page reached without it degrades to `Unknown` instead
/// of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionContext {
    Participant(ParticipantId),
    Unknown,
}

impl SessionContext {
    /// Build a context from an optional raw query value.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(ParticipantId::new) {
            Some(Ok(id)) => SessionContext::Participant(id),
            _ => SessionContext::Unknown,
        }
    }

    /// The string sent to the backend (`Unknown` for the sentinel).
    pub fn wire_id(&self) -> &str {
        match self {
            SessionContext::Participant(id) => id.as_str(),
            SessionContext::Unknown => UNKNOWN_PARTICIPANT,
        }
    }

    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            SessionContext::Participant(id) => Some(id),
            SessionContext::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SessionContext::Unknown)
    }
}

impl From<ParticipantId> for SessionContext {
    fn from(id: ParticipantId) -> Self {
        SessionContext::Participant(id)
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_is_trimmed() {
        let id = ParticipantId::new("  P50 ").unwrap();
        assert_eq!(id.as_str(), "P50");
    }

    #[test]
    fn blank_participant_id_is_rejected() {
        assert_eq!(ParticipantId::new("   "), Err(EmptyParticipantId));
        assert_eq!(ParticipantId::new(""), Err(EmptyParticipantId));
    }

    #[test]
    fn missing_param_degrades_to_unknown() {
        assert_eq!(SessionContext::from_param(None), SessionContext::Unknown);
        assert_eq!(SessionContext::from_param(Some("")), SessionContext::Unknown);
        assert_eq!(SessionContext::Unknown.wire_id(), "Unknown");
    }

    #[test]
    fn present_param_yields_participant() {
        let ctx = SessionContext::from_param(Some("P7"));
        assert_eq!(ctx.wire_id(), "P7");
        assert!(!ctx.is_unknown());
    }

    #[test]
    fn participant_id_rejects_empty_json() {
        let parsed: Result<ParticipantId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
        let parsed: ParticipantId = serde_json::from_str("\"P1\"").unwrap();
        assert_eq!(parsed.as_str(), "P1");
    }
}
