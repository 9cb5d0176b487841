//! Typed error hierarchy for the session orchestrator.
//!
//! One enum per subsystem:
//! - `AssignError`: topic counterbalancing contract violations
//! - `ChatError`: chat turn validation and transport failures
//! - `SurveyError`: incomplete or out-of-range survey submissions
//! - `FlowError`: routing and phase transition failures
//! - `RemoteError`: remote backend (network) failures

use study_common::Category;
use thiserror::Error;

/// Errors from `topic::assign`. These indicate the caller broke the
/// selection contract and are not meant to be recovered at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("{category} has {selected} selected topics, exactly {required} are required")]
    InvalidSelectionSize {
        category: Category,
        selected: usize,
        required: usize,
    },

    #[error("Topic {index} is not in the topic pool")]
    UnknownTopic { index: u32 },

    #[error("Topic {index} belongs to {actual}, not {expected}")]
    CategoryMismatch {
        index: u32,
        expected: Category,
        actual: Category,
    },
}

/// Errors from the remote study backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl RemoteError {
    pub fn endpoint(&self) -> &str {
        match self {
            RemoteError::Request { endpoint, .. }
            | RemoteError::Status { endpoint, .. }
            | RemoteError::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// Errors from a chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("There is no conversation to save yet")]
    EmptyTranscript,

    #[error("A reply is still streaming")]
    Busy,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors from survey validation. Nothing is saved or cleared when one of
/// these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Not every question has been answered ({} missing)", .0.len())]
    MissingAnswers(Vec<String>),

    #[error("Answer to {key} must be between 1 and 7, got {value}")]
    OutOfRange { key: String, value: i32 },
}

/// Errors from URL reconstruction and phase transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("No phase is served at '{0}'")]
    UnknownRoute(String),

    #[error("Invalid chat turn '{raw}', expected 1 to {max}")]
    InvalidTurn { raw: String, max: u32 },

    #[error("Cannot {action} from phase {phase}")]
    UnexpectedPhase { action: &'static str, phase: String },

    #[error("Survey receipt for {receipt} does not match phase {phase}")]
    SurveyMismatch { receipt: String, phase: String },

    #[error("The experiment is already finished")]
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_selection_size_names_category_and_counts() {
        let err = AssignError::InvalidSelectionSize {
            category: Category::Emotional,
            selected: 4,
            required: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("Emotional Support"));
        assert!(msg.contains('4'));
        assert!(msg.contains('6'));
    }

    #[test]
    fn missing_answers_reports_count() {
        let err = SurveyError::MissingAnswers(vec!["Q1".into(), "Q3".into()]);
        assert!(err.to_string().contains("2 missing"));
    }

    #[test]
    fn remote_error_exposes_endpoint() {
        let err = RemoteError::Status {
            endpoint: "/save_chat_log".into(),
            status: 500,
        };
        assert_eq!(err.endpoint(), "/save_chat_log");
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn chat_error_converts_from_remote_error() {
        let inner = RemoteError::Decode {
            endpoint: "/chat_tag_stream".into(),
            message: "bad".into(),
        };
        let err: ChatError = inner.into();
        match err {
            ChatError::Remote(RemoteError::Decode { endpoint, .. }) => {
                assert_eq!(endpoint, "/chat_tag_stream");
            }
            _ => panic!("Expected ChatError::Remote(Decode)"),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&AssignError::UnknownTopic { index: 99 });
        assert_std_error(&ChatError::EmptyTranscript);
        assert_std_error(&SurveyError::MissingAnswers(vec![]));
        assert_std_error(&FlowError::Finished);
    }
}
