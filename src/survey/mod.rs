//! Likert surveys that gate the flow.
//!
//! A [`SurveyGate`] owns one [`Questionnaire`]. It turns a complete answer
//! set into a [`SurveyReceipt`], which is the only way out of a survey
//! phase.

pub mod gate;
pub mod questionnaire;

pub use gate::{LIKERT_RANGE, SurveyGate, SurveyReceipt, survey_session_id};
pub use questionnaire::{
    CHAT_TURN_QUESTIONS, EPISODE_CRITERIA, EPISODE_KEYS, Episode, PERSONA_EVAL_QUESTIONS,
    Question, Questionnaire, SurveyKind, chat_page, episodes_from_experiencable,
    prior_experiences,
};

use std::collections::BTreeMap;

/// Question key to rating.
pub type SurveyResponse = BTreeMap<String, i32>;
