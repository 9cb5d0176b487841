use study_common::{PersonaKind, SessionContext};

use super::{Episode, Questionnaire, SurveyKind, SurveyResponse};
use crate::errors::SurveyError;
use crate::remote::{EventLogger, TurnSurvey, timestamp_now};

/// Lowest and highest Likert rating.
pub const LIKERT_RANGE: std::ops::RangeInclusive<i32> = 1..=7;

/// Proof that a survey was answered completely. Only [`SurveyGate`] can
/// issue one, and the flow will not leave a gated phase without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyReceipt {
    kind: SurveyKind,
    submitted_at: String,
}

impl SurveyReceipt {
    pub fn kind(&self) -> SurveyKind {
        self.kind
    }

    pub fn submitted_at(&self) -> &str {
        &self.submitted_at
    }
}

/// Session id of a turn survey, e.g. `chat1(tag)_3`.
pub fn survey_session_id(persona: PersonaKind, turn: u32) -> String {
    format!("chat{}({})_{}", persona.ordinal(), persona.slug(), turn)
}

/// All-or-nothing check of one survey page.
#[derive(Debug, Clone)]
pub struct SurveyGate {
    questionnaire: Questionnaire,
    topic: Option<String>,
}

impl SurveyGate {
    pub fn new(questionnaire: Questionnaire) -> Self {
        Self {
            questionnaire,
            topic: None,
        }
    }

    pub fn for_chat_turn(persona: PersonaKind, turn: u32, topic: impl Into<String>) -> Self {
        Self {
            questionnaire: Questionnaire::chat_turn(persona, turn),
            topic: Some(topic.into()),
        }
    }

    pub fn for_persona_eval(persona: PersonaKind) -> Self {
        Self::new(Questionnaire::persona_eval(persona))
    }

    pub fn for_episodes(episodes: Vec<Episode>) -> Self {
        Self::new(Questionnaire::episodic(episodes))
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    /// Every required key must be present, then every required value must
    /// be a Likert rating. Keys outside the questionnaire are ignored.
    pub fn validate(&self, responses: &SurveyResponse) -> Result<SurveyReceipt, SurveyError> {
        let missing: Vec<String> = self
            .questionnaire
            .required_keys()
            .filter(|key| !responses.contains_key(*key))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SurveyError::MissingAnswers(missing));
        }

        for key in self.questionnaire.required_keys() {
            let value = responses[key];
            if !LIKERT_RANGE.contains(&value) {
                return Err(SurveyError::OutOfRange {
                    key: key.to_string(),
                    value,
                });
            }
        }

        Ok(SurveyReceipt {
            kind: self.questionnaire.kind(),
            submitted_at: timestamp_now(),
        })
    }

    /// Validate, then hand the answers to the logger.
    ///
    /// Turn surveys go to `submit_survey`; evaluation pages are written to
    /// the survey log followed by a submit button event. The writes run in
    /// the background and cannot fail the submission.
    pub fn submit(
        &self,
        ctx: &SessionContext,
        responses: SurveyResponse,
        logger: &EventLogger,
    ) -> Result<SurveyReceipt, SurveyError> {
        let receipt = self.validate(&responses)?;
        let kind = receipt.kind();

        match kind {
            SurveyKind::ChatTurn { persona, turn } => {
                logger.turn_survey(TurnSurvey {
                    user_number: ctx.wire_id().to_string(),
                    session_id: survey_session_id(persona, turn),
                    topic: self.topic.clone().unwrap_or_default(),
                    responses,
                    timestamp: receipt.submitted_at.clone(),
                });
            }
            SurveyKind::PersonaEval(_) => {
                let page = kind.page();
                logger.survey(ctx, &page, responses);
                logger.button(ctx, &format!("{} submitted", page), "Submit");
            }
            SurveyKind::Episodic => {
                let page = kind.page();
                logger.survey(ctx, &page, responses);
                logger.button(ctx, &page, "Submit");
            }
        }

        tracing::info!(survey = %kind, participant = %ctx, "Survey submitted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryBackend;
    use std::sync::Arc;

    fn answers(keys: impl IntoIterator<Item = String>, value: i32) -> SurveyResponse {
        keys.into_iter().map(|k| (k, value)).collect()
    }

    fn q_keys(n: usize) -> impl Iterator<Item = String> {
        (1..=n).map(|i| format!("Q{}", i))
    }

    #[test]
    fn complete_answers_pass() {
        let gate = SurveyGate::for_chat_turn(PersonaKind::Tag, 3, "Budgeting");
        let receipt = gate.validate(&answers(q_keys(8), 4)).unwrap();
        assert_eq!(
            receipt.kind(),
            SurveyKind::ChatTurn {
                persona: PersonaKind::Tag,
                turn: 3
            }
        );
    }

    #[test]
    fn missing_key_is_reported() {
        let gate = SurveyGate::for_chat_turn(PersonaKind::Tag, 1, "t");
        let mut responses = answers(q_keys(8), 5);
        responses.remove("Q3");
        responses.remove("Q8");

        assert_eq!(
            gate.validate(&responses),
            Err(SurveyError::MissingAnswers(vec!["Q3".into(), "Q8".into()]))
        );
    }

    #[test]
    fn missing_takes_priority_over_range() {
        let gate = SurveyGate::for_persona_eval(PersonaKind::Epi);
        let mut responses = answers(q_keys(18), 9);
        responses.remove("Q1");
        assert!(matches!(
            gate.validate(&responses),
            Err(SurveyError::MissingAnswers(_))
        ));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let gate = SurveyGate::for_persona_eval(PersonaKind::Tag);
        let mut responses = answers(q_keys(18), 7);
        responses.insert("Q5".into(), 0);
        assert_eq!(
            gate.validate(&responses),
            Err(SurveyError::OutOfRange {
                key: "Q5".into(),
                value: 0
            })
        );

        responses.insert("Q5".into(), 8);
        assert!(gate.validate(&responses).is_err());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let gate = SurveyGate::for_chat_turn(PersonaKind::Epi, 2, "t");
        let mut responses = answers(q_keys(8), 1);
        responses.insert("Q99".into(), 42);
        responses.insert("comment".into(), -1);
        assert!(gate.validate(&responses).is_ok());
    }

    #[test]
    fn episodic_gate_requires_every_episode() {
        let episodes = vec![
            Episode {
                role: "Dreamer".into(),
                title: "Episode 1".into(),
                content: "a".into(),
            },
            Episode {
                role: "Dreamer".into(),
                title: "Episode 2".into(),
                content: "b".into(),
            },
        ];
        let gate = SurveyGate::for_episodes(episodes);
        let keys: Vec<String> = gate
            .questionnaire()
            .required_keys()
            .map(str::to_string)
            .collect();

        let only_first: SurveyResponse = keys[..4].iter().map(|k| (k.clone(), 6)).collect();
        match gate.validate(&only_first) {
            Err(SurveyError::MissingAnswers(missing)) => assert_eq!(missing.len(), 4),
            other => panic!("Expected MissingAnswers, got {:?}", other),
        }

        assert!(gate.validate(&answers(keys, 6)).is_ok());
    }

    #[test]
    fn session_id_names_persona() {
        assert_eq!(survey_session_id(PersonaKind::Tag, 10), "chat1(tag)_10");
        assert_eq!(survey_session_id(PersonaKind::Epi, 1), "chat2(epi)_1");
    }

    #[tokio::test]
    async fn turn_survey_is_submitted_with_topic() {
        let backend = Arc::new(InMemoryBackend::new());
        let logger = EventLogger::new(backend.clone());
        let ctx = SessionContext::from_param(Some("P8"));
        let gate = SurveyGate::for_chat_turn(PersonaKind::Epi, 5, "Moving abroad");

        gate.submit(&ctx, answers(q_keys(8), 3), &logger).unwrap();
        logger.flush().await;

        let recorded = backend.recorded();
        assert_eq!(recorded.turn_surveys.len(), 1);
        let survey = &recorded.turn_surveys[0];
        assert_eq!(survey.user_number, "P8");
        assert_eq!(survey.session_id, "chat2(epi)_5");
        assert_eq!(survey.topic, "Moving abroad");
        assert!(recorded.survey_logs.is_empty());
    }

    #[tokio::test]
    async fn persona_eval_logs_survey_and_button() {
        let backend = Arc::new(InMemoryBackend::new());
        let logger = EventLogger::new(backend.clone());
        let ctx = SessionContext::from_param(Some("P8"));

        SurveyGate::for_persona_eval(PersonaKind::Tag)
            .submit(&ctx, answers(q_keys(18), 2), &logger)
            .unwrap();
        logger.flush().await;

        let recorded = backend.recorded();
        assert_eq!(recorded.survey_logs.len(), 1);
        assert_eq!(recorded.survey_logs[0].page, "PerEval(tag)");
        assert_eq!(recorded.events[0].page, "PerEval(tag) submitted");
    }

    #[tokio::test]
    async fn rejected_submission_logs_nothing() {
        let backend = Arc::new(InMemoryBackend::new());
        let logger = EventLogger::new(backend.clone());
        let ctx = SessionContext::Unknown;

        let err = SurveyGate::for_persona_eval(PersonaKind::Tag)
            .submit(&ctx, SurveyResponse::new(), &logger)
            .unwrap_err();
        assert!(matches!(err, SurveyError::MissingAnswers(_)));
        logger.flush().await;

        let recorded = backend.recorded();
        assert!(recorded.survey_logs.is_empty());
        assert!(recorded.events.is_empty());
    }
}
