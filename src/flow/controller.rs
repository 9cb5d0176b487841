use study_common::{PersonaKind, SessionContext, TURNS_PER_PERSONA};

use super::{FlowState, Phase};
use crate::errors::FlowError;
use crate::survey::SurveyReceipt;

/// The linear, survey-gated phase machine.
///
/// Each method takes the current state and returns the next one; nothing
/// is stored between calls. There are no backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowController {
    include_info: bool,
}

impl Default for FlowController {
    fn default() -> Self {
        Self { include_info: true }
    }
}

impl FlowController {
    /// `include_info` decides whether `Intro` leads to the profile page or
    /// straight to topic selection.
    pub fn new(include_info: bool) -> Self {
        Self { include_info }
    }

    pub fn start(&self, ctx: SessionContext) -> FlowState {
        FlowState::new(Phase::Intro, ctx)
    }

    /// Advance from a phase that has no gate.
    pub fn proceed(&self, state: &FlowState) -> Result<FlowState, FlowError> {
        match state.phase {
            Phase::Final => Err(FlowError::Finished),
            phase if phase.is_gated() => Err(FlowError::UnexpectedPhase {
                action: "proceed",
                phase: phase.to_string(),
            }),
            phase => self.transition(state, self.successor(phase)),
        }
    }

    /// The participant ended the chat; show the survey for this turn.
    pub fn complete_chat(&self, state: &FlowState) -> Result<FlowState, FlowError> {
        match state.phase {
            Phase::Chat { persona, turn } => {
                self.transition(state, Some(Phase::Survey { persona, turn }))
            }
            Phase::Final => Err(FlowError::Finished),
            phase => Err(FlowError::UnexpectedPhase {
                action: "end the chat",
                phase: phase.to_string(),
            }),
        }
    }

    /// Leave a survey-gated phase. The receipt must belong to this phase.
    ///
    /// A chat turn's survey is accepted from either the chat or the survey
    /// phase of that turn, since a reloaded page comes back as the chat.
    pub fn complete_survey(
        &self,
        state: &FlowState,
        receipt: &SurveyReceipt,
    ) -> Result<FlowState, FlowError> {
        let phase = state.phase;
        if phase == Phase::Final {
            return Err(FlowError::Finished);
        }
        let expected = phase
            .expected_survey()
            .ok_or_else(|| FlowError::UnexpectedPhase {
                action: "submit a survey",
                phase: phase.to_string(),
            })?;
        if receipt.kind() != expected {
            return Err(FlowError::SurveyMismatch {
                receipt: receipt.kind().to_string(),
                phase: phase.to_string(),
            });
        }

        let next = match phase {
            Phase::Chat { persona, turn } => self.successor(Phase::Survey { persona, turn }),
            other => self.successor(other),
        };
        self.transition(state, next)
    }

    /// Immediate successor of `phase`, assuming its gate is passed.
    pub fn successor(&self, phase: Phase) -> Option<Phase> {
        let next = match phase {
            Phase::Intro if self.include_info => Phase::Info,
            Phase::Intro | Phase::Info => Phase::TopicSelection,
            Phase::TopicSelection => Phase::PersonaIntro(PersonaKind::Tag),
            Phase::PersonaIntro(persona) => Phase::Chat { persona, turn: 1 },
            Phase::Chat { persona, turn } => Phase::Survey { persona, turn },
            Phase::Survey { persona, turn } if turn >= TURNS_PER_PERSONA => {
                Phase::PersonaEval(persona)
            }
            Phase::Survey { persona, turn } => Phase::Chat {
                persona,
                turn: turn + 1,
            },
            Phase::PersonaEval(persona) => match persona.next() {
                Some(next) => Phase::PersonaIntro(next),
                None => Phase::EpisodicEval,
            },
            Phase::EpisodicEval => Phase::Final,
            Phase::Final => return None,
        };
        Some(next)
    }

    fn transition(&self, state: &FlowState, next: Option<Phase>) -> Result<FlowState, FlowError> {
        let next = next.ok_or(FlowError::Finished)?;
        tracing::info!(from = %state.phase, to = %next, participant = %state.ctx, "Advancing flow");
        Ok(state.with_phase(next))
    }
}
