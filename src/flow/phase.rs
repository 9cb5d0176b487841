//! Phases of the experiment and the state carried between pages.

use std::fmt;
use study_common::{PersonaKind, SessionContext};

use crate::survey::{SurveyKind, chat_page};

/// One screen of the experiment. The chat turn, where there is one, is
/// 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Intro,
    /// Participant profile and episode collection.
    Info,
    TopicSelection,
    PersonaIntro(PersonaKind),
    Chat { persona: PersonaKind, turn: u32 },
    /// Chat experience survey, shown over the chat page of the same turn.
    Survey { persona: PersonaKind, turn: u32 },
    PersonaEval(PersonaKind),
    EpisodicEval,
    Final,
}

impl Phase {
    /// True for phases that can only be left through a chat end or a
    /// survey receipt.
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            Phase::Chat { .. } | Phase::Survey { .. } | Phase::PersonaEval(_) | Phase::EpisodicEval
        )
    }

    /// The survey whose receipt unlocks this phase.
    pub fn expected_survey(&self) -> Option<SurveyKind> {
        match *self {
            Phase::Chat { persona, turn } | Phase::Survey { persona, turn } => {
                Some(SurveyKind::ChatTurn { persona, turn })
            }
            Phase::PersonaEval(persona) => Some(SurveyKind::PersonaEval(persona)),
            Phase::EpisodicEval => Some(SurveyKind::Episodic),
            _ => None,
        }
    }

    pub fn persona(&self) -> Option<PersonaKind> {
        match *self {
            Phase::PersonaIntro(p)
            | Phase::Chat { persona: p, .. }
            | Phase::Survey { persona: p, .. }
            | Phase::PersonaEval(p) => Some(p),
            _ => None,
        }
    }

    /// Page name used in the audit log.
    pub fn page(&self) -> String {
        match *self {
            Phase::Intro => "Intro".to_string(),
            Phase::Info => "Info".to_string(),
            Phase::TopicSelection => "Topic".to_string(),
            Phase::PersonaIntro(p) => format!("IntroPer{}", p.ordinal()),
            Phase::Chat { persona, turn } | Phase::Survey { persona, turn } => {
                chat_page(persona, turn)
            }
            Phase::PersonaEval(p) => SurveyKind::PersonaEval(p).page(),
            Phase::EpisodicEval => SurveyKind::Episodic.page(),
            Phase::Final => "Final".to_string(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Intro => f.write_str("Intro"),
            Phase::Info => f.write_str("Info"),
            Phase::TopicSelection => f.write_str("TopicSelection"),
            Phase::PersonaIntro(p) => write!(f, "PersonaIntro({})", p.ordinal()),
            Phase::Chat { persona, turn } => write!(f, "Chat({},{})", persona.ordinal(), turn),
            Phase::Survey { persona, turn } => {
                write!(f, "Survey({},{})", persona.ordinal(), turn)
            }
            Phase::PersonaEval(p) => write!(f, "PersonaEval({})", p.ordinal()),
            Phase::EpisodicEval => f.write_str("EpisodicEval"),
            Phase::Final => f.write_str("Final"),
        }
    }
}

/// Where a participant is. Rebuilt from the URL on every page entry and
/// replaced, never mutated, on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    pub phase: Phase,
    pub ctx: SessionContext,
}

impl FlowState {
    pub fn new(phase: Phase, ctx: SessionContext) -> Self {
        Self { phase, ctx }
    }

    /// Same participant, different phase.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ctx: self.ctx.clone(),
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.phase, self.ctx)
    }
}
