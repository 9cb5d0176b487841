//! URL ⇄ [`FlowState`].
//!
//! Pages are loaded independently, so a URL has to carry everything needed
//! to rebuild the state: the phase in the path, the participant in the
//! `participantId` query parameter.

use study_common::{PersonaKind, SessionContext, TURNS_PER_PERSONA};
use url::{ParseError, Position, Url};

use super::{FlowState, Phase};
use crate::errors::FlowError;

pub const PARTICIPANT_PARAM: &str = "participantId";

/// Base used to resolve path-only input.
const LOCAL_BASE: &str = "http://localhost/";

/// Path of a phase. A survey shares its chat page's path.
pub fn path(phase: Phase) -> String {
    match phase {
        Phase::Intro => "/".to_string(),
        Phase::Info => "/info".to_string(),
        Phase::TopicSelection => "/topic".to_string(),
        Phase::PersonaIntro(p) => format!("/introper{}", p.ordinal()),
        Phase::Chat { persona, turn } | Phase::Survey { persona, turn } => {
            format!("/chat{}/{}", persona.ordinal(), turn)
        }
        Phase::PersonaEval(p) => format!("/pereval/{}", p.slug()),
        Phase::EpisodicEval => "/epieval".to_string(),
        Phase::Final => "/final".to_string(),
    }
}

/// Path and query of a state, e.g. `/chat1/3?participantId=P7`. The
/// parameter is omitted for an unknown participant.
pub fn to_url(state: &FlowState) -> String {
    match Url::parse(LOCAL_BASE) {
        Ok(base) => absolute(&base, state)[Position::BeforePath..].to_string(),
        Err(_) => path(state.phase),
    }
}

/// A state's page on a concrete host.
pub fn absolute(base: &Url, state: &FlowState) -> Url {
    let mut url = base.clone();
    url.set_path(&path(state.phase));
    url.set_query(None);
    if let Some(id) = state.ctx.participant() {
        url.query_pairs_mut().append_pair(PARTICIPANT_PARAM, id.as_str());
    }
    url
}

/// Rebuild a state from an absolute URL or a path with optional query.
pub fn parse(input: &str) -> Result<FlowState, FlowError> {
    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(LOCAL_BASE)
            .and_then(|base| base.join(input))
            .map_err(|_| FlowError::InvalidUrl(input.to_string()))?,
        Err(_) => return Err(FlowError::InvalidUrl(input.to_string())),
    };

    let participant = url
        .query_pairs()
        .find(|(key, _)| key == PARTICIPANT_PARAM)
        .map(|(_, value)| value.into_owned());
    let ctx = SessionContext::from_param(participant.as_deref());

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let phase = match segments.as_slice() {
        [] => Phase::Intro,
        ["info"] => Phase::Info,
        ["topic"] => Phase::TopicSelection,
        ["introper1"] => Phase::PersonaIntro(PersonaKind::Tag),
        ["introper2"] => Phase::PersonaIntro(PersonaKind::Epi),
        ["chat1", turn] => Phase::Chat {
            persona: PersonaKind::Tag,
            turn: parse_turn(turn)?,
        },
        ["chat2", turn] => Phase::Chat {
            persona: PersonaKind::Epi,
            turn: parse_turn(turn)?,
        },
        ["pereval", "tag"] => Phase::PersonaEval(PersonaKind::Tag),
        ["pereval", "epi"] => Phase::PersonaEval(PersonaKind::Epi),
        ["epieval"] => Phase::EpisodicEval,
        ["final"] => Phase::Final,
        _ => return Err(FlowError::UnknownRoute(url.path().to_string())),
    };

    Ok(FlowState::new(phase, ctx))
}

fn parse_turn(raw: &str) -> Result<u32, FlowError> {
    raw.parse::<u32>()
        .ok()
        .filter(|t| (1..=TURNS_PER_PERSONA).contains(t))
        .ok_or_else(|| FlowError::InvalidTurn {
            raw: raw.to_string(),
            max: TURNS_PER_PERSONA,
        })
}
