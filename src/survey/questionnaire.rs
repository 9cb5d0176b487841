//! Fixed question sets and the keys a complete answer must carry.

use std::collections::BTreeMap;
use std::fmt;
use study_common::PersonaKind;

use crate::remote::{GeneratedEpisodes, RoleEpisodes};

/// Asked after every chat turn.
pub const CHAT_TURN_QUESTIONS: [&str; 8] = [
    "I find this conversation satisfying.",
    "I'm able to immerse myself in this conversation.",
    "This conversation is engaging and creative.",
    "This conversation feels like talking to a real person.",
    "This conversation provides appropriate and useful information on the topic.",
    "The responses in this conversation are flexible and not mechanical.",
    "The responses in this conversation are not superficial but have depth.",
    "The responses in this conversation are complete.",
];

/// Asked once per persona after its tenth turn.
pub const PERSONA_EVAL_QUESTIONS: [&str; 18] = [
    "This persona is interesting.",
    "This persona feels like it has a personality.",
    "I feel a strong connection with this persona.",
    "I feel that this persona understands me well.",
    "I feel that this persona acknowledges the different aspects of myself.",
    "I feel that this persona well reflects my personality.",
    "I feel that this persona well reflects my experiences.",
    "Conversations with this persona help me understand myself more deeply.",
    "Talking with this persona let me take a step back from my situation.",
    "With this persona I could express myself freely, outside others' expectations and my social roles.",
    "With this persona I could respond as my real self, not the self I want to show.",
    "Talking with this persona made me reconsider my feelings and actions.",
    "Talking with this persona made me reflect on my thoughts.",
    "Talking with this persona helped me accept myself more.",
    "Talking with this persona made me try to understand myself rather than criticize myself.",
    "I want to know this persona better.",
    "I would come back to this persona when I need to.",
    "I want to keep talking with this persona.",
];

/// Response key stem of each episode criterion. Stored episodic answers
/// carry these exact strings, truncated third item included.
pub const EPISODE_KEYS: [&str; 4] = [
    "Q1. This experience is likely to occur in real life.",
    "Q2. This experience helps represent who I am.",
    "Q3. This experience is  ",
    "Q4. In relation to my roles, I have had similar experiences to this one.",
];

/// Rated for every augmented episode, shown in place of [`EPISODE_KEYS`].
pub const EPISODE_CRITERIA: [&str; 4] = [
    "Q1. This experience is likely to occur in real life.",
    "Q2. This experience helps represent who I am.",
    "Q3. This experience is distinct from my previously provided experiences.",
    "Q4. In relation to my roles, I have had similar experiences to this one.",
];

/// Which survey a set of answers belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyKind {
    ChatTurn { persona: PersonaKind, turn: u32 },
    PersonaEval(PersonaKind),
    Episodic,
}

impl SurveyKind {
    /// Page name used in the audit log.
    pub fn page(&self) -> String {
        match self {
            SurveyKind::ChatTurn { persona, turn } => chat_page(*persona, *turn),
            SurveyKind::PersonaEval(persona) => format!("PerEval({})", persona.slug()),
            SurveyKind::Episodic => "EpiEval".to_string(),
        }
    }
}

impl fmt::Display for SurveyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyKind::ChatTurn { persona, turn } => {
                write!(f, "chat survey {}/{}", persona.ordinal(), turn)
            }
            SurveyKind::PersonaEval(persona) => write!(f, "{} persona evaluation", persona),
            SurveyKind::Episodic => f.write_str("episode evaluation"),
        }
    }
}

/// Page name of a chat turn, e.g. `chat1(tag)/3`.
pub fn chat_page(persona: PersonaKind, turn: u32) -> String {
    format!("chat{}({})/{}", persona.ordinal(), persona.slug(), turn)
}

/// An augmented episode shown on the episodic evaluation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub role: String,
    /// `Episode 1`, `Episode 2`, ... within the role.
    pub title: String,
    pub content: String,
}

/// Flatten the backend's role → episodes map, keeping the served role order.
pub fn episodes_from_experiencable(experiencable: &GeneratedEpisodes) -> Vec<Episode> {
    experiencable
        .iter()
        .flat_map(|(role, episodes)| {
            episodes.iter().enumerate().map(move |(i, content)| Episode {
                role: role.to_string(),
                title: format!("Episode {}", i + 1),
                content: content.clone(),
            })
        })
        .collect()
}

/// The participant's own earlier episodes for `role`, shown next to the
/// distinctness criterion.
pub fn prior_experiences<'a>(
    identities: &'a BTreeMap<String, RoleEpisodes>,
    role: &str,
) -> Vec<&'a str> {
    identities
        .get(role)
        .map(RoleEpisodes::episodes)
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub key: String,
    pub text: String,
    /// Index into [`Questionnaire::episodes`] for episodic questions.
    pub episode: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Questionnaire {
    kind: SurveyKind,
    questions: Vec<Question>,
    episodes: Vec<Episode>,
}

impl Questionnaire {
    pub fn chat_turn(persona: PersonaKind, turn: u32) -> Self {
        Self::numbered(SurveyKind::ChatTurn { persona, turn }, &CHAT_TURN_QUESTIONS)
    }

    pub fn persona_eval(persona: PersonaKind) -> Self {
        Self::numbered(SurveyKind::PersonaEval(persona), &PERSONA_EVAL_QUESTIONS)
    }

    /// One question per episode and criterion, keyed `{episode}_{criterion}`
    /// with a 0-based episode index.
    pub fn episodic(episodes: Vec<Episode>) -> Self {
        let questions = (0..episodes.len())
            .flat_map(|i| {
                EPISODE_KEYS
                    .iter()
                    .zip(EPISODE_CRITERIA)
                    .map(move |(key, text)| Question {
                        key: format!("{}_{}", i, key),
                        text: text.to_string(),
                        episode: Some(i),
                    })
            })
            .collect();
        Self {
            kind: SurveyKind::Episodic,
            questions,
            episodes,
        }
    }

    fn numbered(kind: SurveyKind, texts: &[&str]) -> Self {
        let questions = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Question {
                key: format!("Q{}", i + 1),
                text: text.to_string(),
                episode: None,
            })
            .collect();
        Self {
            kind,
            questions,
            episodes: Vec::new(),
        }
    }

    pub fn kind(&self) -> SurveyKind {
        self.kind
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_turn_keys_are_one_based() {
        let q = Questionnaire::chat_turn(PersonaKind::Tag, 1);
        let keys: Vec<_> = q.required_keys().collect();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], "Q1");
        assert_eq!(keys[7], "Q8");
    }

    #[test]
    fn persona_eval_has_eighteen_questions() {
        let q = Questionnaire::persona_eval(PersonaKind::Epi);
        assert_eq!(q.questions().len(), 18);
        assert_eq!(q.kind(), SurveyKind::PersonaEval(PersonaKind::Epi));
    }

    #[test]
    fn episodic_keys_cross_entities_and_criteria() {
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
        let q = Questionnaire::episodic(episodes);
        let keys: Vec<_> = q.required_keys().collect();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], format!("0_{}", EPISODE_KEYS[0]));
        assert_eq!(keys[7], format!("1_{}", EPISODE_KEYS[3]));
        assert_eq!(q.questions()[5].episode, Some(1));
    }

    #[test]
    fn distinctness_key_keeps_stored_stem() {
        let q = Questionnaire::episodic(vec![Episode {
            role: "Dreamer".into(),
            title: "Episode 1".into(),
            content: "a".into(),
        }]);
        let third = &q.questions()[2];
        assert_eq!(third.key, "0_Q3. This experience is  ");
        assert_eq!(
            third.text,
            "Q3. This experience is distinct from my previously provided experiences."
        );
    }

    #[test]
    fn episodes_are_flattened_in_served_role_order() {
        let experiencable = GeneratedEpisodes::from_iter([
            ("Rural-born", vec!["x".to_string()]),
            ("Eldest daughter", vec!["y".to_string(), "z".to_string()]),
        ]);

        let episodes = episodes_from_experiencable(&experiencable);
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].role, "Rural-born");
        assert_eq!(episodes[1].role, "Eldest daughter");
        assert_eq!(episodes[2].title, "Episode 2");
    }

    #[test]
    fn episodic_keys_follow_served_role_order() {
        let json = r#"{"Zookeeper": ["fed lions"], "Artist": ["painted"]}"#;
        let experiencable: GeneratedEpisodes = serde_json::from_str(json).unwrap();
        let q = Questionnaire::episodic(episodes_from_experiencable(&experiencable));

        assert_eq!(q.episodes()[0].role, "Zookeeper");
        let first = &q.questions()[0];
        assert_eq!(first.key, format!("0_{}", EPISODE_KEYS[0]));
        assert_eq!(q.episodes()[first.episode.unwrap()].content, "fed lions");
    }

    #[test]
    fn pages_match_audit_log_names() {
        let turn = SurveyKind::ChatTurn {
            persona: PersonaKind::Epi,
            turn: 4,
        };
        assert_eq!(turn.page(), "chat2(epi)/4");
        assert_eq!(SurveyKind::PersonaEval(PersonaKind::Tag).page(), "PerEval(tag)");
        assert_eq!(SurveyKind::Episodic.page(), "EpiEval");
    }

    #[test]
    fn prior_experiences_skip_blank_episodes() {
        let mut identities = BTreeMap::new();
        identities.insert(
            "Dreamer".to_string(),
            RoleEpisodes {
                role: String::new(),
                ep1: "Wrote a novel".into(),
                ep2: " ".into(),
            },
        );
        assert_eq!(prior_experiences(&identities, "Dreamer"), vec!["Wrote a novel"]);
        assert!(prior_experiences(&identities, "Other").is_empty());
    }
}
