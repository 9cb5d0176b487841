//! Counterbalanced split of a participant's topic selection.
//!
//! For every category the six picks are shuffled and cut in half: the first
//! three go to persona A (Tag), the last three to persona B (Epi). Each
//! persona's nine topics are then shuffled again so the category order is
//! not observable during the chat phases.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use study_common::{Category, PersonaKind, Topic};

use super::{TOPICS_PER_CATEGORY, TopicPool, TopicSelection};
use crate::errors::AssignError;

/// Topics each persona receives from a single category.
pub const TOPICS_PER_PERSONA_PER_CATEGORY: usize = TOPICS_PER_CATEGORY / 2;

/// Two disjoint ordered topic lists, one per persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub persona_a: Vec<Topic>,
    pub persona_b: Vec<Topic>,
}

impl TopicAssignment {
    pub fn for_persona(&self, persona: PersonaKind) -> &[Topic] {
        match persona {
            PersonaKind::Tag => &self.persona_a,
            PersonaKind::Epi => &self.persona_b,
        }
    }
}

/// Split `selection` between the two personas.
///
/// Call once per participant; persisting the result is the caller's job.
pub fn assign<R: Rng + ?Sized>(
    pool: &TopicPool,
    selection: &TopicSelection,
    rng: &mut R,
) -> Result<TopicAssignment, AssignError> {
    for category in Category::ALL {
        let selected = selection.count(category);
        if selected != TOPICS_PER_CATEGORY {
            return Err(AssignError::InvalidSelectionSize {
                category,
                selected,
                required: TOPICS_PER_CATEGORY,
            });
        }
    }

    let mut persona_a = Vec::with_capacity(TOPICS_PER_PERSONA_PER_CATEGORY * Category::ALL.len());
    let mut persona_b = Vec::with_capacity(persona_a.capacity());

    for category in Category::ALL {
        let mut topics = resolve(pool, category, selection.picks(category))?;
        topics.shuffle(rng);
        let second_half = topics.split_off(TOPICS_PER_PERSONA_PER_CATEGORY);
        persona_a.extend(topics);
        persona_b.extend(second_half);
    }

    persona_a.shuffle(rng);
    persona_b.shuffle(rng);

    tracing::debug!(
        persona_a = ?persona_a.iter().map(|t| t.index).collect::<Vec<_>>(),
        persona_b = ?persona_b.iter().map(|t| t.index).collect::<Vec<_>>(),
        "Counterbalanced topic selection"
    );

    Ok(TopicAssignment {
        persona_a,
        persona_b,
    })
}

fn resolve(pool: &TopicPool, category: Category, indices: &[u32]) -> Result<Vec<Topic>, AssignError> {
    indices
        .iter()
        .map(|&index| {
            let topic = pool.get(index).ok_or(AssignError::UnknownTopic { index })?;
            if topic.category != category {
                return Err(AssignError::CategoryMismatch {
                    index,
                    expected: category,
                    actual: topic.category,
                });
            }
            Ok(topic.clone())
        })
        .collect()
}
