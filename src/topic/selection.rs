use std::collections::BTreeMap;
use study_common::{Category, Topic};

use super::{TOPICS_PER_CATEGORY, TopicPool};
use crate::errors::AssignError;

/// Result of toggling a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    /// The category already holds six picks; nothing changed.
    CapReached,
}

/// The participant's picks, capped at six per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSelection {
    picks: BTreeMap<Category, Vec<u32>>,
}

impl TopicSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from raw indices, applying the same cap as
    /// interactive toggling.
    pub fn from_indices(pool: &TopicPool, indices: &[u32]) -> Result<Self, AssignError> {
        let mut selection = Self::new();
        for &index in indices {
            let topic = pool.get(index).ok_or(AssignError::UnknownTopic { index })?;
            if selection.contains(topic) {
                continue;
            }
            if selection.toggle(topic) == SelectionChange::CapReached {
                return Err(AssignError::InvalidSelectionSize {
                    category: topic.category,
                    selected: indices
                        .iter()
                        .filter(|&&i| pool.get(i).map(|t| t.category) == Some(topic.category))
                        .count(),
                    required: TOPICS_PER_CATEGORY,
                });
            }
        }
        Ok(selection)
    }

    /// Add the topic if absent, remove it if present. A seventh pick in a
    /// category is refused.
    pub fn toggle(&mut self, topic: &Topic) -> SelectionChange {
        let picks = self.picks.entry(topic.category).or_default();
        if let Some(pos) = picks.iter().position(|&i| i == topic.index) {
            picks.remove(pos);
            return SelectionChange::Removed;
        }
        if picks.len() >= TOPICS_PER_CATEGORY {
            return SelectionChange::CapReached;
        }
        picks.push(topic.index);
        SelectionChange::Added
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.picks
            .get(&topic.category)
            .is_some_and(|picks| picks.contains(&topic.index))
    }

    /// Indices picked in a category, in pick order.
    pub fn picks(&self, category: Category) -> &[u32] {
        self.picks.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, category: Category) -> usize {
        self.picks(category).len()
    }

    /// True once every category holds exactly six picks.
    pub fn is_complete(&self) -> bool {
        Category::ALL
            .iter()
            .all(|&c| self.count(c) == TOPICS_PER_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::sample_pool;

    #[test]
    fn toggle_adds_then_removes() {
        let pool = sample_pool(8);
        let topic = pool.get(1).unwrap();
        let mut selection = TopicSelection::new();

        assert_eq!(selection.toggle(topic), SelectionChange::Added);
        assert!(selection.contains(topic));
        assert_eq!(selection.toggle(topic), SelectionChange::Removed);
        assert!(!selection.contains(topic));
        assert_eq!(selection.count(Category::Emotional), 0);
    }

    #[test]
    fn seventh_pick_is_refused() {
        let pool = sample_pool(8);
        let mut selection = TopicSelection::new();
        for index in 1..=6 {
            assert_eq!(
                selection.toggle(pool.get(index).unwrap()),
                SelectionChange::Added
            );
        }

        let before = selection.clone();
        assert_eq!(
            selection.toggle(pool.get(7).unwrap()),
            SelectionChange::CapReached
        );
        assert_eq!(selection, before);

        // Removing one frees a slot again
        selection.toggle(pool.get(2).unwrap());
        assert_eq!(
            selection.toggle(pool.get(7).unwrap()),
            SelectionChange::Added
        );
        assert_eq!(selection.picks(Category::Emotional), &[1, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn cap_is_per_category() {
        let pool = sample_pool(8);
        let mut selection = TopicSelection::new();
        for index in 1..=6 {
            selection.toggle(pool.get(index).unwrap());
        }
        assert_eq!(
            selection.toggle(pool.get(26).unwrap()),
            SelectionChange::Added
        );
    }

    #[test]
    fn complete_requires_six_everywhere() {
        let pool = sample_pool(6);
        let mut selection = TopicSelection::new();
        for topic in pool.iter() {
            assert!(!selection.is_complete());
            selection.toggle(topic);
        }
        assert!(selection.is_complete());
    }

    #[test]
    fn from_indices_rejects_unknown_and_overfull() {
        let pool = sample_pool(8);
        assert_eq!(
            TopicSelection::from_indices(&pool, &[1, 99]),
            Err(AssignError::UnknownTopic { index: 99 })
        );

        let err = TopicSelection::from_indices(&pool, &[1, 2, 3, 4, 5, 6, 7]).unwrap_err();
        assert_eq!(
            err,
            AssignError::InvalidSelectionSize {
                category: Category::Emotional,
                selected: 7,
                required: 6,
            }
        );
    }

    #[test]
    fn from_indices_ignores_repeats() {
        let pool = sample_pool(8);
        let selection = TopicSelection::from_indices(&pool, &[1, 1, 2]).unwrap();
        assert_eq!(selection.picks(Category::Emotional), &[1, 2]);
    }
}
