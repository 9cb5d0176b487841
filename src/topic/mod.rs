//! Topic pool, per-category selection and counterbalanced assignment.
//!
//! The pool is the static list of conversation topics shipped with a study
//! (`topics.json`). A participant picks six topics per category through a
//! [`TopicSelection`]; [`assign`] then splits those eighteen picks between
//! the two personas.

pub mod assigner;
pub mod selection;

pub use assigner::{TopicAssignment, assign};
pub use selection::{SelectionChange, TopicSelection};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use study_common::{Category, Topic};

/// Topics each participant must pick in every category.
pub const TOPICS_PER_CATEGORY: usize = 6;

/// One entry of `topics.json`. The original pool files carry bilingual
/// `title_en`/`title_ko` fields and no explicit category.
#[derive(Debug, Deserialize)]
struct TopicRecord {
    index: u32,
    #[serde(default)]
    category: Option<Category>,
    #[serde(alias = "title_en")]
    title: String,
    #[serde(default, alias = "description_en")]
    description: String,
}

/// Read-only pool of topics keyed by index.
#[derive(Debug, Clone, Default)]
pub struct TopicPool {
    topics: BTreeMap<u32, Topic>,
}

impl TopicPool {
    /// Build a pool from already-typed topics. Duplicate indices are rejected.
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for topic in topics {
            let index = topic.index;
            if map.insert(index, topic).is_some() {
                bail!("Duplicate topic index {} in topic pool", index);
            }
        }
        Ok(Self { topics: map })
    }

    /// Load a pool from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topic pool: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse topic pool: {}", path.display()))
    }

    /// Parse a pool from a JSON array.
    pub fn parse(content: &str) -> Result<Self> {
        let records: Vec<TopicRecord> =
            serde_json::from_str(content).context("Topic pool must be a JSON array")?;

        let mut topics = Vec::with_capacity(records.len());
        for record in records {
            let category = match record.category.or_else(|| Category::for_index(record.index)) {
                Some(category) => category,
                None => bail!(
                    "Topic {} has no category and its index is outside 1-76",
                    record.index
                ),
            };
            topics.push(Topic::new(
                record.index,
                category,
                record.title,
                record.description,
            ));
        }
        Self::new(topics)
    }

    pub fn get(&self, index: u32) -> Option<&Topic> {
        self.topics.get(&index)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Topic> {
        self.topics.values().filter(move |t| t.category == category)
    }

    /// Warnings for pools too small to support a full selection.
    pub fn validate(&self) -> Vec<String> {
        Category::ALL
            .iter()
            .filter_map(|&category| {
                let available = self.in_category(category).count();
                (available < TOPICS_PER_CATEGORY).then(|| {
                    format!(
                        "{} has only {} topics, {} are needed",
                        category, available, TOPICS_PER_CATEGORY
                    )
                })
            })
            .collect()
    }
}

/// A pool with `per_category` topics in each category, numbered inside the
/// standard index bands. Used by tests across the crate.
#[cfg(test)]
pub(crate) fn sample_pool(per_category: u32) -> TopicPool {
    let bands = [
        (Category::Emotional, 1),
        (Category::Appraisal, 26),
        (Category::Informational, 51),
    ];
    let topics = bands.iter().flat_map(|&(category, start)| {
        (start..start + per_category).map(move |index| {
            Topic::new(
                index,
                category,
                format!("Topic {}", index),
                format!("Description {}", index),
            )
        })
    });
    TopicPool::new(topics).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_derives_category_from_index() {
        let json = r#"[
            {"index": 3, "title_en": "Lonely weekends", "description_en": "Feeling alone", "title_ko": "주말"},
            {"index": 30, "title_en": "Career feedback"},
            {"index": 60, "title": "Visa paperwork", "description": "Forms", "category": "Informational"}
        ]"#;
        let pool = TopicPool::parse(json).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(3).unwrap().category, Category::Emotional);
        assert_eq!(pool.get(3).unwrap().title, "Lonely weekends");
        assert_eq!(pool.get(30).unwrap().category, Category::Appraisal);
        assert_eq!(pool.get(30).unwrap().description, "");
        assert_eq!(pool.get(60).unwrap().category, Category::Informational);
    }

    #[test]
    fn parse_rejects_duplicate_index() {
        let json = r#"[{"index": 1, "title": "a"}, {"index": 1, "title": "b"}]"#;
        let err = TopicPool::parse(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate topic index 1"));
    }

    #[test]
    fn parse_rejects_uncategorized_out_of_band_index() {
        let json = r#"[{"index": 90, "title": "stray"}]"#;
        assert!(TopicPool::parse(json).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topics.json");
        std::fs::write(&path, r#"[{"index": 51, "title_en": "Budgeting"}]"#).unwrap();
        let pool = TopicPool::load(&path).unwrap();
        assert_eq!(pool.in_category(Category::Informational).count(), 1);
    }

    #[test]
    fn validate_flags_small_categories() {
        let pool = sample_pool(6);
        assert!(pool.validate().is_empty());

        let pool = sample_pool(5);
        assert_eq!(pool.validate().len(), 3);
    }
}
