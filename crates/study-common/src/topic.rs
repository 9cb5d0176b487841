use serde::{Deserialize, Serialize};
use std::fmt;

/// Support category a conversation topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Informational,
    Emotional,
    Appraisal,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Informational,
        Category::Emotional,
        Category::Appraisal,
    ];

    /// Category implied by the index band of the standard 76-topic pool:
    /// 1-25 emotional, 26-50 appraisal, 51-76 informational.
    pub fn for_index(index: u32) -> Option<Self> {
        match index {
            1..=25 => Some(Category::Emotional),
            26..=50 => Some(Category::Appraisal),
            51..=76 => Some(Category::Informational),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Informational => "Informational Support",
            Category::Emotional => "Emotional Support",
            Category::Appraisal => "Appraisal Support",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub index: u32,
    pub category: Category,
    pub title: String,
    pub description: String,
}

impl Topic {
    pub fn new(
        index: u32,
        category: Category,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            index,
            category,
            title: title.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_bands_map_to_categories() {
        assert_eq!(Category::for_index(1), Some(Category::Emotional));
        assert_eq!(Category::for_index(25), Some(Category::Emotional));
        assert_eq!(Category::for_index(26), Some(Category::Appraisal));
        assert_eq!(Category::for_index(50), Some(Category::Appraisal));
        assert_eq!(Category::for_index(51), Some(Category::Informational));
        assert_eq!(Category::for_index(76), Some(Category::Informational));
        assert_eq!(Category::for_index(0), None);
        assert_eq!(Category::for_index(77), None);
    }
}
