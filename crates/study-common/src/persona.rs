use serde::{Deserialize, Serialize};
use std::fmt;

/// The two persona conditions a participant chats with, in order.
///
/// `Tag` is persona 1 and `Epi` is persona 2; the ordinal appears in every
/// URL and session id (`chat1/3`, `/pereval/tag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonaKind {
    Tag,
    Epi,
}

impl PersonaKind {
    pub const ALL: [PersonaKind; 2] = [PersonaKind::Tag, PersonaKind::Epi];

    /// 1-based position in the experiment.
    pub fn ordinal(self) -> u32 {
        match self {
            PersonaKind::Tag => 1,
            PersonaKind::Epi => 2,
        }
    }

    pub fn from_ordinal(n: u32) -> Option<Self> {
        match n {
            1 => Some(PersonaKind::Tag),
            2 => Some(PersonaKind::Epi),
            _ => None,
        }
    }

    /// Lowercase slug used in page names and evaluation URLs.
    pub fn slug(self) -> &'static str {
        match self {
            PersonaKind::Tag => "tag",
            PersonaKind::Epi => "epi",
        }
    }

    /// Value sent as `persona_type`.
    pub fn wire_name(self) -> &'static str {
        match self {
            PersonaKind::Tag => "Tag",
            PersonaKind::Epi => "Epi",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            PersonaKind::Tag => Some(PersonaKind::Epi),
            PersonaKind::Epi => None,
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip() {
        for persona in PersonaKind::ALL {
            assert_eq!(PersonaKind::from_ordinal(persona.ordinal()), Some(persona));
        }
        assert_eq!(PersonaKind::from_ordinal(3), None);
    }

    #[test]
    fn serializes_as_wire_name() {
        assert_eq!(serde_json::to_string(&PersonaKind::Epi).unwrap(), "\"Epi\"");
    }

    #[test]
    fn epi_is_last() {
        assert_eq!(PersonaKind::Tag.next(), Some(PersonaKind::Epi));
        assert_eq!(PersonaKind::Epi.next(), None);
    }
}
