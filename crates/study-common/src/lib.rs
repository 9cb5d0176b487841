//! Shared domain types for the persona-study orchestrator.
//!
//! Everything here is plain data: participant identity, the static topic
//! model, chat messages and the two persona conditions. Behaviour lives in
//! the `persona-study` crate.

pub mod identity;
pub mod message;
pub mod persona;
pub mod topic;

pub use identity::{ParticipantId, SessionContext, UNKNOWN_PARTICIPANT};
pub use message::{Message, Role};
pub use persona::PersonaKind;
pub use topic::{Category, Topic};

/// Number of chat turns each persona condition runs for.
pub const TURNS_PER_PERSONA: u32 = 10;
