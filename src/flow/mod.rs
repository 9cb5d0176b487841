//! Navigation through the experiment.
//!
//! `Intro → Info → TopicSelection → PersonaIntro(1) → [Chat → Survey] × 10 →
//! PersonaEval(1) → PersonaIntro(2) → [Chat → Survey] × 10 → PersonaEval(2) →
//! EpisodicEval → Final`

pub mod controller;
pub mod phase;
pub mod route;

pub use controller::FlowController;
pub use phase::{FlowState, Phase};
