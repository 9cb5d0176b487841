//! Terminal rendering of a participant session.

pub mod icons;
pub mod terminal;
pub mod transcript;

pub use terminal::TerminalIo;
pub use transcript::{ReplyView, wrap_width};
