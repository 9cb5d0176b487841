pub mod pacing;
pub mod session;
pub mod stream;

pub use pacing::{DEFAULT_PACING, Pacer};
pub use session::{ChatState, ChatTurn, END_CHAT_BUTTON, StreamingChatSession, SubmitOutcome};
pub use stream::Utf8ChunkDecoder;
