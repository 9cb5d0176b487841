//! Shared UI icons.

use console::Emoji;

// Status
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Speakers
pub static PARTICIPANT: Emoji<'_, '_> = Emoji("🙂 ", "");
pub static PERSONA: Emoji<'_, '_> = Emoji("🤖 ", "");

// Pages
pub static TOPIC: Emoji<'_, '_> = Emoji("📋 ", "");
pub static SURVEY: Emoji<'_, '_> = Emoji("📝 ", "");
pub static EPISODE: Emoji<'_, '_> = Emoji("📖 ", "");
