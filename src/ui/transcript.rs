//! Chat transcript rendering.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use study_common::{Message, PersonaKind};
use terminal_size::{Width, terminal_size};

use super::icons::{PARTICIPANT, PERSONA};

const DEFAULT_WIDTH: usize = 80;
const MAX_WIDTH: usize = 100;

/// Column count to wrap at: the terminal width, capped for readability.
pub fn wrap_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_WIDTH)
        .clamp(20, MAX_WIDTH)
}

fn speaker(message: &Message, persona: PersonaKind) -> String {
    if message.is_agent() {
        format!("{}{} persona", PERSONA, persona)
    } else {
        format!("{}You", PARTICIPANT)
    }
}

/// Live view of one streaming reply: a spinner until the first chunk, then
/// the reply text as it arrives.
pub struct ReplyView {
    persona: PersonaKind,
    spinner: Option<ProgressBar>,
    /// Bytes of the current reply already written.
    printed: usize,
}

impl ReplyView {
    pub fn new(persona: PersonaKind) -> Self {
        Self {
            persona,
            spinner: None,
            printed: 0,
        }
    }

    pub fn set_persona(&mut self, persona: PersonaKind) {
        self.persona = persona;
    }

    pub fn start(&mut self) {
        self.clear_spinner();
        self.printed = 0;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {msg}")
                .expect("progress bar template is a valid static string"),
        );
        spinner.set_prefix(format!("{}", PERSONA));
        spinner.set_message(format!("{} persona is typing...", self.persona));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Write whatever part of the latest agent message is new.
    pub fn update(&mut self, transcript: &[Message]) {
        let Some(reply) = transcript.last().filter(|m| m.is_agent()) else {
            return;
        };
        let Some(delta) = reply.content.get(self.printed..) else {
            return;
        };
        if delta.is_empty() {
            return;
        }

        if self.spinner.is_some() {
            self.clear_spinner();
            println!("{}", style(speaker(reply, self.persona)).cyan().bold());
            print!("    ");
        }
        print!("{}", delta.replace('\n', "\n    "));
        let _ = std::io::stdout().flush();
        self.printed = reply.content.len();
    }

    /// Close the reply. Returns true if any text was shown.
    pub fn finish(&mut self) -> bool {
        let shown = self.printed > 0;
        self.clear_spinner();
        if shown {
            println!();
        }
        self.printed = 0;
        shown
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tracks_printed_bytes() {
        let mut view = ReplyView::new(PersonaKind::Tag);
        view.update(&[Message::user("hi"), Message::agent("Hé")]);
        assert_eq!(view.printed, "Hé".len());
        view.update(&[Message::user("hi"), Message::agent("Héllo")]);
        assert_eq!(view.printed, "Héllo".len());
        assert!(view.finish());
        assert_eq!(view.printed, 0);
    }

    #[test]
    fn update_ignores_user_message() {
        let mut view = ReplyView::new(PersonaKind::Tag);
        view.update(&[Message::user("hi")]);
        assert!(!view.finish());
    }

    #[test]
    fn width_is_bounded() {
        let width = wrap_width();
        assert!((20..=MAX_WIDTH).contains(&width));
    }
}
