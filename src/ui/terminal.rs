//! Interactive [`ParticipantIo`] on a terminal, built on `dialoguer`.

use anyhow::{Result, bail};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use std::collections::BTreeMap;
use study_common::{Category, Message, PersonaKind, TURNS_PER_PERSONA};

use super::icons::{CHECK, CROSS, EPISODE, SPARKLE, SURVEY, TOPIC, WARN};
use super::transcript::{ReplyView, wrap_width};
use crate::chat::{ChatTurn, SubmitOutcome};
use crate::flow::Phase;
use crate::remote::{RoleEpisodes, UserInfo};
use crate::runner::{ChatAction, ParticipantIo};
use crate::survey::{LIKERT_RANGE, Questionnaire, SurveyKind, SurveyResponse, prior_experiences};
use crate::topic::{SelectionChange, TOPICS_PER_CATEGORY, TopicPool, TopicSelection};

/// Typed at the chat prompt to end the turn.
pub const END_COMMAND: &str = "/end";

/// Roles collected on the info page.
const ROLES: usize = 3;

const LIKERT_LABELS: [&str; 7] = [
    "1 - Strongly disagree",
    "2 - Disagree",
    "3 - Somewhat disagree",
    "4 - Neutral",
    "5 - Somewhat agree",
    "6 - Agree",
    "7 - Strongly agree",
];

pub struct TerminalIo {
    theme: ColorfulTheme,
    reply: ReplyView,
}

impl Default for TerminalIo {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalIo {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            reply: ReplyView::new(PersonaKind::Tag),
        }
    }

    fn header(&self, title: &str) {
        println!();
        println!("{}", style(title).bold().underlined());
    }

    fn paragraph(&self, text: &str) {
        println!("{}", textwrap::fill(text, wrap_width()));
    }

    fn text(&self, prompt: &str) -> Result<String> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn likert(&self, prompt: &str) -> Result<i32> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&LIKERT_LABELS)
            .default(3)
            .interact()?;
        Ok(*LIKERT_RANGE.start() + choice as i32)
    }

    fn show_episode(
        &self,
        questionnaire: &Questionnaire,
        index: usize,
        prior: &BTreeMap<String, RoleEpisodes>,
    ) {
        let Some(episode) = questionnaire.episodes().get(index) else {
            return;
        };
        self.header(&format!("{}{} ({})", EPISODE, episode.title, episode.role));
        self.paragraph(&episode.content);

        let mine = prior_experiences(prior, &episode.role);
        if !mine.is_empty() {
            println!("{}", style("Your experiences in this role:").dim());
            for experience in mine {
                println!("  - {}", experience);
            }
        }
    }
}

impl ParticipantIo for TerminalIo {
    fn participant_id(&mut self) -> Result<String> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt("Participant ID")
            .interact_text()?)
    }

    fn acknowledge(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Intro => {
                self.header(&format!("{}Welcome", SPARKLE));
                self.paragraph(
                    "You will pick conversation topics, talk with two AI personas for ten \
                     short chats each, and answer a few questions after every chat.",
                );
            }
            Phase::PersonaIntro(persona) => {
                self.reply.set_persona(persona);
                self.header(&format!("Persona {}", persona.ordinal()));
                self.paragraph(&format!(
                    "You will now have {} chats with the {} persona. Each chat has its own \
                     topic. Type {} when you are done with a chat.",
                    TURNS_PER_PERSONA, persona, END_COMMAND
                ));
            }
            Phase::Final => {
                self.header(&format!("{}Thank you", CHECK));
                self.paragraph("All your answers have been recorded. You may close this window.");
                return Ok(());
            }
            other => self.header(&other.page()),
        }

        let go_on = Confirm::with_theme(&self.theme)
            .with_prompt("Continue?")
            .default(true)
            .interact()?;
        if !go_on {
            bail!("Participant stopped at {}", phase);
        }
        Ok(())
    }

    fn user_info(&mut self) -> Result<UserInfo> {
        self.header("About you");
        let mut info = UserInfo {
            age: self.text("Age")?,
            gender: self.text("Gender")?,
            job: self.text("Occupation")?,
            major: self.text("Major")?,
            mbti: self.text("MBTI")?,
            self_tag: self.text("Words that describe you (comma separated)")?,
            ..Default::default()
        };

        println!(
            "{}",
            style("Describe up to three roles you have, with two experiences for each.").dim()
        );
        for n in 1..=ROLES {
            let role = self.text(&format!("Role {}", n))?;
            if role.trim().is_empty() {
                continue;
            }
            let entry = RoleEpisodes {
                ep1: self.text(&format!("Role {} experience 1", n))?,
                ep2: self.text(&format!("Role {} experience 2", n))?,
                role,
            };
            info.episodes.insert(format!("Role {}", n), entry);
        }
        Ok(info)
    }

    fn select_topics(&mut self, pool: &TopicPool, selection: &mut TopicSelection) -> Result<()> {
        for category in Category::ALL {
            let topics: Vec<_> = pool.in_category(category).collect();
            let labels: Vec<String> = topics.iter().map(|t| t.title.clone()).collect();
            let defaults: Vec<bool> = topics.iter().map(|t| selection.contains(t)).collect();

            self.header(&format!(
                "{}{} topics ({}/{})",
                TOPIC,
                category,
                selection.count(category),
                TOPICS_PER_CATEGORY
            ));
            let chosen = MultiSelect::with_theme(&self.theme)
                .with_prompt(format!("Pick {} topics", TOPICS_PER_CATEGORY))
                .items(&labels)
                .defaults(&defaults)
                .interact()?;

            // Removals first so a swap within the cap goes through.
            for (i, topic) in topics.iter().enumerate() {
                if defaults[i] && !chosen.contains(&i) {
                    selection.toggle(topic);
                }
            }
            for &i in &chosen {
                if !defaults[i] && selection.toggle(topics[i]) == SelectionChange::CapReached {
                    self.notice(&format!(
                        "Only {} topics per category; \"{}\" was not added.",
                        TOPICS_PER_CATEGORY, topics[i].title
                    ));
                }
            }
        }

        if !selection.is_complete() {
            self.notice(&format!(
                "Pick exactly {} topics in every category.",
                TOPICS_PER_CATEGORY
            ));
        }
        Ok(())
    }

    fn chat_input(&mut self, turn: &ChatTurn, transcript: &[Message]) -> Result<ChatAction> {
        if transcript.is_empty() {
            self.reply.set_persona(turn.persona);
            self.header(&format!(
                "Chat {}/{} with the {} persona",
                turn.turn, TURNS_PER_PERSONA, turn.persona
            ));
            println!("{} {}", style("Topic:").dim(), turn.topic);
        }

        let text = Input::<String>::with_theme(&self.theme)
            .with_prompt(format!("Message ({} to finish)", END_COMMAND))
            .interact_text()?;
        if text.trim() == END_COMMAND {
            return Ok(ChatAction::End);
        }
        Ok(ChatAction::Send(text))
    }

    fn reply_pending(&mut self) {
        self.reply.start();
    }

    fn reply_progress(&mut self, transcript: &[Message]) {
        self.reply.update(transcript);
    }

    fn reply_finished(&mut self, outcome: &SubmitOutcome) {
        self.reply.finish();
        match outcome {
            SubmitOutcome::Failed(err) => eprintln!(
                "{}{}",
                CROSS,
                style(format!("The persona could not answer: {}", err)).red()
            ),
            SubmitOutcome::Cancelled => eprintln!("{}", style("Reply cancelled.").dim()),
            SubmitOutcome::Completed | SubmitOutcome::Dropped => {}
        }
    }

    fn rate(
        &mut self,
        questionnaire: &Questionnaire,
        prior: &BTreeMap<String, RoleEpisodes>,
    ) -> Result<SurveyResponse> {
        let title = match questionnaire.kind() {
            SurveyKind::ChatTurn { .. } => "How was this chat?".to_string(),
            SurveyKind::PersonaEval(persona) => format!("About the {} persona", persona),
            SurveyKind::Episodic => "About these experiences".to_string(),
        };
        self.header(&format!("{}{}", SURVEY, title));

        let mut responses = SurveyResponse::new();
        let mut shown_episode = None;
        for question in questionnaire.questions() {
            if question.episode.is_some() && question.episode != shown_episode {
                shown_episode = question.episode;
                if let Some(index) = shown_episode {
                    self.show_episode(questionnaire, index, prior);
                }
            }
            let answer = self.likert(&question.text)?;
            responses.insert(question.key.clone(), answer);
        }
        Ok(responses)
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{}{}", WARN, style(message).yellow());
    }
}

