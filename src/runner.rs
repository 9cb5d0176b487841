//! Drives one participant through the whole study.
//!
//! [`StudyRunner`] owns the remote backend, the event logger and the topic
//! pool, and walks a [`FlowState`] from wherever it starts to `Final`. All
//! interaction with the participant goes through [`ParticipantIo`], so the
//! same loop serves the terminal and scripted tests.

use anyhow::{Context, Result};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;
use study_common::{Message, ParticipantId, PersonaKind, SessionContext};
use tracing::Instrument;
use uuid::Uuid;

use crate::chat::{ChatTurn, Pacer, StreamingChatSession, SubmitOutcome};
use crate::errors::ChatError;
use crate::flow::{FlowController, FlowState, Phase};
use crate::remote::{
    EventLogger, GeneratedEpisodes, RoleEpisodes, StudyBackend, UserInfo, UserTopics,
};
use crate::survey::{
    Questionnaire, SurveyGate, SurveyReceipt, SurveyResponse, episodes_from_experiencable,
};
use crate::topic::{TopicPool, TopicSelection, assign};

/// What the participant did at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Send(String),
    End,
}

/// Everything the runner needs from whoever is sitting at the screen.
///
/// Methods are blocking; the runner calls them between awaits.
pub trait ParticipantIo {
    /// Ask for a participant id on the intro page. Blank answers are
    /// rejected by the runner and asked again.
    fn participant_id(&mut self) -> Result<String>;

    /// Show an informational page and wait until the participant moves on.
    fn acknowledge(&mut self, phase: Phase) -> Result<()>;

    /// Profile questions on the info page.
    fn user_info(&mut self) -> Result<UserInfo>;

    /// Let the participant toggle topics. Called again until the selection
    /// is complete.
    fn select_topics(&mut self, pool: &TopicPool, selection: &mut TopicSelection) -> Result<()>;

    /// Next action in a chat turn.
    fn chat_input(&mut self, turn: &ChatTurn, transcript: &[Message]) -> Result<ChatAction>;

    /// A reply has been requested and nothing has arrived yet.
    fn reply_pending(&mut self) {}

    /// The transcript changed while a reply was streaming.
    fn reply_progress(&mut self, _transcript: &[Message]) {}

    /// The reply ended, one way or another.
    fn reply_finished(&mut self, _outcome: &SubmitOutcome) {}

    /// Answers to one questionnaire. `prior` holds the participant's own
    /// episodes, shown next to the episodic evaluation.
    fn rate(
        &mut self,
        questionnaire: &Questionnaire,
        prior: &BTreeMap<String, RoleEpisodes>,
    ) -> Result<SurveyResponse>;

    /// Non-fatal problem the participant should see.
    fn notice(&mut self, message: &str);
}

pub struct StudyRunner {
    backend: Arc<dyn StudyBackend>,
    logger: EventLogger,
    flow: FlowController,
    pool: TopicPool,
    pacer: Pacer,
    rng: Box<dyn RngCore + Send>,
    topics: Option<UserTopics>,
}

impl StudyRunner {
    pub fn new(
        backend: Arc<dyn StudyBackend>,
        pool: TopicPool,
        flow: FlowController,
        pacer: Pacer,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let logger = EventLogger::new(backend.clone());
        Self {
            backend,
            logger,
            flow,
            pool,
            pacer,
            rng,
            topics: None,
        }
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    /// Run from `start` until `Final` and return the final state. Outstanding
    /// log writes are awaited before returning.
    pub async fn run(&mut self, io: &mut dyn ParticipantIo, start: FlowState) -> Result<FlowState> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("participant_run", %run_id);
        let result = self.drive(io, start).instrument(span).await;
        self.logger.flush().await;
        result
    }

    async fn drive(&mut self, io: &mut dyn ParticipantIo, start: FlowState) -> Result<FlowState> {
        tracing::info!(start = %start, "Starting participant run");
        if start.ctx.is_unknown() && start.phase != Phase::Intro {
            tracing::warn!(phase = %start.phase, "Entering a page without a participant id");
        }

        let mut state = start;
        loop {
            state = match state.phase {
                Phase::Intro => self.intro(io, &state).await?,
                Phase::Info => self.info(io, &state).await?,
                Phase::TopicSelection => self.topic_selection(io, &state).await?,
                Phase::PersonaIntro(_) => {
                    io.acknowledge(state.phase)?;
                    self.logger.button(&state.ctx, &state.phase.page(), "Start");
                    self.flow.proceed(&state)?
                }
                Phase::Chat { persona, turn } => self.chat(io, &state, persona, turn).await?,
                Phase::Survey { persona, turn } => {
                    let topic = self.topic_for(&state.ctx, persona, turn).await;
                    let gate = SurveyGate::for_chat_turn(persona, turn, topic);
                    let receipt = self.collect(io, &state, &gate, &BTreeMap::new())?;
                    self.flow.complete_survey(&state, &receipt)?
                }
                Phase::PersonaEval(persona) => {
                    let gate = SurveyGate::for_persona_eval(persona);
                    let receipt = self.collect(io, &state, &gate, &BTreeMap::new())?;
                    self.flow.complete_survey(&state, &receipt)?
                }
                Phase::EpisodicEval => self.episodic_eval(io, &state).await?,
                Phase::Final => {
                    io.acknowledge(Phase::Final)?;
                    tracing::info!(participant = %state.ctx, "Participant run finished");
                    return Ok(state);
                }
            };
        }
    }

    async fn intro(&mut self, io: &mut dyn ParticipantIo, state: &FlowState) -> Result<FlowState> {
        io.acknowledge(Phase::Intro)?;
        let id = match state.ctx.participant() {
            Some(id) => id.clone(),
            None => loop {
                match ParticipantId::new(io.participant_id()?) {
                    Ok(id) => break id,
                    Err(err) => io.notice(&err.to_string()),
                }
            },
        };
        let ctx = SessionContext::Participant(id.clone());
        self.logger.button(&ctx, "Intro", "Start");
        if let Err(err) = self.backend.register_participant(&id).await {
            tracing::warn!(error = %err, participant = %id, "Participant registration failed");
            io.notice(&format!("Could not register participant: {}", err));
        }
        Ok(self.flow.proceed(&FlowState::new(Phase::Intro, ctx))?)
    }

    async fn info(&mut self, io: &mut dyn ParticipantIo, state: &FlowState) -> Result<FlowState> {
        let info = io.user_info()?;
        if let Err(err) = self.backend.save_user_info(&state.ctx, &info).await {
            tracing::warn!(error = %err, "Saving participant profile failed");
            io.notice(&format!("Could not save your profile: {}", err));
        }
        self.logger.button(&state.ctx, "Info", "Submit");
        Ok(self.flow.proceed(state)?)
    }

    async fn topic_selection(
        &mut self,
        io: &mut dyn ParticipantIo,
        state: &FlowState,
    ) -> Result<FlowState> {
        let mut selection = TopicSelection::new();
        while !selection.is_complete() {
            io.select_topics(&self.pool, &mut selection)?;
        }

        let assignment = assign(&self.pool, &selection, &mut self.rng)
            .context("Topic selection could not be assigned")?;
        let topics = UserTopics::from(&assignment);
        if let Err(err) = self.backend.save_selected_topics(&state.ctx, &topics).await {
            tracing::warn!(error = %err, "Saving topic assignment failed");
            io.notice(&format!("Could not save your topics: {}", err));
        }
        self.topics = Some(topics);
        self.logger.button(&state.ctx, "Topic", "Next");
        Ok(self.flow.proceed(state)?)
    }

    /// Topic for a turn, from the assignment made in this run or, when the
    /// run was entered mid-study, from the backend.
    async fn topic_for(&mut self, ctx: &SessionContext, persona: PersonaKind, turn: u32) -> String {
        if self.topics.is_none() {
            let topics = match self.backend.fetch_user_topics(ctx).await {
                Ok(topics) => topics,
                Err(err) => {
                    tracing::warn!(error = %err, "Fetching assigned topics failed");
                    UserTopics::default()
                }
            };
            self.topics = Some(topics);
        }
        self.topics
            .as_ref()
            .map(|t| t.topic_for(persona, turn))
            .unwrap_or_default()
    }

    async fn chat(
        &mut self,
        io: &mut dyn ParticipantIo,
        state: &FlowState,
        persona: PersonaKind,
        turn: u32,
    ) -> Result<FlowState> {
        let topic = self.topic_for(&state.ctx, persona, turn).await;
        let session = StreamingChatSession::new(
            ChatTurn {
                ctx: state.ctx.clone(),
                persona,
                turn,
                topic,
            },
            self.backend.clone(),
            self.logger.clone(),
            self.pacer,
        );

        loop {
            match io.chat_input(session.turn(), &session.transcript())? {
                ChatAction::Send(text) => {
                    let outcome = stream_reply(io, &session, &text).await;
                    io.reply_finished(&outcome);
                }
                ChatAction::End => match session.end_session().await {
                    Ok(log) => {
                        tracing::debug!(messages = log.messages.len(), "Chat turn saved");
                        return Ok(self.flow.complete_chat(state)?);
                    }
                    Err(ChatError::EmptyTranscript) => {
                        io.notice("Send at least one message before ending the chat.")
                    }
                    Err(err) => io.notice(&format!("Could not save the conversation: {}", err)),
                },
            }
        }
    }

    async fn episodic_eval(
        &mut self,
        io: &mut dyn ParticipantIo,
        state: &FlowState,
    ) -> Result<FlowState> {
        let experiencable = self
            .backend
            .fetch_experiencable(&state.ctx)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Fetching generated episodes failed");
                GeneratedEpisodes::default()
            });
        let identities = self
            .backend
            .fetch_identities(&state.ctx)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Fetching participant episodes failed");
                BTreeMap::new()
            });

        let gate = SurveyGate::for_episodes(episodes_from_experiencable(&experiencable));
        let receipt = self.collect(io, state, &gate, &identities)?;
        Ok(self.flow.complete_survey(state, &receipt)?)
    }

    /// Ask until the gate accepts the answers.
    fn collect(
        &self,
        io: &mut dyn ParticipantIo,
        state: &FlowState,
        gate: &SurveyGate,
        prior: &BTreeMap<String, RoleEpisodes>,
    ) -> Result<SurveyReceipt> {
        loop {
            let responses = io.rate(gate.questionnaire(), prior)?;
            match gate.submit(&state.ctx, responses, &self.logger) {
                Ok(receipt) => return Ok(receipt),
                Err(err) => io.notice(&err.to_string()),
            }
        }
    }
}

/// Submit `text` and forward every transcript change to `io` until the
/// reply ends.
async fn stream_reply(
    io: &mut dyn ParticipantIo,
    session: &StreamingChatSession,
    text: &str,
) -> SubmitOutcome {
    let mut updates = session.subscribe();
    updates.mark_unchanged();
    io.reply_pending();

    let submit = session.submit(text);
    tokio::pin!(submit);
    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Ok(()) = updates.changed() => {
                let transcript = updates.borrow_and_update().clone();
                io.reply_progress(&transcript);
            }
        }
    };
    // The last chunks may land in the same poll that finishes the submit.
    io.reply_progress(&session.transcript());
    outcome
}
