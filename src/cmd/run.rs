//! Participant sessions: `persona-study run`.

use anyhow::{Context, Result, bail};
use console::style;
use persona_study::flow::route;
use persona_study::flow::{FlowController, FlowState};
use persona_study::remote::{HttpBackend, InMemoryBackend, StudyBackend};
use persona_study::runner::StudyRunner;
use persona_study::topic::TopicPool;
use persona_study::ui::TerminalIo;
use persona_study::ui::icons::CHECK;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use study_common::SessionContext;

use super::super::Cli;
use super::{load_config, print_warnings};

pub async fn cmd_run(
    cli: &Cli,
    project_dir: PathBuf,
    participant: Option<&str>,
    from: Option<&str>,
    offline: bool,
    seed: Option<u64>,
) -> Result<()> {
    let config = load_config(cli, project_dir, offline)?;
    print_warnings(&config.validate());

    let topics_file = config.topics_file();
    let pool = TopicPool::load(&topics_file)?;
    let problems = pool.validate();
    if !problems.is_empty() {
        bail!(
            "Topic pool {} cannot support a full selection:\n  - {}",
            topics_file.display(),
            problems.join("\n  - ")
        );
    }

    let backend: Arc<dyn StudyBackend> = if config.offline() {
        println!(
            "{}",
            style("Offline rehearsal: nothing is sent to the study server.").dim()
        );
        Arc::new(InMemoryBackend::new())
    } else {
        Arc::new(HttpBackend::new(&config.backend_url(), config.timeout())?)
    };

    let flow = FlowController::new(config.include_info());
    let start = start_state(&flow, participant, from)?;

    let rng: Box<dyn RngCore + Send> = match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_entropy()),
    };

    let mut runner = StudyRunner::new(backend, pool, flow, config.pacer(), rng);
    let mut io = TerminalIo::new();
    let end = runner
        .run(&mut io, start)
        .await
        .context("Participant session stopped")?;

    println!();
    println!("{}Session finished at {}", CHECK, route::to_url(&end));
    Ok(())
}

/// Where the session begins. `--participant` fills in an id missing from a
/// `--from` URL but never replaces one that is there.
fn start_state(
    flow: &FlowController,
    participant: Option<&str>,
    from: Option<&str>,
) -> Result<FlowState> {
    let Some(url) = from else {
        return Ok(flow.start(SessionContext::from_param(participant)));
    };

    let state = route::parse(url).with_context(|| format!("Cannot resume from '{}'", url))?;
    if state.ctx.is_unknown() && participant.is_some() {
        return Ok(FlowState::new(
            state.phase,
            SessionContext::from_param(participant),
        ));
    }
    Ok(state)
}
