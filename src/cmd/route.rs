//! URL inspection: `persona-study route`.

use anyhow::{Context, Result};
use console::style;
use persona_study::config::StudyConfig;
use persona_study::flow::{FlowController, FlowState, Phase, route};
use std::path::Path;
use url::Url;

pub fn cmd_route(project_dir: &Path, input: &str, base: Option<&str>) -> Result<()> {
    let include_info = StudyConfig::new(project_dir.to_path_buf())
        .map(|config| config.include_info())
        .unwrap_or(true);
    let flow = FlowController::new(include_info);
    let base = base
        .map(|raw| Url::parse(raw).with_context(|| format!("Invalid base URL: {}", raw)))
        .transpose()?;

    let state = route::parse(input)?;
    let render = |state: &FlowState| match &base {
        Some(base) => route::absolute(base, state).to_string(),
        None => route::to_url(state),
    };

    println!("{:<12}{}", style("State").bold(), state);
    println!("{:<12}{}", style("Page").bold(), state.phase.page());
    println!("{:<12}{}", style("URL").bold(), render(&state));
    if state.ctx.is_unknown() {
        println!(
            "{}",
            style("No participantId: data will be stored under \"Unknown\"").yellow()
        );
    }

    match flow.successor(state.phase) {
        Some(next) => {
            let next = state.with_phase(next);
            let gate = match (state.phase, state.phase.expected_survey()) {
                (Phase::Chat { .. }, _) => " (after ending the chat)".to_string(),
                (_, Some(survey)) => format!(" (after the {})", survey),
                (_, None) => String::new(),
            };
            println!(
                "{:<12}{} at {}{}",
                style("Next").bold(),
                next.phase,
                render(&next),
                gate
            );
        }
        None => println!("{:<12}end of study", style("Next").bold()),
    }
    Ok(())
}
