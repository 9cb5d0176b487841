//! Offline counterbalancing: `persona-study assign`.

use anyhow::{Context, Result};
use console::style;
use persona_study::remote::{HttpBackend, StudyBackend, UserTopics};
use persona_study::topic::{TopicAssignment, TopicPool, TopicSelection, assign};
use persona_study::ui::icons::CHECK;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use study_common::{PersonaKind, SessionContext};

use super::super::Cli;
use super::load_config;

pub struct AssignArgs<'a> {
    pub select: &'a str,
    pub seed: Option<u64>,
    pub topics: Option<&'a Path>,
    pub json: bool,
    pub save: bool,
    pub participant: Option<&'a str>,
}

pub async fn cmd_assign(cli: &Cli, project_dir: PathBuf, args: AssignArgs<'_>) -> Result<()> {
    let config = load_config(cli, project_dir, false)?;
    let topics_file = args
        .topics
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.topics_file());
    let pool = TopicPool::load(&topics_file)?;

    let indices = parse_indices(args.select)?;
    let selection = TopicSelection::from_indices(&pool, &indices)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let assignment = assign(&pool, &selection, &mut rng)?;
    let topics = UserTopics::from(&assignment);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&topics)?);
    } else {
        print_assignment(&assignment);
    }

    if args.save {
        let ctx = SessionContext::from_param(args.participant);
        let backend = HttpBackend::new(&config.backend_url(), config.timeout())?;
        backend
            .save_selected_topics(&ctx, &topics)
            .await
            .with_context(|| format!("Failed to save topics for {}", ctx))?;
        println!("{}Saved assignment for {}", CHECK, ctx);
    }
    Ok(())
}

/// `"1, 2,3"` → `[1, 2, 3]`. Empty items are skipped.
fn parse_indices(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u32>()
                .with_context(|| format!("'{}' is not a topic index", item))
        })
        .collect()
}

fn print_assignment(assignment: &TopicAssignment) {
    for persona in PersonaKind::ALL {
        println!();
        println!(
            "{}",
            style(format!("{} persona (chat{})", persona, persona.ordinal())).bold()
        );
        for (turn, topic) in assignment.for_persona(persona).iter().enumerate() {
            println!(
                "  {:>2}. [{:>2}] {:<21} {}",
                turn + 1,
                topic.index,
                topic.category.label(),
                topic.title
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_indices_accepts_spaces_and_trailing_comma() {
        assert_eq!(parse_indices("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_indices("").unwrap().is_empty());
    }

    #[test]
    fn parse_indices_rejects_words() {
        let err = parse_indices("1,two").unwrap_err();
        assert!(err.to_string().contains("'two' is not a topic index"));
    }
}
