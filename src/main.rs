use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd;

#[derive(Parser)]
#[command(name = "persona-study")]
#[command(version, about = "Session orchestrator for two-persona chat experiments")]
pub struct Cli {
    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter for stderr and the log file (e.g. "info", "persona_study=debug")
    #[arg(long, global = true, env = "STUDY_LOG", default_value = "warn")]
    pub log_level: String,

    /// Directory holding .study/study.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub study_dir: Option<PathBuf>,

    /// Backend base URL. Overrides STUDY_BACKEND_URL and study.toml.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Delay after each streamed chunk, in milliseconds. 0 disables pacing.
    #[arg(long, global = true)]
    pub pacing_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive a participant through the study
    Run {
        /// Participant id; asked on the intro page when omitted
        #[arg(short, long)]
        participant: Option<String>,

        /// Re-enter the study at a page URL, e.g. "/chat1/4?participantId=P7"
        #[arg(long)]
        from: Option<String>,

        /// Use an in-memory backend instead of the study server
        #[arg(long)]
        offline: bool,

        /// Seed for topic counterbalancing
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the state encoded in a page URL and where it leads
    Route {
        url: String,

        /// Print absolute URLs on this host
        #[arg(long)]
        base: Option<String>,
    },
    /// Counterbalance a topic selection between the two personas
    Assign {
        /// Comma-separated topic indices, six per category
        #[arg(short, long)]
        select: String,

        /// Seed for the shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Topic pool (defaults to topics.file from study.toml)
        #[arg(long)]
        topics: Option<PathBuf>,

        /// Print the assignment as JSON
        #[arg(long)]
        json: bool,

        /// Store the assignment on the backend
        #[arg(long, requires = "participant")]
        save: bool,

        /// Participant the assignment belongs to
        #[arg(short, long)]
        participant: Option<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default study.toml file
    Init,
}

/// Stderr logging, plus a daily JSON log file when `log_dir` is set. The
/// returned guard flushes the file writer and must live until exit.
fn init_tracing(cli: &Cli, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = || EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "persona-study.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.study_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_dir = persona_study::config::StudyConfig::new(project_dir.clone())
        .ok()
        .and_then(|config| config.log_dir());
    let _guard = init_tracing(&cli, log_dir.as_deref())?;

    match &cli.command {
        Commands::Run {
            participant,
            from,
            offline,
            seed,
        } => {
            cmd::cmd_run(
                &cli,
                project_dir,
                participant.as_deref(),
                from.as_deref(),
                *offline,
                *seed,
            )
            .await?
        }
        Commands::Route { url, base } => cmd::cmd_route(&project_dir, url, base.as_deref())?,
        Commands::Assign {
            select,
            seed,
            topics,
            json,
            save,
            participant,
        } => {
            cmd::cmd_assign(
                &cli,
                project_dir,
                cmd::AssignArgs {
                    select,
                    seed: *seed,
                    topics: topics.as_deref(),
                    json: *json,
                    save: *save,
                    participant: participant.as_deref(),
                },
            )
            .await?
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
