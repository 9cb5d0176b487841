//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Command  |
//! |----------|----------|
//! | `run`    | `Run`    |
//! | `route`  | `Route`  |
//! | `assign` | `Assign` |
//! | `config` | `Config` |

pub mod assign;
pub mod config;
pub mod route;
pub mod run;

pub use assign::{AssignArgs, cmd_assign};
pub use config::cmd_config;
pub use route::cmd_route;
pub use run::cmd_run;

use persona_study::config::{CliOverrides, StudyConfig};
use std::path::PathBuf;

use super::Cli;

/// Resolve configuration with the global CLI overrides applied.
pub fn load_config(cli: &Cli, project_dir: PathBuf, offline: bool) -> anyhow::Result<StudyConfig> {
    StudyConfig::with_cli_args(
        project_dir,
        CliOverrides {
            backend_url: cli.backend_url.clone(),
            pacing_ms: cli.pacing_ms,
            offline,
        },
    )
}

/// Print config warnings to stderr without stopping.
pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!(
            "{}{}",
            persona_study::ui::icons::WARN,
            console::style(warning).yellow()
        );
    }
}
