//! Study configuration.
//!
//! Settings are read from `.study/study.toml` and layered
//! (file → environment → CLI):
//!
//! ```toml
//! [backend]
//! url = "http://127.0.0.1:8000"
//! timeout_secs = 30
//!
//! [chat]
//! pacing_ms = 25
//!
//! [flow]
//! include_info = true
//!
//! [topics]
//! file = "topics.json"
//!
//! [logging]
//! dir = ".study/logs"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::chat::Pacer;

/// Directory holding the study configuration, relative to the project.
pub const STUDY_DIR: &str = ".study";
pub const CONFIG_FILE: &str = "study.toml";

pub const ENV_BACKEND_URL: &str = "STUDY_BACKEND_URL";
pub const ENV_PACING_MS: &str = "STUDY_PACING_MS";

/// Pacing above this is almost certainly a typo.
const MAX_SENSIBLE_PACING_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Timeout for JSON requests, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSection {
    /// Delay after each streamed chunk, in milliseconds (0 disables)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_pacing_ms() -> u64 {
    25
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSection {
    /// Show the profile page between intro and topic selection
    #[serde(default = "default_include_info")]
    pub include_info: bool,
}

fn default_include_info() -> bool {
    true
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            include_info: default_include_info(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicsSection {
    /// Topic pool, relative to the project directory
    #[serde(default = "default_topics_file")]
    pub file: PathBuf,
}

fn default_topics_file() -> PathBuf {
    PathBuf::from("topics.json")
}

impl Default for TopicsSection {
    fn default() -> Self {
        Self {
            file: default_topics_file(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Daily rolling log files are written here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// The complete study.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyToml {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub flow: FlowSection,
    #[serde(default)]
    pub topics: TopicsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl StudyToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse study.toml")
    }

    /// Load `study.toml` from `study_dir`, or defaults when it is absent.
    pub fn load_or_default(study_dir: &Path) -> Result<Self> {
        let config_path = study_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize study.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Human-readable warnings for suspicious values.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(warning) = check_backend_url(&self.backend.url) {
            warnings.push(warning);
        }
        if self.backend.timeout_secs == 0 {
            warnings.push("backend.timeout_secs is 0: every request would time out".to_string());
        }
        if self.chat.pacing_ms > MAX_SENSIBLE_PACING_MS {
            warnings.push(format!(
                "chat.pacing_ms is {}: replies would render slower than one chunk per second",
                self.chat.pacing_ms
            ));
        }

        warnings
    }
}

fn check_backend_url(raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => None,
        Ok(url) => Some(format!(
            "Backend URL '{}' uses unsupported scheme '{}'",
            raw,
            url.scheme()
        )),
        Err(e) => Some(format!("Invalid backend URL '{}': {}", raw, e)),
    }
}

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend_url: Option<String>,
    pub pacing_ms: Option<u64>,
    pub offline: bool,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub project_dir: PathBuf,
    pub study_dir: PathBuf,
    pub toml: StudyToml,
    cli: CliOverrides,
}

impl StudyConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        Self::with_cli_args(project_dir, CliOverrides::default())
    }

    pub fn with_cli_args(project_dir: PathBuf, cli: CliOverrides) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let study_dir = project_dir.join(STUDY_DIR);
        let toml = StudyToml::load_or_default(&study_dir)?;

        Ok(Self {
            project_dir,
            study_dir,
            toml,
            cli,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.study_dir.join(CONFIG_FILE)
    }

    /// Backend URL (CLI → env → file).
    pub fn backend_url(&self) -> String {
        layered(
            self.cli.backend_url.clone(),
            std::env::var(ENV_BACKEND_URL).ok(),
            self.toml.backend.url.clone(),
        )
    }

    /// Chunk pacing (CLI → env → file). An unparseable env value is ignored.
    pub fn pacer(&self) -> Pacer {
        let env = std::env::var(ENV_PACING_MS).ok().and_then(|raw| {
            raw.trim()
                .parse::<u64>()
                .inspect_err(|e| {
                    tracing::warn!(value = %raw, error = %e, "Ignoring invalid {}", ENV_PACING_MS)
                })
                .ok()
        });
        Pacer::from_millis(layered(self.cli.pacing_ms, env, self.toml.chat.pacing_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.backend.timeout_secs)
    }

    pub fn include_info(&self) -> bool {
        self.toml.flow.include_info
    }

    pub fn offline(&self) -> bool {
        self.cli.offline
    }

    pub fn topics_file(&self) -> PathBuf {
        self.resolve(&self.toml.topics.file)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.toml
            .logging
            .dir
            .as_ref()
            .map(|dir| self.resolve(dir))
    }

    /// Paths in study.toml are relative to the project; `~/` means home.
    fn resolve(&self, path: &Path) -> PathBuf {
        if let Ok(rest) = path.strip_prefix("~")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        self.project_dir.join(path)
    }

    /// Warnings for the effective settings, including overrides.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        let effective = self.backend_url();
        if effective != self.toml.backend.url
            && let Some(warning) = check_backend_url(&effective)
        {
            warnings.push(warning);
        }
        warnings
    }
}

fn layered<T>(cli: Option<T>, env: Option<T>, file: T) -> T {
    cli.or(env).unwrap_or(file)
}
