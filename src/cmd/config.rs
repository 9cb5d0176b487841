//! Configuration view and validation commands: `persona-study config`.

use anyhow::Result;
use persona_study::config::{CONFIG_FILE, StudyConfig, StudyToml};
use persona_study::topic::TopicPool;
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config = StudyConfig::new(project_dir.to_path_buf())?;
    let config_path = config.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Study Configuration");
            println!("===================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Using default configuration.");
            }
            println!();
            print_toml(&config.toml);

            println!("Effective values (with env/CLI overrides):");
            println!("  backend_url = \"{}\"", config.backend_url());
            println!("  pacing_ms = {}", config.pacer().delay().as_millis());
            println!("  topics_file = \"{}\"", config.topics_file().display());
            if let Some(dir) = config.log_dir() {
                println!("  log_dir = \"{}\"", dir.display());
            }
            println!();

            if !config_path.exists() {
                println!("Run 'persona-study config init' to create a {} file.", CONFIG_FILE);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let mut warnings = config.validate();
            let topics_file = config.topics_file();
            match TopicPool::load(&topics_file) {
                Ok(pool) => warnings.extend(pool.validate()),
                Err(e) => warnings.push(format!("{:#}", e)),
            }

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.study_dir.exists() {
                std::fs::create_dir_all(&config.study_dir)?;
            }

            let toml = StudyToml::default();
            toml.save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [backend] url, timeout_secs");
            println!("  - [chat] pacing_ms");
            println!("  - [flow] include_info");
            println!("  - [topics] file");
            println!("  - [logging] dir");
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &StudyToml) {
    println!("[backend]");
    println!("  url = \"{}\"", toml.backend.url);
    println!("  timeout_secs = {}", toml.backend.timeout_secs);
    println!();
    println!("[chat]");
    println!("  pacing_ms = {}", toml.chat.pacing_ms);
    println!();
    println!("[flow]");
    println!("  include_info = {}", toml.flow.include_info);
    println!();
    println!("[topics]");
    println!("  file = \"{}\"", toml.topics.file.display());
    println!();
    if let Some(dir) = &toml.logging.dir {
        println!("[logging]");
        println!("  dir = \"{}\"", dir.display());
        println!();
    }
}
