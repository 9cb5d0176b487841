//! Integration tests for the persona-study CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn study() -> Command {
    let mut cmd = cargo_bin_cmd!("persona-study");
    cmd.env_remove("STUDY_BACKEND_URL")
        .env_remove("STUDY_PACING_MS")
        .env_remove("STUDY_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// A pool with eight topics in each category, written to `topics.json`.
fn write_topics(dir: &TempDir) {
    let mut topics = Vec::new();
    for start in [1, 26, 51] {
        for index in start..start + 8 {
            topics.push(format!(
                r#"{{"index": {index}, "title_en": "Topic {index}"}}"#
            ));
        }
    }
    fs::write(
        dir.path().join("topics.json"),
        format!("[{}]", topics.join(",")),
    )
    .unwrap();
}

const FULL_SELECTION: &str = "1,2,3,4,5,6,26,27,28,29,30,31,51,52,53,54,55,56";

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        study()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("route"))
            .stdout(predicate::str::contains("assign"));
    }

    #[test]
    fn test_version() {
        study().arg("--version").assert().success();
    }

    #[test]
    fn test_run_without_topics_fails() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["run", "--offline", "--participant", "P1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("topic pool"));
    }
}

// =============================================================================
// Route Tests
// =============================================================================

mod route {
    use super::*;

    #[test]
    fn test_route_chat_page() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["route", "/chat1/3?participantId=P7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Chat(1,3) for P7"))
            .stdout(predicate::str::contains("chat1(tag)/3"))
            .stdout(predicate::str::contains("Survey(1,3)"));
    }

    #[test]
    fn test_route_last_turn_leads_to_evaluation() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["route", "/chat2/10?participantId=P7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Survey(2,10)"));
    }

    #[test]
    fn test_route_without_participant_warns() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["route", "/topic"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown"))
            .stdout(predicate::str::contains("/introper1"));
    }

    #[test]
    fn test_route_with_base() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args([
                "route",
                "/pereval/epi?participantId=P2",
                "--base",
                "https://study.example.org",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "https://study.example.org/epieval?participantId=P2",
            ));
    }

    #[test]
    fn test_route_final() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["route", "/final?participantId=P1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("end of study"));
    }

    #[test]
    fn test_route_rejects_bad_turn() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["route", "/chat1/11"])
            .assert()
            .failure();
    }

    #[test]
    fn test_route_skips_info_when_configured() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".study")).unwrap();
        fs::write(
            dir.path().join(".study/study.toml"),
            "[flow]\ninclude_info = false\n",
        )
        .unwrap();
        study()
            .current_dir(dir.path())
            .args(["route", "/?participantId=P1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/topic?participantId=P1"));
    }
}

// =============================================================================
// Assign Tests
// =============================================================================

mod assign {
    use super::*;

    #[test]
    fn test_assign_prints_both_personas() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args(["assign", "--select", FULL_SELECTION, "--seed", "42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Tag persona"))
            .stdout(predicate::str::contains("Epi persona"))
            .stdout(predicate::str::contains("Emotional Support"));
    }

    #[test]
    fn test_assign_is_reproducible_with_seed() {
        let dir = create_temp_project();
        write_topics(&dir);
        let run = || {
            study()
                .current_dir(dir.path())
                .args(["assign", "--select", FULL_SELECTION, "--seed", "7", "--json"])
                .output()
                .unwrap()
                .stdout
        };
        let first = run();
        assert_eq!(first, run());

        let topics: serde_json::Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(topics["tag_topics"].as_array().unwrap().len(), 9);
        assert_eq!(topics["epi_topics"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_assign_rejects_short_selection() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args(["assign", "--select", "1,2,3,26,27,28,51,52,53"])
            .assert()
            .failure();
    }

    #[test]
    fn test_assign_rejects_seventh_topic() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args([
                "assign",
                "--select",
                &format!("{},7", FULL_SELECTION),
            ])
            .assert()
            .failure();
    }

    #[test]
    fn test_assign_rejects_unknown_topic() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args(["assign", "--select", "75"])
            .assert()
            .failure();
    }

    #[test]
    fn test_assign_save_requires_participant() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args(["assign", "--select", FULL_SELECTION, "--save"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--participant"));
    }

    #[test]
    fn test_assign_reads_explicit_topics_file() {
        let dir = create_temp_project();
        write_topics(&dir);
        let other = create_temp_project();
        study()
            .current_dir(other.path())
            .args(["assign", "--select", FULL_SELECTION, "--topics"])
            .arg(dir.path().join("topics.json"))
            .assert()
            .success();
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No study.toml found"))
            .stdout(predicate::str::contains("http://127.0.0.1:8000"));
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created study.toml"));

        let content = fs::read_to_string(dir.path().join(".study/study.toml")).unwrap();
        assert!(content.contains("[backend]"));
        assert!(content.contains("pacing_ms = 25"));

        study()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_show_applies_overrides() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .args(["--backend-url", "http://10.1.2.3:9000", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("backend_url = \"http://10.1.2.3:9000\""));
    }

    #[test]
    fn test_config_env_override() {
        let dir = create_temp_project();
        study()
            .current_dir(dir.path())
            .env("STUDY_PACING_MS", "0")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pacing_ms = 0"));
    }

    #[test]
    fn test_config_validate_reports_problems() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".study")).unwrap();
        fs::write(
            dir.path().join(".study/study.toml"),
            "[backend]\nurl = \"ftp://example.org\"\ntimeout_secs = 0\n",
        )
        .unwrap();
        study()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("unsupported scheme"))
            .stdout(predicate::str::contains("timeout_secs is 0"))
            .stdout(predicate::str::contains("topic pool"));
    }

    #[test]
    fn test_config_validate_clean() {
        let dir = create_temp_project();
        write_topics(&dir);
        study()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_study_dir_flag() {
        let dir = create_temp_project();
        let elsewhere = create_temp_project();
        study()
            .current_dir(elsewhere.path())
            .arg("--study-dir")
            .arg(dir.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(dir.path().join(".study/study.toml").exists());
    }
}
