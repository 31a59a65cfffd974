//! CLI smoke tests
//!
//! Exercise the binary surface: argument parsing, config loading, and the
//! offline session-management commands. Nothing here talks to a real LLM.

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let sessions_dir = dir.path().join("sessions");
    let config_path = dir.path().join("storyforge.yml");
    std::fs::write(
        &config_path,
        format!("sessions:\n  dir: \"{}\"\n", sessions_dir.display()),
    )
    .unwrap();
    config_path
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("sf")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("story"))
        .stdout(predicate::str::contains("bdd"))
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn test_sessions_list_empty() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    Command::cargo_bin("sf")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored sessions"));
}

#[test]
fn test_export_unknown_session_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    Command::cargo_bin("sf")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "export", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No session matching"));
}

#[test]
#[serial]
fn test_story_without_api_key_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    Command::cargo_bin("sf")
        .unwrap()
        .env_remove("OPENAI_API_KEY")
        .args([
            "--config",
            config.to_str().unwrap(),
            "story",
            "Reset password",
            "Como usuário, quero redefinir minha senha.",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
