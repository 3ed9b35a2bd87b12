//! End-to-end tests for the shopfloor binary.
//!
//! These drive the CLI the way an operator bootstrapping a plant server
//! would: write a config, create the database, add the first person.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn shopfloor() -> Command {
    cargo_bin_cmd!("shopfloor")
}

fn temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Initialize config and database inside a temp directory.
fn init_project(dir: &TempDir) {
    shopfloor()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        shopfloor()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("work-order"));
    }

    #[test]
    fn test_version() {
        shopfloor().arg("--version").assert().success();
    }

    #[test]
    fn test_serve_help_lists_overrides() {
        shopfloor()
            .args(["serve", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--listen"))
            .stdout(predicate::str::contains("--db-path"))
            .stdout(predicate::str::contains("--uploads-dir"));
    }
}

mod bootstrap {
    use super::*;

    #[test]
    fn test_init_creates_config_and_database() {
        let dir = temp_project();

        shopfloor()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote default configuration"))
            .stdout(predicate::str::contains("Database ready"));

        let config = std::fs::read_to_string(dir.path().join("shopfloor.toml")).unwrap();
        assert!(config.contains("[server]"));
        assert!(config.contains("[auth]"));
        assert!(dir.path().join("shopfloor.db").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = temp_project();
        init_project(&dir);

        shopfloor()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration already exists"));
    }

    #[test]
    fn test_add_person() {
        let dir = temp_project();
        init_project(&dir);

        shopfloor()
            .current_dir(dir.path())
            .args([
                "add-person",
                "--name",
                "Mara",
                "--surname",
                "Voss",
                "--phone-number",
                "5550001",
                "--password",
                "hunter2",
                "--role",
                "admin",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added Mara Voss"))
            .stdout(predicate::str::contains("role admin"));
    }

    #[test]
    fn test_add_person_duplicate_phone_fails() {
        let dir = temp_project();
        init_project(&dir);

        let args = [
            "add-person",
            "--name",
            "Mara",
            "--surname",
            "Voss",
            "--phone-number",
            "5550002",
            "--password",
            "hunter2",
        ];
        shopfloor()
            .current_dir(dir.path())
            .args(args)
            .assert()
            .success();

        shopfloor()
            .current_dir(dir.path())
            .args(args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("already registered"));
    }

    #[test]
    fn test_add_person_rejects_unknown_role() {
        let dir = temp_project();
        init_project(&dir);

        shopfloor()
            .current_dir(dir.path())
            .args([
                "add-person",
                "--name",
                "Mara",
                "--surname",
                "Voss",
                "--phone-number",
                "5550003",
                "--password",
                "hunter2",
                "--role",
                "supervisor",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid person role"));
    }

    #[test]
    fn test_serve_rejects_unusable_listen_address() {
        let dir = temp_project();
        init_project(&dir);

        shopfloor()
            .current_dir(dir.path())
            .args(["serve", "--listen", "not-an-address"])
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to bind"));
    }
}
