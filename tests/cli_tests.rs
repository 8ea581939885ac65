//! End-to-end CLI tests
//!
//! These run the pagepulse binary with assert_cmd inside a scratch directory;
//! commands that talk to the proxy are pointed at a wiremock server.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pagepulse(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pagepulse").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("PAGEPULSE__OBSERVABILITY__LOG_LEVEL", "error");
    cmd
}

#[test]
fn help_lists_the_commands() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("insights"));
}

#[test]
fn no_subcommand_shows_how_to_start() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("pagepulse init"))
        .stdout(predicate::str::contains("--platform instagram"));
}

#[test]
fn init_writes_a_loadable_config() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote pagepulse.toml"));

    let written = std::fs::read_to_string(dir.path().join("pagepulse.toml")).unwrap();
    assert!(written.contains("base_url"));
    let loaded = pagepulse::config::PagePulseConfig::load_from(&dir.path().join("pagepulse.toml")).unwrap();
    assert_eq!(loaded.api.feed_limit, 5);
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pagepulse.toml"), "# mine\n").unwrap();

    pagepulse(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("pagepulse.toml")).unwrap(),
        "# mine\n"
    );

    pagepulse(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn init_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .args(["init", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[api]"));
    assert!(!dir.path().join("pagepulse.toml").exists());
}

#[test]
fn feed_without_selection_prompts() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .args(["feed", "--since", "2024-01-01", "--until", "2024-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please select an account and date range to view the feed.",
        ));
}

#[test]
fn inverted_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .args(["feed", "--account", "101", "--since", "2024-02-10", "--until", "2024-02-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date range"));
}

#[tokio::test(flavor = "multi_thread")]
async fn accounts_are_listed_from_the_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": [{"name": "Cafe Atlas", "id": "101"}]}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .env("PAGEPULSE__API__BASE_URL", server.uri())
        .arg("accounts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cafe Atlas"))
        .stdout(predicate::str::contains("101"));
}

#[tokio::test(flavor = "multi_thread")]
async fn proxy_failure_is_reported_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/post/101_1/comments"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    pagepulse(&dir)
        .env("PAGEPULSE__API__BASE_URL", server.uri())
        .args(["comments", "101_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Error loading comments. Please try again."));
}
