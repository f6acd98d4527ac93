use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a config with one user whose token comes from `CLI_TEST_TOKEN`.
fn create_minimal_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"ingestion:\n  base_url: http://127.0.0.1:1\nusers:\n  - github_username: octo\n    token_env: CLI_TEST_TOKEN\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_serve_and_sync() {
    let mut cmd = Command::cargo_bin("github-sync").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve").and(predicate::str::contains("sync")));
}

#[test]
fn sync_fails_when_config_is_missing() {
    let mut cmd = Command::cargo_bin("github-sync").expect("Binary exists");
    cmd.args([
        "sync",
        "--config",
        "/nonexistent/github-sync.yaml",
        "--username",
        "octo",
        "--stream-id",
        "stream-1",
    ]);
    cmd.assert().failure();
}

#[test]
fn sync_fails_for_user_missing_from_config() {
    let config = create_minimal_config();
    let mut cmd = Command::cargo_bin("github-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .args(["--username", "ghost", "--stream-id", "stream-1"])
        .env("CLI_TEST_TOKEN", "token")
        .env("STREAM_WRITE_TOKEN", "write-token")
        .env_remove("INGESTION_URI")
        .env_remove("PORT");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not listed in the config"));
}

#[test]
fn sync_fails_without_write_token() {
    let config = create_minimal_config();
    let mut cmd = Command::cargo_bin("github-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .args(["--username", "octo", "--stream-id", "stream-1"])
        .env("CLI_TEST_TOKEN", "token")
        .env_remove("STREAM_WRITE_TOKEN")
        .env_remove("INGESTION_URI")
        .env_remove("PORT");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("STREAM_WRITE_TOKEN"));
}
