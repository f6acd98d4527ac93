use std::env;
use std::fs::write;
use std::time::Duration;

use serial_test::serial;
use tempfile::NamedTempFile;

use github_sync::load_config::load_config;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

fn clear_overrides() {
    env::remove_var("INGESTION_URI");
    env::remove_var("PORT");
}

/// A static config plus the token env vars yields user seeds with tokens filled in.
#[test]
#[serial]
fn test_load_config_injects_tokens_from_env() {
    clear_overrides();
    let file = config_file(
        r#"
github:
  api_url: https://github.example.com/api/v3
  max_pages: 5
  commit_stagger_ms: 250
ingestion:
  base_url: https://ingest.example.com
server:
  listen: 127.0.0.1:6001
users:
  - github_username: octo
    display_name: Octo Cat
    email: octo@example.com
    token_env: OCTO_GITHUB_TOKEN
"#,
    );
    env::set_var("OCTO_GITHUB_TOKEN", "secret-token");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
    assert_eq!(config.sync.max_pages, 5);
    assert_eq!(config.sync.commit_stagger, Duration::from_millis(250));
    assert_eq!(config.ingestion.base_url, "https://ingest.example.com");
    assert_eq!(config.server.listen.to_string(), "127.0.0.1:6001");

    let octo = config.find_user("octo").expect("octo is seeded");
    assert_eq!(octo.access_token, "secret-token");
    assert_eq!(octo.display_name.as_deref(), Some("Octo Cat"));
    assert_eq!(octo.email.as_deref(), Some("octo@example.com"));
    assert!(octo.watermark.is_none());

    env::remove_var("OCTO_GITHUB_TOKEN");
}

/// Omitted sections fall back to the public API, ten pages and a 100ms stagger.
#[test]
#[serial]
fn test_load_config_applies_defaults() {
    clear_overrides();
    let file = config_file("ingestion:\n  base_url: http://localhost:8080\n");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.github.api_url, "https://api.github.com");
    assert_eq!(config.sync.max_pages, 10);
    assert_eq!(config.sync.commit_stagger, Duration::from_millis(100));
    assert_eq!(config.server.listen.port(), 5001);
    assert!(config.users.is_empty());
}

#[test]
#[serial]
fn test_load_config_env_overrides_ingestion_and_port() {
    let file = config_file("ingestion:\n  base_url: http://localhost:8080\n");
    env::set_var("INGESTION_URI", "https://override.example.com");
    env::set_var("PORT", "7007");

    let config = load_config(file.path()).expect("Config should load");
    clear_overrides();

    assert_eq!(config.ingestion.base_url, "https://override.example.com");
    assert_eq!(config.server.listen.port(), 7007);
}

/// A user whose token env var is unset makes the loader fail, naming the var.
#[test]
#[serial]
fn test_load_config_errors_on_missing_token_env() {
    clear_overrides();
    env::remove_var("GHOST_GITHUB_TOKEN");
    let file = config_file(
        r#"
ingestion:
  base_url: http://localhost:8080
users:
  - github_username: ghost
    token_env: GHOST_GITHUB_TOKEN
"#,
    );

    let err = load_config(file.path()).expect_err("Should fail without the token env var");
    assert!(err.to_string().contains("GHOST_GITHUB_TOKEN"), "error was: {err}");
}

#[test]
#[serial]
fn test_load_config_errors_on_invalid_yaml() {
    clear_overrides();
    let file = config_file("ingestion: [not, a, mapping\n");

    let err = load_config(file.path()).expect_err("Should fail on broken YAML");
    let msg = err.to_string();
    assert!(msg.contains("parse") || msg.contains("YAML"), "error was: {msg}");
}

#[test]
#[serial]
fn test_load_config_rejects_zero_page_cap() {
    clear_overrides();
    let file = config_file("github:\n  max_pages: 0\ningestion:\n  base_url: http://localhost:8080\n");

    assert!(load_config(file.path()).is_err());
}
