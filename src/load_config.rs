use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{AppConfig, GithubConfig, IngestionConfig, ServerConfig};
use crate::enrich::DEFAULT_COMMIT_STAGGER;
use crate::fetch::DEFAULT_MAX_PAGES;
use crate::github::DEFAULT_API_URL;
use crate::model::UserRecord;
use crate::synchronise::SyncSettings;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:5001";

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    github: GithubSection,
    ingestion: IngestionSection,
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    users: Vec<UserSection>,
}

#[derive(Deserialize)]
struct GithubSection {
    #[serde(default = "default_api_url")]
    api_url: String,
    #[serde(default = "default_max_pages")]
    max_pages: u32,
    #[serde(default = "default_stagger_ms")]
    commit_stagger_ms: u64,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            max_pages: default_max_pages(),
            commit_stagger_ms: default_stagger_ms(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_stagger_ms() -> u64 {
    DEFAULT_COMMIT_STAGGER.as_millis() as u64
}

#[derive(Deserialize)]
struct IngestionSection {
    base_url: String,
}

#[derive(Deserialize)]
struct ServerSection {
    #[serde(default = "default_listen")]
    listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Deserialize)]
struct UserSection {
    github_username: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    token_env: String,
}

/// Loads a static YAML config file (no secrets) and injects tokens and
/// overrides from the environment.
///
/// - `users[].token_env` names the env var holding each user's access token.
/// - `INGESTION_URI` overrides `ingestion.base_url`.
/// - `PORT` overrides the port of `server.listen`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let static_conf: StaticConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    if static_conf.github.max_pages == 0 {
        anyhow::bail!("github.max_pages must be at least 1");
    }

    let base_url = match std::env::var("INGESTION_URI") {
        Ok(uri) if !uri.trim().is_empty() => {
            info!("INGESTION_URI found in env, overriding ingestion.base_url");
            uri
        }
        _ => static_conf.ingestion.base_url,
    };

    let mut listen: SocketAddr = static_conf
        .server
        .listen
        .parse()
        .with_context(|| format!("server.listen is not a socket address: {}", static_conf.server.listen))?;
    if let Ok(port) = std::env::var("PORT") {
        let port: u16 = port.parse().map_err(|e| {
            error!(error = ?e, var = %port, "PORT must be a valid port number");
            anyhow::anyhow!("PORT must be a valid port number: {e}")
        })?;
        listen.set_port(port);
    }

    let mut users = Vec::with_capacity(static_conf.users.len());
    for user in static_conf.users {
        let access_token = std::env::var(&user.token_env).map_err(|e| {
            error!(error = ?e, username = %user.github_username, var = %user.token_env, "Access token env var not set");
            anyhow::anyhow!(
                "{} environment variable not set (access token for {}): {e}",
                user.token_env,
                user.github_username
            )
        })?;
        info!(username = %user.github_username, "Parsed user seed from config");
        users.push(UserRecord {
            github_username: user.github_username,
            access_token,
            display_name: user.display_name,
            email: user.email,
            stream_id: None,
            write_token: None,
            watermark: None,
        });
    }

    let config = AppConfig {
        github: GithubConfig {
            api_url: static_conf.github.api_url,
        },
        ingestion: IngestionConfig { base_url },
        server: ServerConfig { listen },
        sync: SyncSettings {
            max_pages: static_conf.github.max_pages,
            commit_stagger: Duration::from_millis(static_conf.github.commit_stagger_ms),
        },
        users,
    };
    config.trace_loaded();
    Ok(config)
}
