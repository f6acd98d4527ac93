use std::net::SocketAddr;

use tracing::{debug, info};

use crate::model::UserRecord;
use crate::synchronise::SyncSettings;

/// Fully merged application configuration (file + environment).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub ingestion: IngestionConfig,
    pub server: ServerConfig,
    pub sync: SyncSettings,
    /// Seed records for the user repository. Tokens come from the environment.
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            github_api = %self.github.api_url,
            ingestion = %self.ingestion.base_url,
            listen = %self.server.listen,
            max_pages = self.sync.max_pages,
            commit_stagger_ms = self.sync.commit_stagger.as_millis() as u64,
            users = self.users.len(),
            "Loaded config"
        );
        for user in &self.users {
            debug!(
                username = %user.github_username,
                has_email = user.email.is_some(),
                "Loaded user seed"
            );
        }
    }

    pub fn find_user(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.github_username == username)
    }
}
