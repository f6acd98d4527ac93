use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::github::GithubClient;
use crate::ingestion::IngestionClient;
use crate::load_config::load_config;
use crate::logger::TracingLogger;
use crate::model::StreamTarget;
use crate::repository::InMemoryUserRepository;
use crate::server::{self, AppState};
use crate::synchronise::SyncOrchestrator;

/// Env var holding the stream write token for one-shot `sync` runs.
pub const WRITE_TOKEN_ENV: &str = "STREAM_WRITE_TOKEN";

/// CLI for github-sync: push GitHub commit activity into an ingestion stream.
#[derive(Parser)]
#[clap(
    name = "github-sync",
    version,
    about = "Sync GitHub push and commit activity into an event ingestion stream"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Listen for /authSuccess sync triggers from the ingestion service
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Run one sync for a configured user and wait for it to finish
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// GitHub username as listed in the config
        #[clap(long)]
        username: String,
        /// Target stream id
        #[clap(long)]
        stream_id: String,
        /// Only sync activity created after this RFC 3339 instant
        #[clap(long)]
        since: Option<DateTime<Utc>>,
    },
}

fn build_orchestrator(config: &AppConfig) -> Result<SyncOrchestrator> {
    let github = GithubClient::new(config.github.api_url.clone())
        .context("failed to build GitHub client")?;
    let ingestion = IngestionClient::new(config.ingestion.base_url.clone())
        .context("failed to build ingestion client")?;
    Ok(SyncOrchestrator::new(
        Arc::new(github),
        Arc::new(ingestion),
        TracingLogger::shared(),
        config.sync,
    ))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(config)?;
            let state = AppState {
                orchestrator: Arc::new(build_orchestrator(&config)?),
                repository: Arc::new(InMemoryUserRepository::with_records(
                    config.users.iter().cloned(),
                )),
                logger: TracingLogger::shared(),
            };
            server::serve(config.server.listen, state)
                .await
                .context("sync trigger server failed")
        }
        Commands::Sync {
            config,
            username,
            stream_id,
            since,
        } => {
            let config = load_config(config)?;
            let record = config
                .find_user(&username)
                .with_context(|| format!("user {username} is not listed in the config"))?;
            let write_token = std::env::var(WRITE_TOKEN_ENV)
                .with_context(|| format!("{WRITE_TOKEN_ENV} environment variable not set"))?;
            let target = StreamTarget {
                stream_id,
                write_token,
                watermark: since,
            };

            let orchestrator = build_orchestrator(&config)?;
            println!("Synchronise starting...");
            match orchestrator.run(&record.user_context(), &target).await {
                Ok(report) => {
                    println!("Synchronise complete.\nReport:");
                    println!("{:#?}", report);
                    if let Some(next) = report.next_watermark(target.watermark) {
                        println!("Next watermark: {}", crate::model::iso8601(&next));
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Synchronisation failed: {}", e);
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
