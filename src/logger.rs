//! Logging capability handed to each pipeline component at construction.

use std::sync::Arc;

/// `{info, debug, error}`, each scoped to the GitHub username that owns the run.
pub trait SyncLogger: Send + Sync {
    fn info(&self, username: &str, message: &str);
    fn debug(&self, username: &str, message: &str);
    fn error(&self, username: &str, message: &str);
}

/// Forwards to `tracing` with a `username` field.
#[derive(Debug, Default, Clone)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn shared() -> Arc<dyn SyncLogger> {
        Arc::new(TracingLogger)
    }
}

impl SyncLogger for TracingLogger {
    fn info(&self, username: &str, message: &str) {
        tracing::info!(username = %username, "{message}");
    }

    fn debug(&self, username: &str, message: &str) {
        tracing::debug!(username = %username, "{message}");
    }

    fn error(&self, username: &str, message: &str) {
        tracing::error!(username = %username, "{message}");
    }
}
