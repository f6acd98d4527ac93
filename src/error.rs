//! Error taxonomy for the sync pipeline.

use thiserror::Error;

use crate::synchronise::SyncState;

/// Raw outcome of a failed provider (GitHub) call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected provider payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// The HTTP status observed, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("access token rejected by provider")]
    TokenInvalid,

    #[error("provider unavailable (status {status})")]
    TransientError { status: u16 },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch activity page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: ProviderError,
    },

    #[error("failed to fetch commit {sha}: {source}")]
    Commit {
        sha: String,
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("stream not found: {stream_id}")]
    StreamNotFound { stream_id: String },

    #[error("ingestion service rejected request with HTTP {status}")]
    Rejected { status: u16 },

    #[error("ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A record matching neither the push nor the commit shape. Logged and dropped.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed activity record: {reason}")]
pub struct MalformedRecord {
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("user repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("token validation failed: {0}")]
    Token(#[from] TokenError),

    #[error("primary email lookup failed: {0}")]
    Identity(#[source] ProviderError),

    #[error("failed to send {marker} marker: {source}")]
    Marker {
        marker: &'static str,
        #[source]
        source: DispatchError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("batch dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// A run that ended in [`SyncState::Aborted`].
#[derive(Debug, Error)]
#[error("sync aborted after {reached:?}: {error}")]
pub struct SyncAborted {
    /// Last state entered before the failing stage.
    pub reached: SyncState,
    #[source]
    pub error: SyncError,
}
