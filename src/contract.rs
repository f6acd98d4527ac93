//! # contract: seams between the pipeline and the outside world
//!
//! Three traits isolate everything the sync pipeline talks to:
//! - [`ActivityProvider`]: the GitHub REST API (activity feed, commit detail, token check).
//! - [`EventSink`]: the ingestion service that receives normalized events.
//! - [`UserRepository`]: the key-value store of user records and watermarks.
//!
//! Provider methods hand back raw JSON payloads; shaping them into the data
//! model is the job of the fetch and enrich stages, so a stubbed provider
//! can feed deliberately malformed payloads through the pipeline.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`. The generated `Mock*` types are
//!   exported behind the default `test-export-mocks` feature so integration
//!   tests in `tests/` can drive the orchestrator without a network.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{DispatchError, ProviderError, RepositoryError};
use crate::model::{NormalizedEvent, StreamTarget, UserRecord};

/// Read access to a user's GitHub activity.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    /// One lightweight authenticated call. `Ok` on any 2xx.
    async fn check_token(&self, access_token: &str) -> Result<(), ProviderError>;

    /// One page of the user's public event feed, as raw payloads.
    async fn list_events(
        &self,
        username: &str,
        access_token: &str,
        page: u32,
    ) -> Result<Vec<serde_json::Value>, ProviderError>;

    /// Full commit detail from the commit's API url.
    async fn get_commit(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, ProviderError>;

    /// The user's primary verified email, if any.
    async fn primary_email(&self, access_token: &str) -> Result<Option<String>, ProviderError>;
}

/// Write access to an ingestion stream.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Single-event endpoint, used for lifecycle markers.
    async fn send_event(
        &self,
        target: &StreamTarget,
        event: &NormalizedEvent,
    ) -> Result<(), DispatchError>;

    /// Batch endpoint.
    async fn send_batch(
        &self,
        target: &StreamTarget,
        events: &[NormalizedEvent],
    ) -> Result<(), DispatchError>;
}

/// User records keyed by GitHub username. Last writer wins.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str)
        -> Result<Option<UserRecord>, RepositoryError>;

    async fn save(&self, record: UserRecord) -> Result<(), RepositoryError>;
}
