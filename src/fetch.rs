//! Concurrent retrieval of the user's push activity.
//!
//! Pages `1..=max_pages` are requested at once and joined all-or-nothing:
//! one failing page fails the whole fetch. The page cap bounds how much
//! history a single run can see; activity older than the last page is never
//! synced. Result order across pages is unspecified.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::contract::ActivityProvider;
use crate::error::FetchError;
use crate::fan_in::join_all_fail_fast;
use crate::logger::SyncLogger;
use crate::model::{CommitRef, PushActivity, RawActivityRecord, UserContext};

pub const PUSH_EVENT: &str = "PushEvent";
pub const DEFAULT_MAX_PAGES: u32 = 10;

#[derive(Debug, Deserialize)]
struct EventWire {
    id: String,
    created_at: DateTime<Utc>,
    repo: RepoWire,
    payload: PushPayloadWire,
}

#[derive(Debug, Deserialize)]
struct RepoWire {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PushPayloadWire {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    commits: Vec<PushCommitWire>,
}

#[derive(Debug, Deserialize)]
struct PushCommitWire {
    sha: String,
    url: String,
    author: AuthorWire,
}

#[derive(Debug, Deserialize)]
struct AuthorWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

/// Whether a raw feed entry is a push event.
pub fn is_push_event(value: &serde_json::Value) -> bool {
    value.get("type").and_then(|t| t.as_str()) == Some(PUSH_EVENT)
}

/// Shape a raw push-event payload into [`PushActivity`].
pub fn parse_push_event(value: serde_json::Value) -> Result<PushActivity, serde_json::Error> {
    let wire: EventWire = serde_json::from_value(value)?;
    let commit_refs: Vec<CommitRef> = wire
        .payload
        .commits
        .into_iter()
        .map(|c| CommitRef {
            sha: c.sha,
            url: c.url,
            author_name: c.author.name,
            author_email: c.author.email,
        })
        .collect();
    Ok(PushActivity {
        id: wire.id,
        created_at: wire.created_at,
        repo: wire.repo.name,
        commit_count: wire.payload.size.unwrap_or(commit_refs.len() as u64),
        commit_refs,
    })
}

/// Push activity from every page, plus the push events that could not be read.
#[derive(Debug, Default)]
pub struct FetchedActivity {
    pub pushes: Vec<PushActivity>,
    /// [`RawActivityRecord::Unrecognized`] entries, left for the normalizer to drop.
    pub unreadable: Vec<RawActivityRecord>,
}

pub struct PaginatedEventFetcher {
    provider: Arc<dyn ActivityProvider>,
    logger: Arc<dyn SyncLogger>,
    max_pages: u32,
}

impl PaginatedEventFetcher {
    pub fn new(
        provider: Arc<dyn ActivityProvider>,
        logger: Arc<dyn SyncLogger>,
        max_pages: u32,
    ) -> Self {
        Self {
            provider,
            logger,
            max_pages,
        }
    }

    pub async fn fetch_push_activity(
        &self,
        user: &UserContext,
    ) -> Result<FetchedActivity, FetchError> {
        let username = user.github_username.as_str();
        let requests = (1..=self.max_pages).map(|page| async move {
            self.provider
                .list_events(username, &user.access_token, page)
                .await
                .map_err(|source| FetchError::Page { page, source })
        });
        let pages = join_all_fail_fast(requests).await?;

        let mut fetched = FetchedActivity::default();
        for value in pages.into_iter().flatten() {
            if !is_push_event(&value) {
                continue;
            }
            match parse_push_event(value.clone()) {
                Ok(push) => fetched.pushes.push(push),
                Err(e) => fetched.unreadable.push(RawActivityRecord::Unrecognized {
                    reason: format!("push event is unreadable: {e}"),
                    payload: value,
                }),
            }
        }
        self.logger.debug(
            username,
            &format!(
                "fetched {} push events ({} unreadable) from {} pages",
                fetched.pushes.len(),
                fetched.unreadable.len(),
                self.max_pages
            ),
        );
        Ok(fetched)
    }
}
