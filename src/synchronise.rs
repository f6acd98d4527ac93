//! High-level pipeline: one sync run from token check to the complete marker.
//!
//! A run walks a fixed sequence of states:
//!
//! `Idle → StartSent → Fetched → Filtered → Enriched → Normalized → Dispatched → CompleteSent → Done`
//!
//! Each arrow is one component call. Any component error moves the run to
//! [`SyncState::Aborted`] with the stage and cause logged. Nothing is retried
//! or compensated: a start marker already sent stays sent, and the watermark
//! is untouched.
//!
//! # Responsibilities
//! - Token validation happens before the start marker. A rejected token ends the
//!   run with no event emitted.
//! - When the session has no email, the primary verified email is looked up
//!   from the provider before the start marker.
//! - Persisting a new watermark is left to the caller; [`SyncReport::next_watermark`]
//!   offers the default policy.
//!
//! # Callable From
//! - The HTTP trigger in [`crate::server`], which runs it on a detached task
//! - The `sync` CLI command, which awaits [`SyncOrchestrator::run`] directly
//!
//! # Navigation
//! - Main entrypoint: [`SyncOrchestrator::run`]
//! - Supporting types: [`SyncState`], [`SyncSettings`], [`SyncReport`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::{ActivityProvider, EventSink};
use crate::dispatch::BatchDispatcher;
use crate::enrich::{CommitEnricher, DEFAULT_COMMIT_STAGGER};
use crate::error::{SyncAborted, SyncError};
use crate::fetch::{PaginatedEventFetcher, DEFAULT_MAX_PAGES};
use crate::logger::SyncLogger;
use crate::model::{RawActivityRecord, StreamTarget, UserContext};
use crate::normalize::{self, EventNormalizer};
use crate::token::TokenValidator;
use crate::watermark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    StartSent,
    Fetched,
    Filtered,
    Enriched,
    Normalized,
    Dispatched,
    CompleteSent,
    Done,
    Aborted,
}

/// Tunables of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Hard cap on activity pages requested per run.
    pub max_pages: u32,
    /// Linear delay step between consecutive commit-detail requests.
    pub commit_stagger: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            commit_stagger: DEFAULT_COMMIT_STAGGER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Every state entered, starting with `Idle`.
    pub transitions: Vec<SyncState>,
    pub pushes_fetched: usize,
    pub pushes_filtered: usize,
    pub commits_enriched: usize,
    pub malformed_dropped: usize,
    pub events_dispatched: usize,
    /// Latest `createdAt` among the pushes that passed the watermark.
    pub latest_activity_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn state(&self) -> SyncState {
        self.transitions.last().copied().unwrap_or(SyncState::Idle)
    }

    /// The newest activity seen, or `previous` when the run saw nothing new.
    pub fn next_watermark(&self, previous: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        self.latest_activity_at.max(previous)
    }
}

/// State bookkeeping for a single run.
struct RunLog<'a> {
    run_id: Uuid,
    username: &'a str,
    logger: &'a dyn SyncLogger,
    transitions: Vec<SyncState>,
}

impl<'a> RunLog<'a> {
    fn new(username: &'a str, logger: &'a dyn SyncLogger) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            username,
            logger,
            transitions: vec![SyncState::Idle],
        }
    }

    fn current(&self) -> SyncState {
        self.transitions.last().copied().unwrap_or(SyncState::Idle)
    }

    fn enter(&mut self, state: SyncState) {
        self.logger.debug(
            self.username,
            &format!("run {}: {:?} -> {:?}", self.run_id, self.current(), state),
        );
        self.transitions.push(state);
    }

    fn abort(&mut self, error: SyncError) -> SyncAborted {
        let reached = self.current();
        self.logger.error(
            self.username,
            &format!("run {} aborted after {reached:?}: {error}", self.run_id),
        );
        self.transitions.push(SyncState::Aborted);
        SyncAborted { reached, error }
    }
}

pub struct SyncOrchestrator {
    provider: Arc<dyn ActivityProvider>,
    logger: Arc<dyn SyncLogger>,
    validator: TokenValidator,
    fetcher: PaginatedEventFetcher,
    enricher: CommitEnricher,
    normalizer: EventNormalizer,
    dispatcher: BatchDispatcher,
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn ActivityProvider>,
        sink: Arc<dyn EventSink>,
        logger: Arc<dyn SyncLogger>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            validator: TokenValidator::new(provider.clone(), logger.clone()),
            fetcher: PaginatedEventFetcher::new(provider.clone(), logger.clone(), settings.max_pages),
            enricher: CommitEnricher::new(provider.clone(), logger.clone(), settings.commit_stagger),
            normalizer: EventNormalizer::new(logger.clone()),
            dispatcher: BatchDispatcher::new(sink, logger.clone()),
            provider,
            logger,
        }
    }

    /// Run one sync to completion.
    pub async fn run(
        &self,
        user: &UserContext,
        target: &StreamTarget,
    ) -> Result<SyncReport, SyncAborted> {
        let username = user.github_username.as_str();
        let started_at = Utc::now();
        let mut run = RunLog::new(username, self.logger.as_ref());
        self.logger.info(
            username,
            &format!("run {} starting for stream {}", run.run_id, target.stream_id),
        );

        self.validator
            .validate(user)
            .await
            .map_err(|e| run.abort(SyncError::Token(e)))?;

        let user = self
            .resolve_identity(user)
            .await
            .map_err(|e| run.abort(e))?;

        self.dispatcher
            .send_marker(&normalize::sync_start(), target)
            .await
            .map_err(|source| run.abort(SyncError::Marker { marker: "start", source }))?;
        run.enter(SyncState::StartSent);

        let fetched = self
            .fetcher
            .fetch_push_activity(&user)
            .await
            .map_err(|e| run.abort(e.into()))?;
        let pushes_fetched = fetched.pushes.len();
        run.enter(SyncState::Fetched);

        let filtered = watermark::filter(fetched.pushes, target.watermark);
        let pushes_filtered = filtered.len();
        let latest_activity_at = filtered.iter().map(|p| p.created_at).max();
        run.enter(SyncState::Filtered);

        let mut records = self
            .enricher
            .enrich(filtered, &user)
            .await
            .map_err(|e| run.abort(e.into()))?;
        let commits_enriched = records
            .iter()
            .filter(|r| matches!(r, RawActivityRecord::Commit(_)))
            .count();
        // Unreadable push events have no timestamp to filter on; the normalizer drops them.
        records.extend(fetched.unreadable);
        run.enter(SyncState::Enriched);

        let events = self.normalizer.normalize(username, &records);
        let malformed_dropped = records.len() - events.len();
        run.enter(SyncState::Normalized);

        self.dispatcher
            .dispatch(username, &events, target)
            .await
            .map_err(|e| run.abort(e.into()))?;
        run.enter(SyncState::Dispatched);

        self.dispatcher
            .send_marker(&normalize::sync_complete(), target)
            .await
            .map_err(|source| run.abort(SyncError::Marker { marker: "complete", source }))?;
        run.enter(SyncState::CompleteSent);
        run.enter(SyncState::Done);

        self.logger.info(
            username,
            &format!(
                "run {} done: {pushes_fetched} fetched, {pushes_filtered} new pushes, \
                 {commits_enriched} commits, {} events sent",
                run.run_id,
                events.len()
            ),
        );

        Ok(SyncReport {
            run_id: run.run_id,
            started_at,
            transitions: run.transitions,
            pushes_fetched,
            pushes_filtered,
            commits_enriched,
            malformed_dropped,
            events_dispatched: events.len(),
            latest_activity_at,
        })
    }

    async fn resolve_identity(&self, user: &UserContext) -> Result<UserContext, SyncError> {
        if user.email.is_some() {
            return Ok(user.clone());
        }
        let email = self
            .provider
            .primary_email(&user.access_token)
            .await
            .map_err(SyncError::Identity)?;
        if email.is_none() {
            self.logger.info(
                &user.github_username,
                "no primary verified email, matching authors by display name only",
            );
        }
        Ok(UserContext {
            email,
            ..user.clone()
        })
    }
}
