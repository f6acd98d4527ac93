//! Commit enrichment: one detail request per commit referenced by the
//! filtered pushes.
//!
//! Requests go out on a linear stagger (`index * step`, index counted across
//! the whole flattened commit list) to stay under GitHub's burst limit. The
//! stagger only delays each request; once its delay elapses every request is
//! in flight at the same time. The join is all-or-nothing.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::contract::ActivityProvider;
use crate::error::FetchError;
use crate::fan_in::{join_all_fail_fast, scheduled, stagger_delay};
use crate::logger::SyncLogger;
use crate::model::{
    CommitAuthor, CommitDetail, CommitRef, CommitStats, FileChange, PushActivity,
    RawActivityRecord, UserContext,
};

pub const DEFAULT_COMMIT_STAGGER: Duration = Duration::from_millis(100);

/// Everything needed to fetch one commit and tie it back to its push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub sha: String,
    pub url: String,
    pub push_id: String,
    pub repo: String,
    pub committer_is_author: bool,
}

fn plus_tag() -> &'static Regex {
    static PLUS_TAG: OnceLock<Regex> = OnceLock::new();
    PLUS_TAG.get_or_init(|| Regex::new(r"\+[^@]*@").expect("plus-tag pattern is valid"))
}

/// Strip a `+tag` between the local part and `@`: `user+ci@x.com` -> `user@x.com`.
pub fn normalize_email(email: &str) -> String {
    plus_tag().replacen(email.trim(), 1, "@").into_owned()
}

/// Whether the commit author is the session user, by normalized email or display name.
pub fn is_session_author(
    commit: &CommitRef,
    session_email: Option<&str>,
    display_name: Option<&str>,
) -> bool {
    let email_match = session_email
        .map(|email| normalize_email(&commit.author_email) == normalize_email(email))
        .unwrap_or(false);
    let name_match = display_name
        .map(|name| !name.is_empty() && commit.author_name == name)
        .unwrap_or(false);
    email_match || name_match
}

/// Flatten every commit of every push into detail requests, in push order.
pub fn plan_requests(pushes: &[PushActivity], user: &UserContext) -> Vec<CommitRequest> {
    pushes
        .iter()
        .flat_map(|push| {
            push.commit_refs.iter().map(move |commit| CommitRequest {
                sha: commit.sha.clone(),
                url: commit.url.clone(),
                push_id: push.id.clone(),
                repo: push.repo.clone(),
                committer_is_author: is_session_author(
                    commit,
                    user.email.as_deref(),
                    user.display_name.as_deref(),
                ),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CommitDetailWire {
    sha: String,
    #[serde(default)]
    html_url: Option<String>,
    commit: CommitBodyWire,
    #[serde(default)]
    stats: CommitStats,
    #[serde(default)]
    files: Vec<FileChange>,
}

#[derive(Debug, Deserialize)]
struct CommitBodyWire {
    author: AuthorWire,
    committer: CommitterWire,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AuthorWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommitterWire {
    #[serde(default)]
    email: String,
}

/// Shape a commit-detail payload. Anything unreadable comes back as
/// [`RawActivityRecord::Unrecognized`] for the normalizer to drop.
pub fn parse_commit_detail(payload: serde_json::Value, request: &CommitRequest) -> RawActivityRecord {
    if payload.get("commit").map_or(true, |c| !c.is_object()) {
        return RawActivityRecord::Unrecognized {
            reason: format!("commit {} has no commit payload", request.sha),
            payload,
        };
    }
    match CommitDetailWire::deserialize(&payload) {
        Ok(wire) => RawActivityRecord::Commit(CommitDetail {
            sha: wire.sha,
            push_id: request.push_id.clone(),
            repo: request.repo.clone(),
            author: CommitAuthor {
                name: wire.commit.author.name,
                email: wire.commit.author.email,
                date: wire.commit.author.date,
            },
            committer_email: wire.commit.committer.email,
            message: wire.commit.message,
            url: wire.html_url.unwrap_or_else(|| request.url.clone()),
            stats: wire.stats,
            files: wire.files,
            committer_is_author: request.committer_is_author,
        }),
        Err(e) => RawActivityRecord::Unrecognized {
            reason: format!("commit {} is unreadable: {e}", request.sha),
            payload,
        },
    }
}

pub struct CommitEnricher {
    provider: Arc<dyn ActivityProvider>,
    logger: Arc<dyn SyncLogger>,
    stagger: Duration,
}

impl CommitEnricher {
    pub fn new(
        provider: Arc<dyn ActivityProvider>,
        logger: Arc<dyn SyncLogger>,
        stagger: Duration,
    ) -> Self {
        Self {
            provider,
            logger,
            stagger,
        }
    }

    /// The push records followed by one resolved detail per referenced commit.
    pub async fn enrich(
        &self,
        pushes: Vec<PushActivity>,
        user: &UserContext,
    ) -> Result<Vec<RawActivityRecord>, FetchError> {
        let requests = plan_requests(&pushes, user);
        let foreign = requests.iter().filter(|r| !r.committer_is_author).count();
        self.logger.debug(
            &user.github_username,
            &format!(
                "enriching {} commits ({} not authored by the session user)",
                requests.len(),
                foreign
            ),
        );

        let lookups = requests.iter().enumerate().map(|(index, request)| {
            let delay = stagger_delay(index, self.stagger);
            scheduled(delay, async move {
                self.provider
                    .get_commit(&request.url, &user.access_token)
                    .await
                    .map(|payload| parse_commit_detail(payload, request))
                    .map_err(|source| FetchError::Commit {
                        sha: request.sha.clone(),
                        source,
                    })
            })
        });
        let details = join_all_fail_fast(lookups).await?;

        let mut records: Vec<RawActivityRecord> =
            pushes.into_iter().map(RawActivityRecord::Push).collect();
        records.extend(details);
        Ok(records)
    }
}
