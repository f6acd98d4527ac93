//! Conversion of raw push/commit records into the canonical event schema.
//!
//! Pure and order-preserving. Records that match neither shape are dropped
//! with a diagnostic instead of failing the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::MalformedRecord;
use crate::logger::SyncLogger;
use crate::model::{CommitDetail, FileChange, NormalizedEvent, PushActivity, RawActivityRecord, SyncField};

pub const SOURCE: &str = "GitHub";
const ACTIVITY_OBJECT_TAGS: [&str; 3] = ["computer", "software", "source control"];

/// Action tag of a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
    Push,
    Commit,
    Patch,
    Merge,
}

impl ActionTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTag::Push => "push",
            ActionTag::Commit => "commit",
            ActionTag::Patch => "patch",
            ActionTag::Merge => "merge",
        }
    }
}

/// Classify a commit. A differing committer email (`patch`) overrides a
/// foreign author (`merge`) when both hold.
pub fn classify(commit: &CommitDetail) -> ActionTag {
    let mut tag = ActionTag::Commit;
    if !commit.committer_is_author {
        tag = ActionTag::Merge;
    }
    if commit.author.email != commit.committer_email {
        tag = ActionTag::Patch;
    }
    tag
}

/// Text after the last `.` of the file name, case preserved; empty when there is none.
pub fn file_extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileTypeStats {
    pub line_additions: u64,
    pub line_deletions: u64,
    pub line_changes: u64,
}

/// Sum per-file stats grouped by extension.
pub fn file_type_stats(files: &[FileChange]) -> BTreeMap<String, FileTypeStats> {
    let mut by_ext: BTreeMap<String, FileTypeStats> = BTreeMap::new();
    for file in files {
        let entry = by_ext.entry(file_extension(&file.filename).to_string()).or_default();
        entry.line_additions += file.additions;
        entry.line_deletions += file.deletions;
        entry.line_changes += file.changes;
    }
    by_ext
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn activity_event(
    id: String,
    date_time: DateTime<Utc>,
    action: ActionTag,
    properties: Value,
) -> NormalizedEvent {
    NormalizedEvent {
        id: Some(id),
        parent_id: None,
        child_ids: None,
        date_time,
        action_tags: vec![action.as_str().to_string()],
        object_tags: tags(&ACTIVITY_OBJECT_TAGS),
        source: SOURCE.to_string(),
        latest_sync_field: Some(SyncField { date: date_time }),
        properties: into_map(properties),
    }
}

pub fn push_event(push: &PushActivity) -> NormalizedEvent {
    let mut event = activity_event(
        push.id.clone(),
        push.created_at,
        ActionTag::Push,
        json!({
            "commits": push.commit_count,
            "repo": push.repo,
        }),
    );
    event.child_ids = Some(push.commit_refs.iter().map(|c| c.sha.clone()).collect());
    event
}

pub fn commit_event(commit: &CommitDetail) -> NormalizedEvent {
    let mut event = activity_event(
        commit.sha.clone(),
        commit.author.date,
        classify(commit),
        json!({
            "repo": commit.repo,
            "message": commit.message,
            "url": commit.url,
            "line-additions": commit.stats.additions,
            "line-deletions": commit.stats.deletions,
            "line-changes": commit.stats.total,
            "file-count": commit.files.len(),
            "file-types": file_type_stats(&commit.files),
        }),
    );
    event.parent_id = Some(commit.push_id.clone());
    event
}

fn marker(action: &str) -> NormalizedEvent {
    NormalizedEvent {
        id: None,
        parent_id: None,
        child_ids: None,
        date_time: Utc::now(),
        action_tags: tags(&[action]),
        object_tags: tags(&["sync"]),
        source: SOURCE.to_string(),
        latest_sync_field: None,
        properties: Map::new(),
    }
}

/// Lifecycle marker sent before fetching.
pub fn sync_start() -> NormalizedEvent {
    marker("start")
}

/// Lifecycle marker sent after a successful dispatch.
pub fn sync_complete() -> NormalizedEvent {
    marker("complete")
}

/// Normalize one record.
pub fn normalize_record(record: &RawActivityRecord) -> Result<NormalizedEvent, MalformedRecord> {
    match record {
        RawActivityRecord::Push(push) => Ok(push_event(push)),
        RawActivityRecord::Commit(commit) => Ok(commit_event(commit)),
        RawActivityRecord::Unrecognized { reason, .. } => Err(MalformedRecord {
            reason: reason.clone(),
        }),
    }
}

pub struct EventNormalizer {
    logger: Arc<dyn SyncLogger>,
}

impl EventNormalizer {
    pub fn new(logger: Arc<dyn SyncLogger>) -> Self {
        Self { logger }
    }

    /// Normalize in input order, dropping malformed records.
    pub fn normalize(&self, username: &str, records: &[RawActivityRecord]) -> Vec<NormalizedEvent> {
        records
            .iter()
            .filter_map(|record| match normalize_record(record) {
                Ok(event) => Some(event),
                Err(e) => {
                    self.logger.error(username, &format!("dropping record: {e}"));
                    None
                }
            })
            .collect()
    }
}
