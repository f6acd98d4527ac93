//! Data model shared by every stage of a sync run.
//!
//! Everything here is created fresh per run and dropped after dispatch. The only
//! value that outlives a run is the watermark, and that belongs to the
//! [`UserRepository`](crate::contract::UserRepository) collaborator.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Identity and credentials of the user being synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub github_username: String,
    pub access_token: String,
    pub display_name: Option<String>,
    /// Only used for identity comparison. Resolved from the provider when absent.
    pub email: Option<String>,
}

/// Destination stream and the last-synced instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub stream_id: String,
    pub write_token: String,
    /// Read-only for the pipeline. `None` means first sync.
    pub watermark: Option<DateTime<Utc>>,
}

/// A commit as referenced inside a push payload, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
    /// API url of the full commit detail.
    pub url: String,
    pub author_name: String,
    pub author_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushActivity {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Repository full name, e.g. `acme/api`.
    pub repo: String,
    /// Commit count as reported by the provider (may exceed `commit_refs.len()`).
    pub commit_count: u64,
    pub commit_refs: Vec<CommitRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
}

/// Full commit detail. Only produced by enrichment, always tied back to its push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetail {
    pub sha: String,
    pub push_id: String,
    pub repo: String,
    pub author: CommitAuthor,
    pub committer_email: String,
    pub message: String,
    pub url: String,
    pub stats: CommitStats,
    pub files: Vec<FileChange>,
    pub committer_is_author: bool,
}

/// Input to normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawActivityRecord {
    Push(PushActivity),
    Commit(CommitDetail),
    /// A provider payload that is neither push- nor commit-shaped.
    Unrecognized {
        reason: String,
        payload: serde_json::Value,
    },
}

/// The canonical event schema consumed by the ingestion service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_ids: Option<Vec<String>>,
    #[serde(serialize_with = "serialize_iso8601")]
    pub date_time: DateTime<Utc>,
    pub action_tags: Vec<String>,
    pub object_tags: Vec<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_sync_field: Option<SyncField>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// `{"$date": ...}` wrapper the ingestion service reads the next watermark from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncField {
    #[serde(rename = "$date", serialize_with = "serialize_iso8601")]
    pub date: DateTime<Utc>,
}

/// ISO-8601, millisecond precision, `Z` suffix.
pub fn iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso8601<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso8601(at))
}

/// What the repository collaborator stores per GitHub username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub github_username: String,
    pub access_token: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub stream_id: Option<String>,
    pub write_token: Option<String>,
    pub watermark: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn user_context(&self) -> UserContext {
        UserContext {
            github_username: self.github_username.clone(),
            access_token: self.access_token.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalized_event_serializes_camel_case_and_skips_absent_links() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let event = NormalizedEvent {
            id: Some("42".into()),
            parent_id: None,
            child_ids: Some(vec!["sha1".into()]),
            date_time: at,
            action_tags: vec!["push".into()],
            object_tags: vec!["computer".into()],
            source: "GitHub".into(),
            latest_sync_field: Some(SyncField { date: at }),
            properties: serde_json::Map::new(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["dateTime"], "2024-03-01T12:00:00.000Z");
        assert_eq!(json["childIds"][0], "sha1");
        assert_eq!(json["latestSyncField"]["$date"], "2024-03-01T12:00:00.000Z");
        assert!(json.get("parentId").is_none());
    }
}
