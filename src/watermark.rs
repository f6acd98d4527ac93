//! Incremental-consistency filter.

use chrono::{DateTime, Utc};

use crate::model::PushActivity;

/// Keep exactly the activity created strictly after `watermark`.
///
/// No watermark (first sync) keeps everything.
pub fn filter(activity: Vec<PushActivity>, watermark: Option<DateTime<Utc>>) -> Vec<PushActivity> {
    match watermark {
        None => activity,
        Some(mark) => activity.into_iter().filter(|a| a.created_at > mark).collect(),
    }
}
