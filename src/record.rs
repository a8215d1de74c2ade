use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::clock::{Precision, Zone};
use crate::git::CommitInfo;

/// Values substituted into a template on one run. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampRecord {
    pub current_time: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub commit_time: Option<String>,
}

impl TimestampRecord {
    pub fn new<Tz: TimeZone>(
        now: &DateTime<Tz>,
        commit: Option<&CommitInfo>,
        zone: &Zone,
        precision: Precision,
    ) -> Self {
        let current_time = zone.format(now, precision);
        match commit {
            Some(c) => Self {
                current_time,
                commit_hash: c.short_hash.clone(),
                commit_message: c.subject.clone(),
                commit_time: Some(zone.format(&c.committed_at, precision)),
            },
            None => Self {
                current_time,
                commit_hash: String::new(),
                commit_message: String::new(),
                commit_time: None,
            },
        }
    }
}
