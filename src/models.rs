//! Core data models used throughout Casepack.
//!
//! These types represent the cases, communications, and batches that flow
//! through the ingestion pipeline, plus the terminal result reported to the
//! triggering scheduler.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A support case as returned by the upstream case-listing API.
///
/// Case identifiers embed their creation time: `case-<unix-seconds>-<suffix>`
/// (e.g. `case-1714089600-5f2a91c3`). Within the current ten-digit epoch era
/// this makes lexical order match creation order, which is what checkpoint
/// comparison relies on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub case_id: String,
    #[serde(default)]
    pub subject: String,
    /// Present on the wire; ingestion does not filter on it.
    #[serde(default)]
    #[allow(dead_code)]
    pub status: CaseStatus,
}

/// Lifecycle status of a support case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Open,
    Resolved,
}

/// A single message on a case, in API return order (order is authoritative).
#[derive(Debug, Clone, Deserialize)]
pub struct Communication {
    #[serde(default)]
    pub body: String,
}

/// Extract the creation timestamp embedded in a case identifier.
///
/// Returns `None` for any identifier that does not carry a parseable
/// timestamp. Callers treat that as "no time filter available", never as an
/// error.
pub fn case_created_at(case_id: &str) -> Option<DateTime<Utc>> {
    let rest = case_id.strip_prefix("case-")?;
    let (secs, suffix) = rest.split_once('-')?;
    if suffix.is_empty() {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// Whether a string is a well-formed case identifier, embedded timestamp
/// included.
///
/// Used to reject corrupted checkpoint values before resuming from them.
/// The bar is deliberately the same as [`case_created_at`]: a cursor whose
/// timestamp cannot be recovered must not be compared against real ids,
/// since an arbitrary string can lexically sort above every genuine
/// `case-<unix-seconds>-<suffix>` id and silently filter the whole stream.
pub fn is_case_id(value: &str) -> bool {
    case_created_at(value).is_some()
}

/// An ordered accumulation of `(case id, case text)` records, bounded by the
/// configured batch size.
///
/// Each ingestion run owns exactly one `Batch` at a time; once written as an
/// artifact it is cleared and re-filled, never mutated in place after a
/// write.
#[derive(Debug)]
pub struct Batch {
    capacity: usize,
    entries: Vec<(String, String)>,
}

impl Batch {
    /// Create an empty batch that flushes at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a record. Callers flush before pushing past capacity.
    pub fn push(&mut self, case_id: String, text: String) {
        self.entries.push((case_id, text));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once the batch holds the configured number of records.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Records in insertion order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Case ids in insertion order.
    pub fn case_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// The most recently added case id — the checkpoint candidate.
    pub fn last_case_id(&self) -> Option<&str> {
        self.entries.last().map(|(id, _)| id.as_str())
    }

    /// Reset to empty after a successful flush, keeping the capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Terminal result of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// One or more batch artifacts were written, in write order.
    Artifacts(Vec<String>),
    /// The stream produced nothing to write — a normal idle result for a
    /// periodic run with no new support activity.
    NoNewCases,
}

impl RunOutcome {
    /// Machine-readable shape for the triggering scheduler.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RunOutcome::Artifacts(names) => serde_json::json!({ "artifacts": names }),
            RunOutcome::NoNewCases => serde_json::json!({ "message": "no new cases" }),
        }
    }
}
