use crate::artifact::SummaryArtifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only job kind this version runs (spec §4.10 concurrency rule is
/// keyed off this variant). Kept as an enum so the job manager's
/// single-flight rule can widen to more kinds without reshaping callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    XhsCollectionSync,
}

/// A job's lifecycle is a subset of `pending -> running -> {succeeded, failed}`
/// and never regresses (spec §8, I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Ratcheted result of a collection sync (spec §3, §8 I1/I2).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncResult {
    pub requested_limit: u32,
    pub fetched_count: u32,
    pub new_count: u32,
    pub skipped_count: u32,
    pub failed_count: u32,
    pub circuit_opened: bool,
    pub summaries: Vec<SummaryArtifact>,
}

/// A named, observable long-running task owned by the Job Manager
/// (spec §3). Mutated only by its executing worker; readers get a
/// deep-copied snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub kind: JobKind,
    pub requested_limit: u32,
    pub status: JobStatus,
    pub current: u32,
    pub total: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SyncResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new_pending(job_id: String, kind: JobKind, requested_limit: u32) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            kind,
            requested_limit,
            status: JobStatus::Pending,
            current: 0,
            total: requested_limit,
            message: "queued".to_string(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
