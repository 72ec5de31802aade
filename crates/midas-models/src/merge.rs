use crate::source::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One resolved field during a merge preview/commit (spec §4.11 conflict
/// policy), logged by the Note Store write path when called from the
/// merge engine (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDecision {
    pub field: String,
    pub strategy: String,
    pub winner_note_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_value: Option<String>,
}

/// Immutable (except for `finalized_at`) record of a merge operation
/// (spec §3). A `merge_id` can only be rolled back if it is the most
/// recent non-finalized merge for its source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeRecord {
    pub merge_id: String,
    pub source: Source,
    pub source_note_ids: Vec<String>,
    pub merged_note_id: String,
    pub field_decisions: Vec<FieldDecision>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}
