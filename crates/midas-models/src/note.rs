use crate::artifact::SummaryArtifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `SummaryArtifact` that has been persisted to the Note Store. `note_id`
/// is locally assigned on save and is distinct from `source_id` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedNote {
    pub note_id: String,
    #[serde(flatten)]
    pub artifact: SummaryArtifact,
    pub saved_at: DateTime<Utc>,
}
