use crate::source::{Source, SourceId};
use serde::{Deserialize, Serialize};

/// Metadata captured alongside a summary that varies by source
/// (spec §3: Bilibili carries timing/transcript stats, Xiaohongshu
/// carries none mandatory).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CapturedMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_chars: Option<usize>,
}

/// The immutable output of one pipeline run (spec §3). A fresh artifact
/// for the same `(source, source_id)` only supersedes a previous one
/// through an explicit save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryArtifact {
    pub source: Source,
    pub source_id: SourceId,
    pub source_url: String,
    pub title: String,
    pub summary_markdown: String,
    #[serde(default)]
    pub captured_metadata: CapturedMetadata,
}
