//! C11: suggest candidate groups, preview a merge, commit (non-destructive),
//! roll back, and finalize (destructive) with a one-merge rollback window.

mod conflict;
mod scoring;

use crate::clients::{LlmSummarizer, SummarizeHints};
use midas_db::{MergeStore, NoteFilter, NoteStore};
use midas_models::{FieldDecision, MergeRecord, MidasError, SavedNote, Source, SummaryArtifact};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const CLIQUE_THRESHOLD: f64 = 0.55;
const DEFAULT_MIN_SCORE: f64 = 0.35;

#[derive(Debug, Clone, serde::Serialize)]
pub struct MergeCandidateGroup {
    pub note_ids: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MergePreview {
    pub merged_title: String,
    pub merged_summary_markdown: String,
    pub conflict_markers: Vec<String>,
    pub field_decisions: Vec<FieldDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CommitOutcome {
    pub merge_id: String,
    pub merged_note_id: String,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

pub struct MergeEngine {
    notes: Arc<NoteStore>,
    merge_store: Arc<MergeStore>,
    llm: Arc<LlmSummarizer>,
}

impl MergeEngine {
    pub fn new(notes: Arc<NoteStore>, merge_store: Arc<MergeStore>, llm: Arc<LlmSummarizer>) -> Self {
        Self {
            notes,
            merge_store,
            llm,
        }
    }

    /// Scores every pair of notes for `source`, groups pairs scoring at
    /// or above `min_score`, and extends pairs into cliques when they
    /// are transitively similar above 0.55 (spec §4.11).
    #[instrument(skip(self))]
    pub async fn suggest(
        &self,
        source: Source,
        limit: u32,
        min_score: Option<f64>,
    ) -> Result<Vec<MergeCandidateGroup>, MidasError> {
        let min_score = min_score.unwrap_or(DEFAULT_MIN_SCORE);
        let notes = self.notes.list(source, NoteFilter::default()).await.map_err(MidasError::from)?;

        let mut pair_scores: Vec<(usize, usize, f64)> = Vec::new();
        for i in 0..notes.len() {
            for j in (i + 1)..notes.len() {
                let score = scoring::pair_score(&notes[i], &notes[j]);
                if score >= min_score {
                    pair_scores.push((i, j, score));
                }
            }
        }

        let mut uf = UnionFind::new(notes.len());
        for (i, j, score) in &pair_scores {
            if *score >= CLIQUE_THRESHOLD {
                uf.union(*i, *j);
            }
        }

        let mut clique_members: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut scored_indices: HashMap<usize, f64> = HashMap::new();
        for (i, j, score) in &pair_scores {
            scored_indices.insert(*i, 0.0);
            scored_indices.insert(*j, 0.0);
            let root = uf.find(*i);
            clique_members.entry(root).or_default();
        }
        for idx in scored_indices.keys().copied().collect::<Vec<_>>() {
            let root = uf.find(idx);
            let members = clique_members.entry(root).or_default();
            if !members.contains(&idx) {
                members.push(idx);
            }
        }

        let mut groups: Vec<MergeCandidateGroup> = Vec::new();
        for (root, members) in &clique_members {
            if members.len() < 2 {
                continue;
            }
            let mut best_score = 0.0f64;
            for (i, j, score) in &pair_scores {
                if uf.find(*i) == *root {
                    best_score = best_score.max(*score);
                }
            }
            groups.push(MergeCandidateGroup {
                note_ids: members.iter().map(|idx| notes[*idx].note_id.clone()).collect(),
                score: best_score,
            });
        }

        groups.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        groups.truncate(limit as usize);
        Ok(groups)
    }

    #[instrument(skip(self))]
    pub async fn preview(&self, source: Source, note_ids: &[String]) -> Result<MergePreview, MidasError> {
        let notes = self.load_notes(source, note_ids).await?;
        self.reject_if_unfinalized_merge_source(&notes).await?;

        if self.llm.enabled() {
            let combined: String = notes
                .iter()
                .map(|n| format!("## {}\n{}", n.artifact.title, n.artifact.summary_markdown))
                .collect::<Vec<_>>()
                .join("\n\n");

            match self
                .llm
                .summarize(
                    &combined,
                    SummarizeHints {
                        format: "markdown",
                        source: "merge",
                    },
                )
                .await
            {
                Ok(markdown) => {
                    let deterministic = conflict::merge_deterministic(&notes);
                    return Ok(MergePreview {
                        merged_title: deterministic.merged_title,
                        merged_summary_markdown: markdown,
                        conflict_markers: deterministic.conflict_markers,
                        field_decisions: deterministic.field_decisions,
                        fallback_reason: None,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "LLM merge judgment failed, using deterministic fallback");
                    let deterministic = conflict::merge_deterministic(&notes);
                    return Ok(MergePreview {
                        merged_title: deterministic.merged_title,
                        merged_summary_markdown: deterministic.merged_summary_markdown,
                        conflict_markers: deterministic.conflict_markers,
                        field_decisions: deterministic.field_decisions,
                        fallback_reason: Some(e.message),
                    });
                }
            }
        }

        let deterministic = conflict::merge_deterministic(&notes);
        Ok(MergePreview {
            merged_title: deterministic.merged_title,
            merged_summary_markdown: deterministic.merged_summary_markdown,
            conflict_markers: deterministic.conflict_markers,
            field_decisions: deterministic.field_decisions,
            fallback_reason: Some("LLM summarizer disabled".to_string()),
        })
    }

    #[instrument(skip(self, merged_title, merged_summary_markdown))]
    pub async fn commit(
        &self,
        source: Source,
        note_ids: &[String],
        merged_title: String,
        merged_summary_markdown: String,
    ) -> Result<CommitOutcome, MidasError> {
        let notes = self.load_notes(source, note_ids).await?;
        self.reject_if_unfinalized_merge_source(&notes).await?;

        let artifact = SummaryArtifact {
            source,
            source_id: format!("merged-{}", Uuid::new_v4()),
            source_url: notes[0].artifact.source_url.clone(),
            title: merged_title,
            summary_markdown: merged_summary_markdown,
            captured_metadata: Default::default(),
        };
        let merged_note = self.notes.save(artifact).await.map_err(MidasError::from)?;

        let decisions = conflict::merge_deterministic(&notes).field_decisions;
        self.notes
            .record_field_decisions(&merged_note.note_id, &decisions)
            .await
            .map_err(MidasError::from)?;

        let record = MergeRecord {
            merge_id: Uuid::new_v4().to_string(),
            source,
            source_note_ids: note_ids.to_vec(),
            merged_note_id: merged_note.note_id.clone(),
            field_decisions: decisions,
            created_at: chrono::Utc::now(),
            rollback_of: None,
            finalized_at: None,
        };
        self.merge_store.insert(&record).await.map_err(MidasError::from)?;

        info!(merge_id = record.merge_id, merged_note_id = merged_note.note_id, "merge committed");
        Ok(CommitOutcome {
            merge_id: record.merge_id,
            merged_note_id: merged_note.note_id,
        })
    }

    /// Deletes the merged note and the merge record. Rejects if the
    /// merge is finalized or if a newer merge exists for the source
    /// (spec §4.11, §8 I5).
    #[instrument(skip(self))]
    pub async fn rollback(&self, source: Source, merge_id: &str) -> Result<(), MidasError> {
        let record = self
            .merge_store
            .get(merge_id)
            .await
            .map_err(MidasError::from)?
            .ok_or_else(|| MidasError::invalid_input("merge not found"))?;

        if record.finalized_at.is_some() {
            return Err(MidasError::invalid_input("merge is already finalized"));
        }

        let most_recent = self.merge_store.most_recent_pending(source).await.map_err(MidasError::from)?;
        if most_recent.map(|m| m.merge_id) != Some(record.merge_id.clone()) {
            return Err(MidasError::invalid_input(
                "a newer merge exists for this source; roll that back first",
            ));
        }

        self.notes
            .delete(source, &record.merged_note_id)
            .await
            .map_err(MidasError::from)?;
        self.merge_store.delete(merge_id).await.map_err(MidasError::from)?;

        info!(merge_id, "merge rolled back");
        Ok(())
    }

    /// Deletes the original source notes and marks the record finalized.
    /// Irreversible; requires explicit confirmation at the router
    /// boundary (spec §4.11, §4.12).
    #[instrument(skip(self))]
    pub async fn finalize(&self, source: Source, merge_id: &str) -> Result<u64, MidasError> {
        let record = self
            .merge_store
            .get(merge_id)
            .await
            .map_err(MidasError::from)?
            .ok_or_else(|| MidasError::invalid_input("merge not found"))?;

        if record.finalized_at.is_some() {
            return Err(MidasError::invalid_input("merge is already finalized"));
        }

        let mut deleted = 0u64;
        for note_id in &record.source_note_ids {
            if self.notes.delete(source, note_id).await.map_err(MidasError::from).is_ok() {
                deleted += 1;
            }
        }
        self.merge_store.finalize(merge_id).await.map_err(MidasError::from)?;

        info!(merge_id, deleted, "merge finalized");
        Ok(deleted)
    }

    async fn load_notes(&self, source: Source, note_ids: &[String]) -> Result<Vec<SavedNote>, MidasError> {
        if note_ids.len() < 2 {
            return Err(MidasError::invalid_input("a merge requires at least two notes"));
        }
        let mut notes = Vec::with_capacity(note_ids.len());
        for id in note_ids {
            let note = self
                .notes
                .get(source, id)
                .await
                .map_err(MidasError::from)?
                .ok_or_else(|| MidasError::invalid_input(format!("note {id} not found")))?;
            notes.push(note);
        }
        Ok(notes)
    }

    /// Rejects merges whose inputs are themselves the un-finalized
    /// result of a prior merge (spec §9 Open Questions: decided here as
    /// `INVALID_INPUT`).
    async fn reject_if_unfinalized_merge_source(&self, notes: &[SavedNote]) -> Result<(), MidasError> {
        for note in notes {
            if note.artifact.source_id.starts_with("merged-") {
                return Err(MidasError::invalid_input(
                    "cannot merge a note that is itself an un-finalized merge result",
                ));
            }
        }
        Ok(())
    }
}
