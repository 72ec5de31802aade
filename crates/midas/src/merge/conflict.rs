use midas_models::{FieldDecision, SavedNote};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Deterministic, rule-based merge output (spec §4.11 conflict policy).
/// Used as the `preview` fallback when the LLM is unavailable or its
/// output can't be parsed.
pub struct MergeOutcome {
    pub merged_title: String,
    pub merged_summary_markdown: String,
    pub conflict_markers: Vec<String>,
    pub field_decisions: Vec<FieldDecision>,
}

fn hash_paragraph(p: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    p.trim().to_lowercase().hash(&mut hasher);
    hasher.finish()
}

/// Title: higher-intent (here: longer, more descriptive) title wins,
/// ties broken by most recent `saved_at`.
fn pick_title(notes: &[SavedNote]) -> (&SavedNote, FieldDecision) {
    let winner = notes
        .iter()
        .max_by(|a, b| {
            a.artifact
                .title
                .len()
                .cmp(&b.artifact.title.len())
                .then(a.saved_at.cmp(&b.saved_at))
        })
        .expect("merge always has at least one note");

    let decision = FieldDecision {
        field: "title".to_string(),
        strategy: "higher_intent_longest_then_recency".to_string(),
        winner_note_id: Some(winner.note_id.clone()),
        alt_value: None,
    };
    (winner, decision)
}

/// Content: sentence/paragraph-hash dedup preserving order; conflicting
/// (non-duplicate) paragraphs from later notes are kept with a source
/// marker rather than dropped.
fn merge_content(notes: &[SavedNote]) -> (String, Vec<String>, FieldDecision) {
    let mut seen = HashSet::new();
    let mut merged_paragraphs = Vec::new();
    let mut conflict_markers = Vec::new();

    for note in notes {
        for paragraph in note.artifact.summary_markdown.split("\n\n") {
            let trimmed = paragraph.trim();
            if trimmed.is_empty() {
                continue;
            }
            let hash = hash_paragraph(trimmed);
            if seen.insert(hash) {
                merged_paragraphs.push(trimmed.to_string());
            } else if !merged_paragraphs.is_empty() {
                let marker = format!("_(also present in {})_", note.note_id);
                conflict_markers.push(marker);
            }
        }
    }

    let decision = FieldDecision {
        field: "content".to_string(),
        strategy: "sentence_hash_dedup_preserve_order".to_string(),
        winner_note_id: None,
        alt_value: None,
    };

    (merged_paragraphs.join("\n\n"), conflict_markers, decision)
}

/// Summary: the longer (assumed higher entity-coverage) note's summary
/// is primary; the Note data model has no `alt_summary` slot, so the
/// runner-up is only referenced in the decision's `alt_value`.
fn pick_summary_decision(notes: &[SavedNote]) -> FieldDecision {
    let mut sorted: Vec<&SavedNote> = notes.iter().collect();
    sorted.sort_by(|a, b| b.artifact.summary_markdown.len().cmp(&a.artifact.summary_markdown.len()));
    let winner = sorted.first().expect("merge always has at least one note");
    let alt = sorted.get(1).map(|n| n.note_id.clone());

    FieldDecision {
        field: "summary".to_string(),
        strategy: "longer_summary_wins".to_string(),
        winner_note_id: Some(winner.note_id.clone()),
        alt_value: alt,
    }
}

/// `tags` and platform `metadata_variants` have no representation in
/// this version's data model (`SummaryArtifact` carries no tags field);
/// recorded as no-op union decisions so the ledger stays complete.
fn untracked_field_decisions() -> Vec<FieldDecision> {
    vec![
        FieldDecision {
            field: "tags".to_string(),
            strategy: "union".to_string(),
            winner_note_id: None,
            alt_value: None,
        },
        FieldDecision {
            field: "source_refs".to_string(),
            strategy: "union".to_string(),
            winner_note_id: None,
            alt_value: None,
        },
        FieldDecision {
            field: "metadata".to_string(),
            strategy: "earliest_published_latest_updated".to_string(),
            winner_note_id: None,
            alt_value: None,
        },
    ]
}

pub fn merge_deterministic(notes: &[SavedNote]) -> MergeOutcome {
    let (title_winner, title_decision) = pick_title(notes);
    let (merged_content, conflict_markers, content_decision) = merge_content(notes);
    let summary_decision = pick_summary_decision(notes);

    let mut field_decisions = vec![title_decision, content_decision, summary_decision];
    field_decisions.extend(untracked_field_decisions());

    MergeOutcome {
        merged_title: title_winner.artifact.title.clone(),
        merged_summary_markdown: merged_content,
        conflict_markers,
        field_decisions,
    }
}
