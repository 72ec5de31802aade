use midas_models::SavedNote;
use std::collections::HashSet;

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Time proximity decays exponentially with a 7-day half-life, clamped
/// to `[0, 1]`.
fn time_proximity(a: &SavedNote, b: &SavedNote) -> f64 {
    let diff_seconds = (a.saved_at - b.saved_at).num_seconds().unsigned_abs() as f64;
    let half_life_seconds = 7.0 * 24.0 * 3600.0;
    0.5_f64.powf(diff_seconds / half_life_seconds)
}

/// Weighted score from spec §4.11:
/// `0.35*keyword_overlap + 0.25*title_similarity + 0.20*time_proximity + 0.20*summary_similarity`.
pub fn pair_score(a: &SavedNote, b: &SavedNote) -> f64 {
    let title_a = tokenize(&a.artifact.title);
    let title_b = tokenize(&b.artifact.title);
    let summary_a = tokenize(&a.artifact.summary_markdown);
    let summary_b = tokenize(&b.artifact.summary_markdown);

    let keywords_a: HashSet<String> = title_a.union(&summary_a).cloned().collect();
    let keywords_b: HashSet<String> = title_b.union(&summary_b).cloned().collect();

    let keyword_overlap = jaccard(&keywords_a, &keywords_b);
    let title_similarity = jaccard(&title_a, &title_b);
    let time = time_proximity(a, b);
    let summary_similarity = jaccard(&summary_a, &summary_b);

    0.35 * keyword_overlap + 0.25 * title_similarity + 0.20 * time + 0.20 * summary_similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use midas_models::{CapturedMetadata, Source, SummaryArtifact};

    fn note(title: &str, summary: &str) -> SavedNote {
        SavedNote {
            note_id: "id".to_string(),
            artifact: SummaryArtifact {
                source: Source::Bilibili,
                source_id: "BV1".to_string(),
                source_url: "https://example.com".to_string(),
                title: title.to_string(),
                summary_markdown: summary.to_string(),
                captured_metadata: CapturedMetadata::default(),
            },
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn identical_notes_score_near_one() {
        let a = note("Rust async patterns", "tokio futures streams");
        let b = note("Rust async patterns", "tokio futures streams");
        assert!(pair_score(&a, &b) > 0.95);
    }

    #[test]
    fn unrelated_notes_score_low() {
        let a = note("Rust async patterns", "tokio futures streams");
        let b = note("baking sourdough bread", "flour water yeast salt");
        assert!(pair_score(&a, &b) < 0.3);
    }
}
