use crate::clients::{AsrEngine, AudioFetcher, LlmSummarizer, SummarizeHints};
use midas_config::BilibiliSettings;
use midas_models::{CapturedMetadata, MidasError, Source, SummaryArtifact};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info, instrument};

static BV_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"BV[0-9A-Za-z]{10}").expect("static BV id pattern is valid"));

/// Extracts a normalized `BV…` id from a raw id or a bilibili.com URL
/// (spec SPEC_FULL.md §3). Anything else is `INVALID_INPUT`.
pub fn normalize_bv_id(raw: &str) -> Result<String, MidasError> {
    let trimmed = raw.trim();
    BV_ID_PATTERN
        .find(trimmed)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| MidasError::invalid_input("no BV id found in input"))
}

pub fn canonical_url(bv_id: &str) -> String {
    format!("https://www.bilibili.com/video/{bv_id}")
}

/// C7: normalizes input, drives C4 -> C5 -> C6, returns an immutable
/// `SummaryArtifact`. Never auto-saves (spec §4.7).
pub struct BilibiliPipeline {
    audio: AudioFetcher,
    asr: AsrEngine,
    llm: LlmSummarizer,
    settings: BilibiliSettings,
}

impl BilibiliPipeline {
    pub fn new(audio: AudioFetcher, asr: AsrEngine, llm: LlmSummarizer, settings: BilibiliSettings) -> Self {
        Self {
            audio,
            asr,
            llm,
            settings,
        }
    }

    #[instrument(skip(self), fields(video_url))]
    pub async fn summarize(&self, input: &str) -> Result<SummaryArtifact, MidasError> {
        let bv_id = normalize_bv_id(input)?;
        let source_url = canonical_url(&bv_id);

        let start = Instant::now();

        let fetch = self.audio.fetch_audio(&source_url).await?;
        let max_seconds = u64::from(self.settings.max_video_minutes) * 60;
        if fetch.duration_seconds > max_seconds {
            self.audio.cleanup(&fetch.path).await;
            return Err(MidasError::invalid_input(format!(
                "audio duration {}s exceeds max_video_minutes ({} min)",
                fetch.duration_seconds, self.settings.max_video_minutes
            )));
        }

        let transcript = match self.asr.transcribe(&fetch.path).await {
            Ok(t) => t,
            Err(e) => {
                self.audio.cleanup(&fetch.path).await;
                return Err(e);
            }
        };
        self.audio.cleanup(&fetch.path).await;

        let markdown = self
            .llm
            .summarize(
                &transcript.text,
                SummarizeHints {
                    format: "markdown",
                    source: "bilibili",
                },
            )
            .await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(bv_id, elapsed_ms, "bilibili summarize complete");

        Ok(SummaryArtifact {
            source: Source::Bilibili,
            source_id: bv_id,
            source_url,
            title: derive_title(&markdown),
            summary_markdown: markdown,
            captured_metadata: CapturedMetadata {
                elapsed_ms: Some(elapsed_ms),
                transcript_chars: Some(transcript.char_count),
            },
        })
    }
}

/// The summarizer is expected to lead with a markdown heading; falls
/// back to a fixed placeholder when it doesn't.
fn derive_title(markdown: &str) -> String {
    markdown
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_bv_id_extracts_from_url() {
        let id = normalize_bv_id("https://www.bilibili.com/video/BV1xx411c7mD?p=1").unwrap();
        assert_eq!(id, "BV1xx411c7mD");
    }

    #[test]
    fn normalize_bv_id_accepts_bare_id() {
        let id = normalize_bv_id("BV1xx411c7mD").unwrap();
        assert_eq!(id, "BV1xx411c7mD");
    }

    #[test]
    fn normalize_bv_id_rejects_garbage() {
        assert!(normalize_bv_id("not a video").is_err());
    }

    #[test]
    fn derive_title_strips_heading_marker() {
        assert_eq!(derive_title("# My Title\nbody"), "My Title");
        assert_eq!(derive_title(""), "Untitled");
    }
}
