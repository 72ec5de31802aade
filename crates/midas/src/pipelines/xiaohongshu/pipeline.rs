use super::fetcher::{NoteDetail, XiaohongshuFetcher};
use crate::clients::{AsrEngine, AudioFetcher, LlmSummarizer, SummarizeHints};
use midas_config::{DetailFetchMode, XiaohongshuSettings};
use midas_db::DedupeStore;
use midas_models::{CapturedMetadata, JobStatus, MidasError, Source, SummaryArtifact, SyncResult};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{info, instrument, warn};

static NOTE_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:explore/|xhslink\.com/)?([0-9a-fA-F]{24})").expect("static note id pattern is valid")
});

/// Extracts a note id from a bare 24-char hex id, an
/// `xiaohongshu.com/explore/<id>` URL, or an `xhslink.com` short link.
pub fn normalize_note_id(raw: &str) -> Result<String, MidasError> {
    let trimmed = raw.trim();
    NOTE_ID_PATTERN
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .ok_or_else(|| MidasError::invalid_input("no xiaohongshu note id found in input"))
}

fn canonical_url(note_id: &str) -> String {
    format!("https://www.xiaohongshu.com/explore/{note_id}")
}

/// A progress event streamed out of a running collection sync.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub current: u32,
    pub total: u32,
    pub message: String,
}

/// C9: single-URL summarize and the collection-sync driver.
pub struct XiaohongshuPipeline {
    fetcher: Arc<XiaohongshuFetcher>,
    audio: Arc<AudioFetcher>,
    asr: Arc<AsrEngine>,
    llm: Arc<LlmSummarizer>,
    dedupe: Arc<DedupeStore>,
    settings: XiaohongshuSettings,
}

impl XiaohongshuPipeline {
    pub fn new(
        fetcher: Arc<XiaohongshuFetcher>,
        audio: Arc<AudioFetcher>,
        asr: Arc<AsrEngine>,
        llm: Arc<LlmSummarizer>,
        dedupe: Arc<DedupeStore>,
        settings: XiaohongshuSettings,
    ) -> Self {
        Self {
            fetcher,
            audio,
            asr,
            llm,
            dedupe,
            settings,
        }
    }

    /// Extracts `note_id`, fetches its detail, and summarizes it through
    /// whichever route `detail_fetch_mode` selects (spec §4.9).
    #[instrument(skip(self))]
    pub async fn summarize_url(&self, input: &str) -> Result<SummaryArtifact, MidasError> {
        let note_id = normalize_note_id(input)?;
        let mode = self.settings.web_readonly.detail_fetch_mode;
        let detail = self.fetcher.fetch_detail(&note_id).await?;
        let artifact = self.summarize_detail(&note_id, &detail, mode).await?;
        self.dedupe.add(Source::Xiaohongshu, &note_id).await.map_err(MidasError::from)?;
        Ok(artifact)
    }

    async fn summarize_detail(
        &self,
        note_id: &str,
        detail: &NoteDetail,
        mode: DetailFetchMode,
    ) -> Result<SummaryArtifact, MidasError> {
        let wants_video_route = should_use_video_route(mode, detail);

        let (markdown, transcript_chars, elapsed_ms) = if wants_video_route {
            self.summarize_via_video(detail).await?
        } else {
            let start = std::time::Instant::now();
            let markdown = self
                .llm
                .summarize(
                    &detail.content,
                    SummarizeHints {
                        format: "markdown",
                        source: "xiaohongshu",
                    },
                )
                .await?;
            (markdown, None, start.elapsed().as_millis() as u64)
        };

        Ok(SummaryArtifact {
            source: Source::Xiaohongshu,
            source_id: note_id.to_string(),
            source_url: canonical_url(note_id),
            title: detail.title.clone(),
            summary_markdown: markdown,
            captured_metadata: CapturedMetadata {
                elapsed_ms: Some(elapsed_ms),
                transcript_chars,
            },
        })
    }

    /// Reuses the Bilibili audio fetcher against the platform's media
    /// URL. Whether every Xiaohongshu media host works with that
    /// fetcher is an open question (see DESIGN.md).
    async fn summarize_via_video(&self, detail: &NoteDetail) -> Result<(String, Option<usize>, u64), MidasError> {
        let start = std::time::Instant::now();
        let media_url = detail
            .video_media_url
            .as_ref()
            .ok_or_else(|| MidasError::internal("video route selected without a media url"))?;

        let fetch = self.audio.fetch_audio(media_url).await?;
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
                    source: "xiaohongshu",
                },
            )
            .await?;

        Ok((markdown, Some(transcript.char_count), start.elapsed().as_millis() as u64))
    }

    /// Drives a collection sync to completion or exhaustion, streaming
    /// progress through `progress_tx` (spec §4.9, §4.10).
    #[instrument(skip(self, progress_tx))]
    pub async fn run_collection_sync(
        &self,
        requested_limit: u32,
        progress_tx: Sender<SyncProgress>,
    ) -> Result<SyncResult, MidasError> {
        let mut result = SyncResult {
            requested_limit,
            ..Default::default()
        };
        let mut consecutive_failures: u32 = 0;
        let mut cursor: Option<String> = None;

        'pages: loop {
            let page = self.fetcher.fetch_list(cursor.as_deref(), self.settings.max_limit).await?;

            for item in &page.items {
                if result.new_count >= requested_limit {
                    break 'pages;
                }

                if self
                    .dedupe
                    .contains(Source::Xiaohongshu, &item.note_id)
                    .await
                    .map_err(MidasError::from)?
                {
                    result.skipped_count += 1;
                    result.fetched_count += 1;
                    continue;
                }

                sleep_jitter(self.settings.random_delay_min_seconds, self.settings.random_delay_max_seconds).await;

                match self.fetch_and_summarize_candidate(&item.note_id).await {
                    Ok(artifact) => {
                        result.new_count += 1;
                        result.fetched_count += 1;
                        result.summaries.push(artifact);
                        consecutive_failures = 0;

                        let _ = progress_tx
                            .send(SyncProgress {
                                current: result.new_count,
                                total: requested_limit,
                                message: format!("synced {} notes", result.new_count),
                            })
                            .await;
                    }
                    Err(e) => {
                        result.failed_count += 1;
                        result.fetched_count += 1;

                        // A client-side rejection (bad/empty content) never
                        // poisons the breaker; only upstream/transport
                        // failures do (spec §4.9 tie-breaks).
                        if e.kind != midas_models::ErrorKind::InvalidInput {
                            consecutive_failures += 1;
                        }
                        warn!(note_id = %item.note_id, error = %e, "xiaohongshu candidate failed");

                        if consecutive_failures >= self.settings.circuit_breaker_failures {
                            result.circuit_opened = true;
                            info!("circuit breaker tripped, stopping sync early");
                            break 'pages;
                        }
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(result)
    }

    async fn fetch_and_summarize_candidate(&self, note_id: &str) -> Result<SummaryArtifact, MidasError> {
        let mode = self.settings.web_readonly.detail_fetch_mode;
        let detail = self.fetcher.fetch_detail(note_id).await?;
        if detail.content.trim().is_empty() && detail.video_media_url.is_none() {
            return Err(MidasError::invalid_input("note has no summarizable content"));
        }
        let artifact = self.summarize_detail(note_id, &detail, mode).await?;
        self.dedupe.add(Source::Xiaohongshu, note_id).await.map_err(MidasError::from)?;
        Ok(artifact)
    }
}

fn should_use_video_route(mode: DetailFetchMode, detail: &NoteDetail) -> bool {
    match mode {
        DetailFetchMode::Never => false,
        DetailFetchMode::Always => detail.video_media_url.is_some(),
        DetailFetchMode::Auto => detail.video_media_url.is_some() && detail.content.trim().is_empty(),
    }
}

async fn sleep_jitter(min_seconds: u64, max_seconds: u64) {
    let millis = {
        let mut rng = rand::thread_rng();
        let lo = min_seconds.min(max_seconds) * 1000;
        let hi = max_seconds.max(min_seconds) * 1000 + 1;
        rng.gen_range(lo..hi)
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Terminal job status a collection sync maps to. The breaker is a
/// soft stop, never a failure (spec §7).
pub fn terminal_status_for(_result: &SyncResult) -> JobStatus {
    JobStatus::Succeeded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_note_id_from_explore_url() {
        let id = normalize_note_id("https://www.xiaohongshu.com/explore/64a1b2c3d4e5f60718293a4b").unwrap();
        assert_eq!(id, "64a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn normalize_note_id_from_bare_hex() {
        let id = normalize_note_id("64A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(id, "64a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn normalize_note_id_rejects_garbage() {
        assert!(normalize_note_id("not a note").is_err());
    }
}
