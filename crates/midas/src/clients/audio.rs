use midas_config::ToolSettings;
use midas_models::MidasError;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Output of a successful audio fetch (C4): an absolute path to the
/// downloaded audio plus its observed duration.
#[derive(Debug, Clone)]
pub struct AudioFetchOutput {
    pub path: PathBuf,
    pub duration_seconds: u64,
}

/// Downloads a video's audio track via `yt-dlp` into a scratch directory,
/// then reads its duration with `ffprobe`. Scratch files are the caller's
/// responsibility to reap once the pipeline finishes (spec §4.4).
pub struct AudioFetcher {
    tools: ToolSettings,
    scratch_dir: PathBuf,
}

impl AudioFetcher {
    pub fn new(tools: ToolSettings, scratch_dir: PathBuf) -> Self {
        Self { tools, scratch_dir }
    }

    #[instrument(skip(self), fields(video_url = %video_url))]
    pub async fn fetch_audio(&self, video_url: &str) -> Result<AudioFetchOutput, MidasError> {
        ensure_tool_available(&self.tools.yt_dlp_path, "--version", "yt-dlp").await?;
        ensure_tool_available(&self.tools.ffprobe_path, "-version", "ffprobe").await?;

        let job_dir = self.scratch_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&job_dir)
            .await
            .map_err(|e| MidasError::internal(format!("cannot create scratch dir: {e}")))?;

        let output_template = job_dir.join("audio.%(ext)s");
        let status = Command::new(&self.tools.yt_dlp_path)
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("-o")
            .arg(&output_template)
            .arg(video_url)
            .status()
            .await
            .map_err(|e| MidasError::upstream(format!("yt-dlp failed to start: {e}")))?;

        if !status.success() {
            cleanup(&job_dir).await;
            return Err(MidasError::upstream(format!(
                "yt-dlp exited with status {status}"
            )));
        }

        let audio_path = find_audio_file(&job_dir).await.ok_or_else(|| {
            MidasError::upstream("yt-dlp reported success but produced no audio file".to_string())
        })?;

        let duration_seconds = match probe_duration(&self.tools.ffprobe_path, &audio_path).await {
            Ok(d) => d,
            Err(e) => {
                cleanup(&job_dir).await;
                return Err(e);
            }
        };

        debug!(path = %audio_path.display(), duration_seconds, "audio fetched");
        Ok(AudioFetchOutput {
            path: audio_path,
            duration_seconds,
        })
    }

    /// Deletes the scratch directory containing `audio_path`, regardless
    /// of pipeline outcome (spec §4.4, §5 scoped resources).
    pub async fn cleanup(&self, audio_path: &PathBuf) {
        if let Some(parent) = audio_path.parent() {
            cleanup(&parent.to_path_buf()).await;
        }
    }
}

async fn cleanup(dir: &PathBuf) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!(path = %dir.display(), error = %e, "failed to reap scratch directory");
    }
}

async fn find_audio_file(dir: &PathBuf) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: String,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

async fn probe_duration(ffprobe_path: &str, audio_path: &PathBuf) -> Result<u64, MidasError> {
    let output = Command::new(ffprobe_path)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg(audio_path)
        .output()
        .await
        .map_err(|e| MidasError::upstream(format!("ffprobe failed to start: {e}")))?;

    if !output.status.success() {
        return Err(MidasError::upstream(format!(
            "ffprobe exited with status {}",
            output.status
        )));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| MidasError::upstream(format!("ffprobe produced malformed JSON: {e}")))?;

    let seconds: f64 = parsed
        .format
        .duration
        .parse()
        .map_err(|e| MidasError::upstream(format!("ffprobe duration unparsable: {e}")))?;

    Ok(seconds.round() as u64)
}

async fn ensure_tool_available(path: &str, version_flag: &str, name: &'static str) -> Result<(), MidasError> {
    match Command::new(path).arg(version_flag).output().await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MidasError::dependency_missing(format!("{name} not found on PATH")))
        }
        Err(_) => Ok(()),
    }
}
