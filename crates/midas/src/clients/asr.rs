use midas_config::AsrSettings;
use midas_models::MidasError;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Result of a transcription (C5).
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language_detected: String,
    pub char_count: usize,
}

/// Shells out to a Whisper-family binary. "Resident" here means the
/// first successful invocation is remembered so later calls skip the
/// availability check (spec §4.5: "keeps it resident").
pub struct AsrEngine {
    binary_path: String,
    settings: AsrSettings,
    loaded: Arc<Mutex<OnceCell<()>>>,
}

impl AsrEngine {
    pub fn new(binary_path: String, settings: AsrSettings) -> Self {
        Self {
            binary_path,
            settings,
            loaded: Arc::new(Mutex::new(OnceCell::new())),
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn transcribe(&self, path: &Path) -> Result<Transcript, MidasError> {
        self.ensure_loaded().await?;

        let language_arg = if self.settings.language == "auto" {
            "auto".to_string()
        } else {
            self.settings.language.clone()
        };

        let output = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.settings.model_size)
            .arg("--device")
            .arg(&self.settings.device)
            .arg("--language")
            .arg(&language_arg)
            .arg("--file")
            .arg(path)
            .output()
            .await
            .map_err(|e| MidasError::upstream(format!("asr binary failed to start: {e}")))?;

        if !output.status.success() {
            return Err(MidasError::upstream(format!(
                "asr binary exited with status {}",
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let language_detected = if self.settings.language == "auto" {
            detect_language_from_stderr(&output.stderr).unwrap_or_else(|| "unknown".to_string())
        } else {
            self.settings.language.clone()
        };

        debug!(chars = text.chars().count(), "transcription complete");
        Ok(Transcript {
            char_count: text.chars().count(),
            text,
            language_detected,
        })
    }

    async fn ensure_loaded(&self) -> Result<(), MidasError> {
        let cell = self.loaded.lock().await;
        if cell.get().is_some() {
            return Ok(());
        }
        match Command::new(&self.binary_path).arg("--version").output().await {
            Ok(_) => {
                let _ = cell.set(());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                MidasError::dependency_missing("whisper-family ASR binary not found on PATH"),
            ),
            Err(_) => {
                let _ = cell.set(());
                Ok(())
            }
        }
    }
}

fn detect_language_from_stderr(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .find_map(|line| line.to_lowercase().find("detected language:").map(|idx| (line, idx)))
        .map(|(line, idx)| line[idx + "detected language:".len()..].trim().to_string())
}
