use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `xiaohongshu.web_readonly.detail_fetch_mode` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailFetchMode {
    Auto,
    Always,
    Never,
}

impl Default for DetailFetchMode {
    fn default() -> Self {
        DetailFetchMode::Auto
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    /// Sensitive: excluded from `editable_snapshot`, rejected by `apply_patch`.
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsrMode {
    WhisperCpp,
    FasterWhisper,
}

impl Default for AsrMode {
    fn default() -> Self {
        AsrMode::WhisperCpp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrSettings {
    pub mode: AsrMode,
    pub model_size: String,
    pub device: String,
    pub language: String,
}

impl Default for AsrSettings {
    fn default() -> Self {
        Self {
            mode: AsrMode::WhisperCpp,
            model_size: "base".to_string(),
            device: "cpu".to_string(),
            language: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebReadonlySettings {
    pub detail_fetch_mode: DetailFetchMode,
    pub max_images_per_note: u32,
}

impl Default for WebReadonlySettings {
    fn default() -> Self {
        Self {
            detail_fetch_mode: DetailFetchMode::Auto,
            max_images_per_note: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XiaohongshuSettings {
    pub mode: String,
    pub collection_id: String,
    pub default_limit: u32,
    pub max_limit: u32,
    pub random_delay_min_seconds: u64,
    pub random_delay_max_seconds: u64,
    pub min_live_sync_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub circuit_breaker_failures: u32,
    pub web_readonly: WebReadonlySettings,
    /// Path to a HAR capture used to seed `AuthCapture` (spec §4.8).
    pub har_capture_path: PathBuf,
    /// Fallback cURL file, used when the HAR capture is unusable.
    pub curl_capture_path: PathBuf,
    pub allowed_hosts: Vec<String>,
}

impl Default for XiaohongshuSettings {
    fn default() -> Self {
        Self {
            mode: "web_readonly".to_string(),
            collection_id: String::new(),
            default_limit: 20,
            max_limit: 100,
            random_delay_min_seconds: 2,
            random_delay_max_seconds: 6,
            min_live_sync_interval_seconds: 1800,
            request_timeout_seconds: 15,
            circuit_breaker_failures: 3,
            web_readonly: WebReadonlySettings::default(),
            har_capture_path: PathBuf::from("captures/xiaohongshu.har"),
            curl_capture_path: PathBuf::from("captures/xiaohongshu.curl"),
            allowed_hosts: vec![
                "www.xiaohongshu.com".to_string(),
                "edith.xiaohongshu.com".to_string(),
                "xhslink.com".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliSettings {
    pub max_video_minutes: u32,
}

impl Default for BilibiliSettings {
    fn default() -> Self {
        Self {
            max_video_minutes: 240,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub log_level: String,
    pub bind_host: String,
    pub bind_port: u16,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
        }
    }
}

/// External tool paths, resolved against the config file's directory at
/// load time (spec §9: "ambient cwd for relative paths" is forbidden).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub whisper_binary_path: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            whisper_binary_path: "whisper".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
    pub scratch_dir: PathBuf,
    /// Cadence of the background snapshot daemon (spec §6 backup directory).
    pub backup_interval_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/midas.db"),
            backup_dir: PathBuf::from("data/backups"),
            scratch_dir: PathBuf::from("data/scratch"),
            backup_interval_seconds: 21_600,
        }
    }
}

/// The full settings tree loaded from the YAML config file (spec §4.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigTree {
    pub llm: LlmSettings,
    pub asr: AsrSettings,
    pub xiaohongshu: XiaohongshuSettings,
    pub bilibili: BilibiliSettings,
    pub runtime: RuntimeSettings,
    pub tools: ToolSettings,
    pub storage: StorageSettings,
}

/// Dotted config paths rejected from `editable_snapshot` and
/// `apply_patch` (spec §4.1: "API keys, cookies, raw header maps").
pub const SENSITIVE_PATHS: &[&str] = &["llm.api_key"];

pub fn is_sensitive_path(path: &str) -> bool {
    SENSITIVE_PATHS.contains(&path)
}
