//! External collaborators the pipelines shell out to or call over HTTP:
//! audio download (C4), transcription (C5), and LLM summarization (C6).

pub mod asr;
pub mod audio;
pub mod capture;
pub mod llm;

pub use asr::{AsrEngine, Transcript};
pub use audio::{AudioFetchOutput, AudioFetcher};
pub use capture::{load_initial_capture, CaptureRefreshReport};
pub use llm::{LlmSummarizer, SummarizeHints};
