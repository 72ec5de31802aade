pub mod fetcher;
pub mod pipeline;

pub use fetcher::{ListItem, ListPage, NoteDetail, XiaohongshuFetcher};
pub use pipeline::{normalize_note_id, SyncProgress, XiaohongshuPipeline};
