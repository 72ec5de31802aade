//! C1: typed, hot-swappable access to runtime settings.

pub mod editable;
pub mod handle;
pub mod paths;
pub mod settings;

pub use editable::EditableEntry;
pub use handle::ConfigHandle;
pub use settings::{
    AsrMode, AsrSettings, BilibiliSettings, ConfigTree, DetailFetchMode, LlmSettings,
    RuntimeSettings, StorageSettings, ToolSettings, WebReadonlySettings, XiaohongshuSettings,
};
