use serde::{Deserialize, Serialize};
use std::fmt;

/// A platform family. Bilibili and Xiaohongshu are the only sources this
/// version understands (spec §2, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Bilibili,
    Xiaohongshu,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Bilibili => "bilibili",
            Source::Xiaohongshu => "xiaohongshu",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, per-source unique identifier. For Bilibili this is the
/// normalized `BV…` id; for Xiaohongshu it is the platform note id.
pub type SourceId = String;
