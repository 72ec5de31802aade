//! Thin adapters from the HTTP framing to the component contracts of
//! C1-C11 (C12, spec §4.12).

pub mod bilibili;
pub mod config;
pub mod health;
pub mod merge;
pub mod notes;
pub mod xiaohongshu;

use midas_models::{MidasError, Source};

pub(crate) fn parse_source(raw: &str) -> Result<Source, MidasError> {
    match raw {
        "bilibili" => Ok(Source::Bilibili),
        "xiaohongshu" => Ok(Source::Xiaohongshu),
        other => Err(MidasError::invalid_input(format!("unknown source '{other}'"))),
    }
}
