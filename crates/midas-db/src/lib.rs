//! The embedded persistence layer: Dedupe Store (C2) and Note Store (C3),
//! plus the merge record ledger backing the Merge Engine (C11) and the
//! `VACUUM INTO` backup routine invoked after every note write.

pub mod backup;
pub mod client;
pub mod errors;
pub mod repositories;
mod schema;

pub use backup::snapshot;
pub use client::MidasDb;
pub use errors::DbError;
pub use repositories::{DedupeStore, MergeStore, NoteFilter, NoteStore};
