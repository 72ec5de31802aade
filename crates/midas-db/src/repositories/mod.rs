pub mod dedupe;
pub mod merge;
pub mod notes;

pub use dedupe::DedupeStore;
pub use merge::MergeStore;
pub use notes::{NoteFilter, NoteStore};
