//! Reference implementations of [`brain_core::NoteStore`]: a filesystem
//! backend for real use and an in-memory mock for hermetic tests of the
//! crates that consume the trait (`brain-pipeline`, `brain-search`,
//! `brain-session`, `brain-import`).

mod file_store;
mod mock;

pub use file_store::FileNoteStore;
pub use mock::InMemoryNoteStore;
