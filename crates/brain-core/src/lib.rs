//! Shared domain types and capability traits for the brain knowledge engine.
//!
//! This crate defines the seams the rest of the workspace depends on instead
//! of depending on each other directly: [`NoteStore`] and [`EmbeddingProvider`]
//! are the two capability traits every higher-level crate is injected with,
//! and [`BrainError`] is the closed error-kind set every operation reports
//! through.

pub mod chunk;
pub mod clock;
pub mod embedding;
pub mod error;
pub mod note;
pub mod session;

pub use chunk::Chunk;
pub use clock::{Clock, SystemClock};
pub use embedding::EmbeddingProvider;
pub use error::{BrainError, ErrorContext, Result};
pub use note::{DirEntry, DirEntryKind, Note, NoteStore, SearchHit};
pub use session::{
    ModeHistoryEntry, Observation, ObservationCategory, Relation, RelationType, SessionMode,
    SessionState, SessionStatus, WorkflowRecord,
};
