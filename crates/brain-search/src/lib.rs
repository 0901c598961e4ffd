//! Hybrid lexical + semantic search over a `NoteStore` and a `VectorStore`.

mod engine;

pub use engine::{SearchEngine, SearchMode, SearchResult, SearchSource};
