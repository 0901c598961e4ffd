use serde::{Deserialize, Serialize};

/// An ordered slice of a note's body, produced deterministically by the Chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}
