//! Single-file embedded vector store for chunked note embeddings.
//!
//! Backed by `rusqlite` with vectors stored as little-endian packed `f32`
//! blobs; cosine similarity is computed in-process rather than delegating
//! to a vector-search extension.

mod store;

pub use store::{EmbeddingRow, NearestFilter, NearestMatch, VectorStore};
