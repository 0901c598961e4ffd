//! HTTP embedding client against a remote embedding service (Ollama-shaped
//! `/api/embed`).

mod client;
mod error;

pub use client::{EmbeddingClient, EmbeddingClientConfig};
pub use error::classify_status;
