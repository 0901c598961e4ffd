use crate::error::Result;
use async_trait::async_trait;

/// Capability trait for turning text into vectors.
///
/// Implemented by `brain-llm`'s HTTP client against the remote embedding
/// service, and by hermetic mocks in tests of every crate that consumes it
/// (`brain-pipeline`, `brain-search`).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single string. Implementations must not make a network call
    /// for this beyond what's necessary for one input.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of strings. `output[i]` must correspond to `input[i]`.
    /// An empty `texts` returns `Ok(vec![])` without any network call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Liveness probe with a short timeout; returns `false` rather than
    /// erroring when the endpoint is unreachable.
    async fn health(&self) -> bool;

    /// Fixed vector dimensionality this provider produces.
    fn dimension(&self) -> usize;
}
