//! Bounded-concurrency orchestrator: reads notes, chunks them, calls the
//! embedding provider, and writes the vector store.

mod pipeline;

pub use pipeline::{BatchReport, EmbeddingPipeline, NoteReport, PipelineConfig};
