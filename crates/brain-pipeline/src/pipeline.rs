use brain_chunk::{chunk_text, ChunkConfig};
use brain_core::embedding::EmbeddingProvider;
use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::note::NoteStore;
use brain_vector::{EmbeddingRow, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};

const MAX_CHUNKS_PER_BATCH: usize = 32;
const LARGE_CORPUS_THRESHOLD: usize = 500;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub concurrency: usize,
    pub chunk_config: ChunkConfig,
    pub catch_up_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            chunk_config: ChunkConfig::default(),
            catch_up_deadline: Duration::from_secs(300),
        }
    }
}

impl PipelineConfig {
    pub fn clamped(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, 16);
        self
    }
}

/// Per-note outcome of a `process_many`/`catch_up` run.
#[derive(Debug, Clone)]
pub struct NoteReport {
    pub identifier: String,
    pub result: std::result::Result<usize, String>,
}

/// Aggregate outcome of a batch of notes.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub elapsed_ms: u64,
}

/// Brings the VectorStore into agreement with the NoteStore for a selected
/// set of notes, via a semaphore-bounded pool of concurrent note builds.
pub struct EmbeddingPipeline {
    notes: Arc<dyn NoteStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<VectorStore>,
    config: PipelineConfig,
}

impl EmbeddingPipeline {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<VectorStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            notes,
            embeddings,
            vectors,
            config: config.clamped(),
        }
    }

    /// Reads a note's body, chunks it, embeds the chunks (in batches of up
    /// to `MAX_CHUNKS_PER_BATCH`), and atomically replaces its vector rows.
    ///
    /// Returns the number of chunks written. Partially-completed notes are
    /// left unchanged: `replace_chunks` only runs once all batches for this
    /// note have succeeded.
    pub async fn process_note(&self, identifier: &str) -> Result<usize> {
        let started = Instant::now();
        let note = self.notes.read_note(identifier, None).await?;
        let chunks = chunk_text(&note.body, self.config.chunk_config);
        if chunks.is_empty() {
            self.vectors.replace_chunks(identifier, &[])?;
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(MAX_CHUNKS_PER_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self.embeddings.embed_batch(&texts).await.map_err(|e| {
                attach_note_context(e, identifier, started.elapsed().as_millis() as u64, chunks.len())
            })?;
            vectors.extend(embedded);
        }

        let now = Utc::now();
        let rows: Vec<EmbeddingRow> = chunks
            .iter()
            .zip(vectors.into_iter())
            .map(|(chunk, vector)| EmbeddingRow {
                entity_id: identifier.to_string(),
                chunk_index: chunk.chunk_index,
                total_chunks: chunk.total_chunks,
                chunk_start: chunk.start,
                chunk_end: chunk.end,
                chunk_text: chunk.text.clone(),
                vector,
                created_at: now,
            })
            .collect();

        self.vectors.replace_chunks(identifier, &rows)?;
        info!(
            identifier,
            chunk_count = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "note embedded"
        );
        Ok(rows.len())
    }

    /// Schedules `process_note` over `identifiers` with at most
    /// `self.config.concurrency` in flight at once.
    pub async fn process_many(&self, identifiers: &[String]) -> BatchReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut handles = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            let identifier = identifier.clone();
            let semaphore = Arc::clone(&semaphore);
            let notes = Arc::clone(&self.notes);
            let embeddings = Arc::clone(&self.embeddings);
            let vectors = Arc::clone(&self.vectors);
            let config = self.config.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let pipeline = EmbeddingPipeline { notes, embeddings, vectors, config };
                let result = pipeline.process_note(&identifier).await;
                NoteReport {
                    identifier,
                    result: result.map_err(|e| e.to_string()),
                }
            }));
        }

        let mut report = BatchReport::default();
        for handle in handles {
            match handle.await {
                Ok(NoteReport { identifier, result: Ok(_) }) => report.succeeded.push(identifier),
                Ok(NoteReport { identifier, result: Err(e) }) => report.failed.push((identifier, e)),
                Err(join_err) => {
                    warn!(error = %join_err, "note processing task panicked");
                }
            }
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed_ms,
            "batch embedding complete"
        );
        report
    }

    /// Finds identifiers with no VectorStore rows and fires off
    /// `process_many` without waiting for it. Never surfaces errors to the
    /// caller: failures are logged and the task ends.
    ///
    /// Returns immediately once the health check and identifier scan are
    /// done (both are quick relative to embedding work).
    pub async fn catch_up(self: Arc<Self>, project: Option<String>) -> Result<()> {
        if !self.embeddings.health().await {
            return Err(BrainError::Transient {
                message: "embedding service health check failed; aborting catch-up".to_string(),
                context: ErrorContext::new(),
            });
        }

        let entries = self.notes.list_directory(project.as_deref(), 8, None).await?;
        let mut missing = Vec::new();
        for entry in entries {
            if matches!(entry.kind, brain_core::note::DirEntryKind::Dir) {
                continue;
            }
            if !self.vectors.has_entity(&entry.permalink)? {
                missing.push(entry.permalink);
            }
        }

        if missing.len() > LARGE_CORPUS_THRESHOLD {
            warn!(count = missing.len(), "large corpus catch-up starting");
        }

        info!(count = missing.len(), "catch-up triggered");
        let deadline = self.config.catch_up_deadline;
        let pipeline = Arc::clone(&self);
        tokio::spawn(async move {
            match tokio::time::timeout(deadline, pipeline.process_many(&missing)).await {
                Ok(report) => {
                    if !report.failed.is_empty() {
                        warn!(failed = ?report.failed, "catch-up completed with failures");
                    }
                }
                Err(_) => warn!("catch-up deadline exceeded; partial results are durable"),
            }
        });
        Ok(())
    }
}

fn attach_note_context(err: BrainError, identifier: &str, elapsed_ms: u64, chunk_count: usize) -> BrainError {
    match err {
        BrainError::Transient { message, mut context } => {
            context.note_id = Some(identifier.to_string());
            context.elapsed_ms = Some(elapsed_ms);
            context.chunk_count = Some(chunk_count);
            BrainError::Transient { message, context }
        }
        BrainError::BadRequest { message, mut context } => {
            context.note_id = Some(identifier.to_string());
            BrainError::BadRequest { message, context }
        }
        BrainError::Protocol { message, mut context } => {
            context.note_id = Some(identifier.to_string());
            BrainError::Protocol { message, context }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brain_notes::InMemoryNoteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMockProvider {
        dimension: usize,
        calls: AtomicUsize,
        fail_containing: Option<String>,
    }

    impl CountingMockProvider {
        fn new(dimension: usize) -> Self {
            Self { dimension, calls: AtomicUsize::new(0), fail_containing: None }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingMockProvider {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.embed_batch(&[text.to_string()]).await?.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(needle) = &self.fail_containing {
                if texts.iter().any(|t| t.contains(needle.as_str())) {
                    return Err(BrainError::Transient {
                        message: "simulated failure".to_string(),
                        context: ErrorContext::new(),
                    });
                }
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dimension];
                    v[0] = t.len() as f32;
                    v
                })
                .collect())
        }

        async fn health(&self) -> bool {
            true
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    fn setup() -> (Arc<InMemoryNoteStore>, Arc<VectorStore>) {
        let notes = Arc::new(InMemoryNoteStore::new());
        let vectors = Arc::new(VectorStore::open_in_memory(4).unwrap());
        (notes, vectors)
    }

    #[tokio::test]
    async fn process_note_writes_expected_row_count() {
        let (notes, vectors) = setup();
        notes.seed("n1", "hello");
        let embeddings = Arc::new(CountingMockProvider::new(4));
        let pipeline = EmbeddingPipeline::new(notes, embeddings, Arc::clone(&vectors), PipelineConfig::default());

        let written = pipeline.process_note("n1").await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(vectors.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn process_many_reports_per_note_failure() {
        let (notes, vectors) = setup();
        notes.seed("n1", "hello");
        notes.seed("n2", "world-fail");
        notes.seed("n3", "alpha");
        let mut provider = CountingMockProvider::new(4);
        provider.fail_containing = Some("fail".to_string());
        let embeddings = Arc::new(provider);
        let pipeline = EmbeddingPipeline::new(notes, embeddings, Arc::clone(&vectors), PipelineConfig::default());

        let report = pipeline
            .process_many(&["n1".to_string(), "n2".to_string(), "n3".to_string()])
            .await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "n2");
        assert!(!vectors.has_entity("n2").unwrap());
        assert!(vectors.has_entity("n1").unwrap());
        assert!(vectors.has_entity("n3").unwrap());
    }

    #[tokio::test]
    async fn catch_up_skips_already_indexed_notes() {
        let (notes, vectors) = setup();
        notes.seed("n1", "hello");
        notes.seed("n2", "world");
        let embeddings = Arc::new(CountingMockProvider::new(4));
        let pipeline = Arc::new(EmbeddingPipeline::new(notes, embeddings, Arc::clone(&vectors), PipelineConfig::default()));

        pipeline.process_note("n1").await.unwrap();
        pipeline.clone().catch_up(None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(vectors.has_entity("n2").unwrap());
    }
}
