use anyhow::Result;
use brain_config::Config;
use brain_core::clock::SystemClock;
use brain_core::embedding::EmbeddingProvider;
use brain_core::note::NoteStore;
use brain_import::AnalyzeImporter;
use brain_llm::{EmbeddingClient, EmbeddingClientConfig};
use brain_notes::FileNoteStore;
use brain_pipeline::{EmbeddingPipeline, PipelineConfig};
use brain_search::SearchEngine;
use brain_session::SessionStore;
use brain_vector::VectorStore;
use std::sync::Arc;

/// Everything a command needs, built once from [`Config`] and shared
/// across the lifetime of a single CLI invocation.
pub struct AppContext {
    pub project: Option<String>,
    pub notes: Arc<dyn NoteStore>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub vectors: Arc<VectorStore>,
    pub pipeline: Arc<EmbeddingPipeline>,
    pub search: Arc<SearchEngine>,
    pub sessions: Arc<SessionStore>,
    pub importer: Arc<AnalyzeImporter>,
}

impl AppContext {
    pub async fn build(config: Config, project_override: Option<String>) -> Result<Self> {
        let project = project_override.or_else(|| Some(config.project.clone()));

        let notes: Arc<dyn NoteStore> =
            Arc::new(FileNoteStore::new(config.vault_path.clone(), config.project.clone()));

        let embeddings: Arc<dyn EmbeddingProvider> = Arc::new(EmbeddingClient::new(EmbeddingClientConfig {
            base_url: config.ollama_base_url.clone(),
            request_timeout: config.ollama_timeout,
            health_timeout: config.ollama_health_timeout,
            ..Default::default()
        })?);

        std::fs::create_dir_all(&config.state_dir)?;
        let vectors = Arc::new(VectorStore::open(config.vector_db_path(), embeddings.dimension())?);

        let pipeline = Arc::new(EmbeddingPipeline::new(
            Arc::clone(&notes),
            Arc::clone(&embeddings),
            Arc::clone(&vectors),
            PipelineConfig { concurrency: config.embedding_concurrency, ..Default::default() },
        ));

        let search = Arc::new(SearchEngine::new(Arc::clone(&notes), Arc::clone(&embeddings), Arc::clone(&vectors)));

        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&notes),
            Arc::new(SystemClock),
            config.session_secret.clone(),
            project.clone(),
        ));

        let importer = Arc::new(AnalyzeImporter::new(Arc::clone(&notes), Some(Arc::clone(&pipeline))));

        Ok(Self { project, notes, embeddings, vectors, pipeline, search, sessions, importer })
    }
}
