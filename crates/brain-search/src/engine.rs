use brain_core::embedding::EmbeddingProvider;
use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::note::NoteStore;
use brain_vector::VectorStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_LIMIT: usize = 10;
const DEFAULT_THRESHOLD: f32 = 0.7;
const SNIPPET_MAX: usize = 240;
/// How many chunk-level matches to pull per query before collapsing to
/// one result per permalink; a single note can own many chunks.
const SEMANTIC_OVERFETCH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Auto,
    Semantic,
    Keyword,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Semantic,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub permalink: String,
    pub title: String,
    pub similarity_score: f32,
    pub snippet: String,
    pub source: SearchSource,
    pub full_content: Option<String>,
}

pub struct SearchEngine {
    notes: Arc<dyn NoteStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<VectorStore>,
}

impl SearchEngine {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<VectorStore>,
    ) -> Self {
        Self { notes, embeddings, vectors }
    }

    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
        mode: SearchMode,
        full_content: bool,
        project: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD).clamp(0.0, 1.0);

        let results = match mode {
            SearchMode::Keyword => self.keyword_search(query, None, full_content, project).await?,
            SearchMode::Semantic => self.semantic_search(query, project, limit, threshold, full_content).await?,
            SearchMode::Auto => {
                let (lexical, semantic) = tokio::join!(
                    self.keyword_search(query, None, full_content, project),
                    self.semantic_search(query, project, limit, threshold, full_content)
                );
                match (lexical, semantic) {
                    (Ok(l), Ok(s)) => fuse(l, s),
                    (Ok(l), Err(e)) => {
                        warn!(error = %e, "semantic search failed, falling back to keyword results only");
                        l
                    }
                    (Err(e), Ok(s)) => {
                        warn!(error = %e, "keyword search failed, falling back to semantic results only");
                        s
                    }
                    (Err(l_err), Err(s_err)) => {
                        return Err(BrainError::Transient {
                            message: format!(
                                "both search subsystems failed: keyword={l_err}, semantic={s_err}"
                            ),
                            context: ErrorContext::new(),
                        })
                    }
                }
            }
        };

        let mut results = results;
        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.permalink.cmp(&b.permalink))
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        folders: Option<&[String]>,
        full_content: bool,
        project: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let hits = self.notes.search(query, folders, full_content, project).await?;
        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                permalink: hit.permalink,
                title: hit.title,
                similarity_score: 1.0,
                snippet: truncate_snippet(&hit.snippet),
                source: SearchSource::Keyword,
                full_content: hit.full_content,
            })
            .collect())
    }

    async fn semantic_search(
        &self,
        query: &str,
        project: Option<&str>,
        limit: usize,
        threshold: f32,
        full_content: bool,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = self.embeddings.embed_one(query).await?;
        // `VectorStore` entity_ids are note permalinks (e.g. `notes/foo`), not
        // project-prefixed, so the project can't be expressed as a
        // `folder_prefix`; project scoping happens via `NoteStore` reads below.
        let matches = self.vectors.nearest(&query_vector, limit * SEMANTIC_OVERFETCH, None)?;

        let mut best: HashMap<String, brain_vector::NearestMatch> = HashMap::new();
        for m in matches {
            if m.score < threshold {
                continue;
            }
            best.entry(m.entity_id.clone())
                .and_modify(|existing| {
                    if m.score > existing.score {
                        *existing = m.clone();
                    }
                })
                .or_insert(m);
        }

        let mut results = Vec::with_capacity(best.len());
        for (permalink, m) in best {
            let title = match self.notes.read_note(&permalink, project).await {
                Ok(note) => note.title,
                Err(_) => permalink.clone(),
            };
            let content = if full_content {
                self.notes.read_note(&permalink, project).await.ok().map(|n| n.body)
            } else {
                None
            };
            results.push(SearchResult {
                permalink,
                title,
                similarity_score: m.score,
                snippet: truncate_snippet(&m.chunk_text),
                source: SearchSource::Semantic,
                full_content: content,
            });
        }
        Ok(results)
    }
}

fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_MAX {
        return text.to_string();
    }
    text.chars().take(SNIPPET_MAX).collect()
}

/// Merges lexical and semantic result sets, keeping the higher-scoring
/// entry per permalink (and its winning source).
fn fuse(lexical: Vec<SearchResult>, semantic: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut by_permalink: HashMap<String, SearchResult> = HashMap::new();
    for result in lexical.into_iter().chain(semantic.into_iter()) {
        by_permalink
            .entry(result.permalink.clone())
            .and_modify(|existing| {
                if result.similarity_score > existing.similarity_score {
                    *existing = result.clone();
                }
            })
            .or_insert(result);
    }
    by_permalink.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brain_core::error::Result as BrainResult;
    use brain_notes::InMemoryNoteStore;

    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed_one(&self, text: &str) -> BrainResult<Vec<f32>> {
            let mut v = vec![0.0; 4];
            v[0] = text.len() as f32;
            Ok(v)
        }
        async fn embed_batch(&self, texts: &[String]) -> BrainResult<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed_one(t).await?);
            }
            Ok(out)
        }
        async fn health(&self) -> bool {
            true
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    fn setup() -> (Arc<InMemoryNoteStore>, Arc<VectorStore>, Arc<StubProvider>) {
        (
            Arc::new(InMemoryNoteStore::new()),
            Arc::new(VectorStore::open_in_memory(4).unwrap()),
            Arc::new(StubProvider),
        )
    }

    #[tokio::test]
    async fn keyword_only_mode_ignores_semantic() {
        let (notes, vectors, embeddings) = setup();
        notes.seed("a", "hello world");
        let engine = SearchEngine::new(notes, embeddings, vectors);

        let results = engine
            .search("hello", None, None, SearchMode::Keyword, false, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, SearchSource::Keyword);
    }

    #[tokio::test]
    async fn keyword_search_with_a_project_set_still_finds_notes() {
        // Regression test: a non-default project must scope the NoteStore
        // read, not be treated as an entity-id/folder prefix — note
        // permalinks like "notes/hello" never start with the project name.
        let dir = tempfile::tempdir().unwrap();
        let notes: Arc<dyn NoteStore> = Arc::new(brain_notes::FileNoteStore::new(dir.path(), "default"));
        notes.write_note("notes", "Hello", "hello world", Some("myproject")).await.unwrap();
        let vectors = Arc::new(VectorStore::open_in_memory(4).unwrap());
        let engine = SearchEngine::new(notes, Arc::new(StubProvider), vectors);

        let results = engine
            .search("hello", None, None, SearchMode::Keyword, false, Some("myproject"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].permalink, "notes/hello");
    }

    #[tokio::test]
    async fn semantic_results_below_threshold_are_dropped() {
        let (notes, vectors, embeddings) = setup();
        notes.seed("a", "hello world");
        vectors
            .replace_chunks(
                "a",
                &[brain_vector::EmbeddingRow {
                    entity_id: "a".to_string(),
                    chunk_index: 0,
                    total_chunks: 1,
                    chunk_start: 0,
                    chunk_end: 11,
                    chunk_text: "hello world".to_string(),
                    vector: vec![0.0, 1.0, 0.0, 0.0],
                    created_at: chrono::Utc::now(),
                }],
            )
            .unwrap();
        let engine = SearchEngine::new(notes, embeddings, vectors);

        let results = engine
            .search("hello", None, Some(0.99), SearchMode::Semantic, false, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn fusion_prefers_higher_score_and_sorts_results() {
        let lexical = vec![SearchResult {
            permalink: "a".to_string(),
            title: "A".to_string(),
            similarity_score: 1.0,
            snippet: "x".to_string(),
            source: SearchSource::Keyword,
            full_content: None,
        }];
        let semantic = vec![SearchResult {
            permalink: "b".to_string(),
            title: "B".to_string(),
            similarity_score: 0.9,
            snippet: "y".to_string(),
            source: SearchSource::Semantic,
            full_content: None,
        }];
        let fused = fuse(lexical, semantic);
        assert_eq!(fused.len(), 2);
    }
}
