use brain_core::error::{BrainError, ErrorContext, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// One persisted row: a single chunk's embedding plus enough metadata to
/// recover its span and text without re-reading the note.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRow {
    pub entity_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub chunk_start: usize,
    pub chunk_end: usize,
    pub chunk_text: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NearestFilter {
    pub folder_prefix: Option<String>,
    pub entity_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestMatch {
    pub entity_id: String,
    pub chunk_index: usize,
    pub score: f32,
    pub chunk_text: String,
    pub chunk_start: usize,
    pub chunk_end: usize,
}

/// A single-file embedded database of `(entity_id, chunk_index, embedding,
/// chunk_text, span)` rows, one secondary index on `entity_id`.
pub struct VectorStore {
    conn: Mutex<Connection>,
    dimension: usize,
}

impl VectorStore {
    /// Opens (creating if absent) the database at `path` and ensures the
    /// schema exists. `dimension` is validated on every insert.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| BrainError::Config {
            message: format!("failed to open vector store: {e}"),
        })?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimension,
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| BrainError::Config {
            message: format!("failed to open in-memory vector store: {e}"),
        })?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimension,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS brain_embeddings (
                entity_id    TEXT NOT NULL,
                chunk_index  INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                chunk_start  INTEGER NOT NULL,
                chunk_end    INTEGER NOT NULL,
                chunk_text   TEXT NOT NULL,
                vector       BLOB NOT NULL,
                created_at   TEXT NOT NULL,
                PRIMARY KEY (entity_id, chunk_index)
            );
            CREATE INDEX IF NOT EXISTS idx_brain_embeddings_entity_id
                ON brain_embeddings(entity_id);",
        )
        .map_err(|e| BrainError::Config {
            message: format!("failed to initialize schema: {e}"),
        })?;
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(BrainError::BadRequest {
                message: format!(
                    "vector dimension {} does not match configured dimension {}",
                    vector.len(),
                    self.dimension
                ),
                context: ErrorContext::new(),
            });
        }
        if vector.iter().any(|v| v.is_nan() || v.is_infinite()) {
            return Err(BrainError::BadRequest {
                message: "vector contains NaN or infinite components".to_string(),
                context: ErrorContext::new(),
            });
        }
        Ok(())
    }

    /// Atomically deletes existing rows for `entity_id` and inserts `rows`
    /// in a single transaction. On failure, nothing changes.
    pub fn replace_chunks(&self, entity_id: &str, rows: &[EmbeddingRow]) -> Result<()> {
        for row in rows {
            self.validate_vector(&row.vector)?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| BrainError::Transient {
            message: format!("failed to start transaction: {e}"),
            context: ErrorContext::new().with_note_id(entity_id),
        })?;

        tx.execute(
            "DELETE FROM brain_embeddings WHERE entity_id = ?1",
            params![entity_id],
        )
        .map_err(|e| BrainError::Transient {
            message: format!("failed to delete existing rows: {e}"),
            context: ErrorContext::new().with_note_id(entity_id),
        })?;

        for row in rows {
            tx.execute(
                "INSERT INTO brain_embeddings
                    (entity_id, chunk_index, total_chunks, chunk_start, chunk_end, chunk_text, vector, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.entity_id,
                    row.chunk_index as i64,
                    row.total_chunks as i64,
                    row.chunk_start as i64,
                    row.chunk_end as i64,
                    row.chunk_text,
                    pack_vector(&row.vector),
                    row.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| BrainError::Transient {
                message: format!("failed to insert row: {e}"),
                context: ErrorContext::new().with_note_id(entity_id),
            })?;
        }

        tx.commit().map_err(|e| BrainError::Transient {
            message: format!("failed to commit transaction: {e}"),
            context: ErrorContext::new().with_note_id(entity_id),
        })?;
        Ok(())
    }

    /// Cosine-similarity search over every row, returning the top `k`
    /// matches ordered by descending score, tie-broken by descending
    /// `entity_id` then ascending `chunk_index`.
    pub fn nearest(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&NearestFilter>,
    ) -> Result<Vec<NearestMatch>> {
        self.validate_vector(query_vec)?;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT entity_id, chunk_index, chunk_text, chunk_start, chunk_end, vector FROM brain_embeddings")
            .map_err(|e| BrainError::Transient {
                message: format!("failed to prepare query: {e}"),
                context: ErrorContext::new(),
            })?;

        let rows = stmt
            .query_map([], |row| {
                let entity_id: String = row.get(0)?;
                let chunk_index: i64 = row.get(1)?;
                let chunk_text: String = row.get(2)?;
                let chunk_start: i64 = row.get(3)?;
                let chunk_end: i64 = row.get(4)?;
                let vector_blob: Vec<u8> = row.get(5)?;
                Ok((entity_id, chunk_index, chunk_text, chunk_start, chunk_end, vector_blob))
            })
            .map_err(|e| BrainError::Transient {
                message: format!("failed to query rows: {e}"),
                context: ErrorContext::new(),
            })?;

        let mut matches = Vec::new();
        for row in rows {
            let (entity_id, chunk_index, chunk_text, chunk_start, chunk_end, vector_blob) =
                row.map_err(|e| BrainError::Transient {
                    message: format!("failed to decode row: {e}"),
                    context: ErrorContext::new(),
                })?;

            if let Some(f) = filter {
                if let Some(prefix) = &f.folder_prefix {
                    if !entity_id.starts_with(prefix.as_str()) {
                        continue;
                    }
                }
                if let Some(ids) = &f.entity_ids {
                    if !ids.contains(&entity_id) {
                        continue;
                    }
                }
            }

            let vector = unpack_vector(&vector_blob);
            let score = cosine_similarity(query_vec, &vector);
            matches.push(NearestMatch {
                entity_id,
                chunk_index: chunk_index as usize,
                score,
                chunk_text,
                chunk_start: chunk_start as usize,
                chunk_end: chunk_end as usize,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.entity_id.cmp(&a.entity_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        matches.truncate(k);
        Ok(matches)
    }

    pub fn delete(&self, entity_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM brain_embeddings WHERE entity_id = ?1",
            params![entity_id],
        )
        .map_err(|e| BrainError::Transient {
            message: format!("failed to delete entity: {e}"),
            context: ErrorContext::new().with_note_id(entity_id),
        })?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM brain_embeddings", [], |row| row.get(0))
            .map_err(|e| BrainError::Transient {
                message: format!("failed to count rows: {e}"),
                context: ErrorContext::new(),
            })?;
        Ok(count as u64)
    }

    /// Distinct entity_ids currently indexed, for diagnostics.
    pub fn iter_entities(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT DISTINCT entity_id FROM brain_embeddings ORDER BY entity_id")
            .map_err(|e| BrainError::Transient {
                message: format!("failed to prepare query: {e}"),
                context: ErrorContext::new(),
            })?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| BrainError::Transient {
                message: format!("failed to query entities: {e}"),
                context: ErrorContext::new(),
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BrainError::Transient {
                message: format!("failed to decode entities: {e}"),
                context: ErrorContext::new(),
            })?;
        Ok(ids)
    }

    /// Whether `entity_id` has any rows, used by catch-up to find notes
    /// missing from the index.
    pub fn has_entity(&self, entity_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM brain_embeddings WHERE entity_id = ?1 LIMIT 1",
                params![entity_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| BrainError::Transient {
                message: format!("failed to check entity: {e}"),
                context: ErrorContext::new().with_note_id(entity_id),
            })?;
        Ok(found.is_some())
    }
}

fn pack_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn unpack_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity_id: &str, chunk_index: usize, vector: Vec<f32>) -> EmbeddingRow {
        EmbeddingRow {
            entity_id: entity_id.to_string(),
            chunk_index,
            total_chunks: 1,
            chunk_start: 0,
            chunk_end: 5,
            chunk_text: "hello".to_string(),
            vector,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replace_chunks_is_atomic_on_rebuild() {
        let store = VectorStore::open_in_memory(3).unwrap();
        store.replace_chunks("n1", &[row("n1", 0, vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        store
            .replace_chunks("n1", &[row("n1", 0, vec![0.0, 1.0, 0.0]), row("n1", 1, vec![0.0, 0.0, 1.0])])
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let store = VectorStore::open_in_memory(3).unwrap();
        let err = store.replace_chunks("n1", &[row("n1", 0, vec![1.0, 0.0])]).unwrap_err();
        assert!(matches!(err, BrainError::BadRequest { .. }));
    }

    #[test]
    fn rejects_nan_vector() {
        let store = VectorStore::open_in_memory(3).unwrap();
        let err = store
            .replace_chunks("n1", &[row("n1", 0, vec![1.0, f32::NAN, 0.0])])
            .unwrap_err();
        assert!(matches!(err, BrainError::BadRequest { .. }));
    }

    #[test]
    fn nearest_orders_by_descending_score() {
        let store = VectorStore::open_in_memory(2).unwrap();
        store.replace_chunks("a", &[row("a", 0, vec![1.0, 0.0])]).unwrap();
        store.replace_chunks("b", &[row("b", 0, vec![0.0, 1.0])]).unwrap();

        let results = store.nearest(&[1.0, 0.0], 2, None).unwrap();
        assert_eq!(results[0].entity_id, "a");
        assert_eq!(results[1].entity_id, "b");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn nearest_tie_breaks_descending_entity_then_ascending_chunk() {
        let store = VectorStore::open_in_memory(2).unwrap();
        store
            .replace_chunks("a", &[row("a", 0, vec![1.0, 0.0]), row("a", 1, vec![1.0, 0.0])])
            .unwrap();
        store.replace_chunks("b", &[row("b", 0, vec![1.0, 0.0])]).unwrap();

        let results = store.nearest(&[1.0, 0.0], 3, None).unwrap();
        assert_eq!(results[0].entity_id, "b");
        assert_eq!(results[1].entity_id, "a");
        assert_eq!(results[1].chunk_index, 0);
        assert_eq!(results[2].chunk_index, 1);
    }

    #[test]
    fn filter_by_folder_prefix() {
        let store = VectorStore::open_in_memory(2).unwrap();
        store.replace_chunks("notes/a", &[row("notes/a", 0, vec![1.0, 0.0])]).unwrap();
        store.replace_chunks("other/b", &[row("other/b", 0, vec![1.0, 0.0])]).unwrap();

        let filter = NearestFilter {
            folder_prefix: Some("notes/".to_string()),
            entity_ids: None,
        };
        let results = store.nearest(&[1.0, 0.0], 10, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id, "notes/a");
    }

    #[test]
    fn delete_removes_all_rows_for_entity() {
        let store = VectorStore::open_in_memory(2).unwrap();
        store
            .replace_chunks("a", &[row("a", 0, vec![1.0, 0.0]), row("a", 1, vec![0.0, 1.0])])
            .unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.has_entity("a").unwrap());
    }
}
