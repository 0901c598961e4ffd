use async_trait::async_trait;
use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::note::{DirEntry, DirEntryKind, Note, NoteStore, SearchHit};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// In-memory NoteStore used across the workspace's test suites so
/// `brain-pipeline`, `brain-search`, and `brain-session` can be tested
/// without a real daemon.
#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: Mutex<BTreeMap<String, Note>>,
    simulate_errors: Mutex<Option<String>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a note directly, bypassing `write_note`'s slugification.
    pub fn seed(&self, permalink: &str, body: &str) {
        let now = Utc::now();
        self.notes.lock().insert(
            permalink.to_string(),
            Note {
                permalink: permalink.to_string(),
                title: permalink.rsplit('/').next().unwrap_or(permalink).to_string(),
                folder: permalink.rsplit_once('/').map(|(f, _)| f.to_string()).unwrap_or_default(),
                body: body.to_string(),
                frontmatter: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Error-injection hook, mirroring the mock-state pattern used
    /// throughout the workspace's test support.
    pub fn set_simulate_errors(&self, enabled: bool, message: &str) {
        *self.simulate_errors.lock() = enabled.then(|| message.to_string());
    }

    fn maybe_fail(&self) -> Result<()> {
        if let Some(message) = self.simulate_errors.lock().clone() {
            return Err(BrainError::Transient {
                message,
                context: ErrorContext::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn write_note(
        &self,
        folder: &str,
        title: &str,
        body: &str,
        _project: Option<&str>,
    ) -> Result<String> {
        self.maybe_fail()?;
        let slug = title.to_lowercase().replace(' ', "-");
        let permalink = if folder.is_empty() { slug } else { format!("{folder}/{slug}") };
        self.seed(&permalink, body);
        Ok(permalink)
    }

    async fn read_note(&self, identifier: &str, _project: Option<&str>) -> Result<Note> {
        self.maybe_fail()?;
        self.notes.lock().get(identifier).cloned().ok_or_else(|| BrainError::NotFound {
            what: format!("note {identifier}"),
            context: ErrorContext::new().with_note_id(identifier),
        })
    }

    async fn list_directory(
        &self,
        _project: Option<&str>,
        _depth: u32,
        _glob: Option<&str>,
    ) -> Result<Vec<DirEntry>> {
        self.maybe_fail()?;
        Ok(self
            .notes
            .lock()
            .values()
            .map(|n| DirEntry {
                kind: DirEntryKind::File,
                permalink: n.permalink.clone(),
                title: n.title.clone(),
                updated_at: n.updated_at,
            })
            .collect())
    }

    async fn search(
        &self,
        query: &str,
        folders: Option<&[String]>,
        full_content: bool,
        _project: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        self.maybe_fail()?;
        let needle = query.to_lowercase();
        Ok(self
            .notes
            .lock()
            .values()
            .filter(|n| {
                let folder_ok = folders.map(|fs| fs.iter().any(|f| n.permalink.starts_with(f.as_str()))).unwrap_or(true);
                folder_ok && (query.is_empty() || n.body.to_lowercase().contains(&needle))
            })
            .map(|n| SearchHit {
                permalink: n.permalink.clone(),
                title: n.title.clone(),
                snippet: n.body.chars().take(240).collect(),
                full_content: if full_content { Some(n.body.clone()) } else { None },
            })
            .collect())
    }

    async fn delete_note(&self, identifier: &str, _project: Option<&str>) -> Result<()> {
        self.maybe_fail()?;
        self.notes.lock().remove(identifier).map(|_| ()).ok_or_else(|| BrainError::NotFound {
            what: format!("note {identifier}"),
            context: ErrorContext::new().with_note_id(identifier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_and_read() {
        let store = InMemoryNoteStore::new();
        store.seed("n1", "hello world");
        let note = store.read_note("n1", None).await.unwrap();
        assert_eq!(note.body, "hello world");
    }

    #[tokio::test]
    async fn simulated_errors_surface_on_every_operation() {
        let store = InMemoryNoteStore::new();
        store.seed("n1", "hello world");
        store.set_simulate_errors(true, "boom");
        let err = store.read_note("n1", None).await.unwrap_err();
        assert!(matches!(err, BrainError::Transient { .. }));
    }
}
