use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// A markdown document owned by the NoteStore, identified by a stable
/// path-like permalink.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub permalink: String,
    pub title: String,
    pub folder: String,
    pub body: String,
    pub frontmatter: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirEntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub kind: DirEntryKind,
    pub permalink: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// A lexical search hit as returned by `NoteStore::search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub permalink: String,
    pub title: String,
    pub snippet: String,
    pub full_content: Option<String>,
}

/// The black-box markdown-note storage daemon this crate builds on top of.
///
/// Every operation is `project`-scoped; `None` means the default project
/// (`BRAIN_PROJECT`). This trait is the polymorphism seam described in the
/// design notes: both the pipeline and the search engine are injected with
/// a `dyn NoteStore` so they can be tested hermetically against
/// `brain-notes`'s in-memory mock without a real daemon running.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn write_note(
        &self,
        folder: &str,
        title: &str,
        body: &str,
        project: Option<&str>,
    ) -> Result<String>;

    async fn read_note(&self, identifier: &str, project: Option<&str>) -> Result<Note>;

    async fn list_directory(
        &self,
        project: Option<&str>,
        depth: u32,
        glob: Option<&str>,
    ) -> Result<Vec<DirEntry>>;

    async fn search(
        &self,
        query: &str,
        folders: Option<&[String]>,
        full_content: bool,
        project: Option<&str>,
    ) -> Result<Vec<SearchHit>>;

    async fn delete_note(&self, identifier: &str, project: Option<&str>) -> Result<()>;
}
