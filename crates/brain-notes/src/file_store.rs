use async_trait::async_trait;
use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::note::{DirEntry, DirEntryKind, Note, NoteStore, SearchHit};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filesystem-backed NoteStore: one markdown file per note, YAML front
/// matter between `---` fences, rooted at `<root>/<project>/...`.
pub struct FileNoteStore {
    root: PathBuf,
    default_project: String,
}

impl FileNoteStore {
    pub fn new(root: impl Into<PathBuf>, default_project: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_project: default_project.into(),
        }
    }

    fn project_dir(&self, project: Option<&str>) -> PathBuf {
        self.root.join(project.unwrap_or(&self.default_project))
    }

    fn path_for(&self, identifier: &str, project: Option<&str>) -> PathBuf {
        self.project_dir(project).join(format!("{identifier}.md"))
    }

    fn slugify(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    fn read_file(&self, path: &Path, permalink: &str) -> Result<Note> {
        let raw = std::fs::read_to_string(path).map_err(|_| BrainError::NotFound {
            what: format!("note {permalink}"),
            context: ErrorContext::new().with_note_id(permalink),
        })?;
        let (frontmatter, body) = split_frontmatter(&raw);
        let metadata = std::fs::metadata(path).ok();
        let updated_at = metadata
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let folder = permalink.rsplit_once('/').map(|(f, _)| f.to_string()).unwrap_or_default();
        let title = frontmatter
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| permalink.rsplit('/').next().unwrap_or(permalink).to_string());

        Ok(Note {
            permalink: permalink.to_string(),
            title,
            folder,
            body: body.to_string(),
            frontmatter,
            created_at: updated_at,
            updated_at,
        })
    }
}

#[async_trait]
impl NoteStore for FileNoteStore {
    async fn write_note(
        &self,
        folder: &str,
        title: &str,
        body: &str,
        project: Option<&str>,
    ) -> Result<String> {
        let slug = Self::slugify(title);
        let permalink = if folder.is_empty() {
            slug
        } else {
            format!("{}/{}", folder.trim_end_matches('/'), slug)
        };
        let path = self.path_for(&permalink, project);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BrainError::Config {
                message: format!("failed to create note directory: {e}"),
            })?;
        }
        // If the caller already supplied its own front-matter fence (e.g. the
        // importer's canonical `title`/`type`/`tags`/`permalink` block),
        // write it through as-is instead of wrapping a second one around it.
        let contents = if body.trim_start().starts_with("---\n") {
            body.to_string()
        } else {
            format!("---\ntitle: {title}\n---\n\n{body}")
        };
        std::fs::write(&path, contents).map_err(|e| BrainError::Transient {
            message: format!("failed to write note: {e}"),
            context: ErrorContext::new().with_note_id(&permalink),
        })?;
        Ok(permalink)
    }

    async fn read_note(&self, identifier: &str, project: Option<&str>) -> Result<Note> {
        let path = self.path_for(identifier, project);
        self.read_file(&path, identifier)
    }

    async fn list_directory(
        &self,
        project: Option<&str>,
        depth: u32,
        glob: Option<&str>,
    ) -> Result<Vec<DirEntry>> {
        let root = self.project_dir(project);
        let mut entries = Vec::new();
        walk(&root, &root, depth, glob, &mut entries)?;
        Ok(entries)
    }

    async fn search(
        &self,
        query: &str,
        folders: Option<&[String]>,
        full_content: bool,
        project: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let root = self.project_dir(project);
        let mut hits = Vec::new();
        let mut files = Vec::new();
        collect_md_files(&root, &mut files);

        let needle = query.to_lowercase();
        for path in files {
            let relative = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            if let Some(fs) = folders {
                if !fs.iter().any(|f| relative.starts_with(f.as_str())) {
                    continue;
                }
            }
            let Ok(raw) = std::fs::read_to_string(&path) else {
                continue;
            };
            let (_, body) = split_frontmatter(&raw);
            if query.is_empty() || body.to_lowercase().contains(&needle) {
                let snippet = snippet_around(body, &needle, 240);
                hits.push(SearchHit {
                    permalink: relative.clone(),
                    title: relative.rsplit('/').next().unwrap_or(&relative).to_string(),
                    snippet,
                    full_content: if full_content { Some(body.to_string()) } else { None },
                });
            }
        }
        Ok(hits)
    }

    async fn delete_note(&self, identifier: &str, project: Option<&str>) -> Result<()> {
        let path = self.path_for(identifier, project);
        std::fs::remove_file(&path).map_err(|_| BrainError::NotFound {
            what: format!("note {identifier}"),
            context: ErrorContext::new().with_note_id(identifier),
        })
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    depth: u32,
    glob: Option<&str>,
    out: &mut Vec<DirEntry>,
) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| BrainError::Config {
        message: format!("failed to list directory: {e}"),
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
        let updated_at = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);
        if path.is_dir() {
            out.push(DirEntry {
                kind: DirEntryKind::Dir,
                permalink: relative,
                title: name,
                updated_at,
            });
            if depth > 0 {
                walk(root, &path, depth - 1, glob, out)?;
            }
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            if let Some(pattern) = glob {
                if !name.contains(pattern.trim_matches('*')) {
                    continue;
                }
            }
            out.push(DirEntry {
                kind: DirEntryKind::File,
                permalink: relative.trim_end_matches(".md").to_string(),
                title: name.trim_end_matches(".md").to_string(),
                updated_at,
            });
        }
    }
    Ok(())
}

fn collect_md_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        if path.is_dir() {
            collect_md_files(&path, out);
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            out.push(path);
        }
    }
}

fn snippet_around(body: &str, needle: &str, max_len: usize) -> String {
    if needle.is_empty() {
        return body.chars().take(max_len).collect();
    }
    let lower = body.to_lowercase();
    let Some(pos) = lower.find(needle) else {
        return body.chars().take(max_len).collect();
    };
    let half = max_len / 2;
    let start = pos.saturating_sub(half);
    let end = (pos + needle.len() + half).min(body.len());
    let start = (0..=start).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
    let end = (end..=body.len()).find(|&i| body.is_char_boundary(i)).unwrap_or(body.len());
    body[start..end].to_string()
}

fn split_frontmatter(raw: &str) -> (BTreeMap<String, serde_json::Value>, &str) {
    let mut map = BTreeMap::new();
    if let Some(rest) = raw.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---") {
            let fm_block = &rest[..end];
            let body_start = end + 4;
            let body = rest[body_start..].trim_start_matches('\n');
            if let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(fm_block) {
                if let serde_yaml::Value::Mapping(mapping) = value {
                    for (k, v) in mapping {
                        if let Some(key) = k.as_str() {
                            if let Ok(json) = serde_json::to_value(&v) {
                                map.insert(key.to_string(), json);
                            }
                        }
                    }
                }
            }
            return (map, body);
        }
    }
    (map, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_body() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNoteStore::new(dir.path(), "default");
        let permalink = store.write_note("notes", "Hello World", "some body", None).await.unwrap();
        assert_eq!(permalink, "notes/hello-world");

        let note = store.read_note(&permalink, None).await.unwrap();
        assert_eq!(note.body, "some body");
        assert_eq!(note.title, "Hello World");
    }

    #[tokio::test]
    async fn body_supplied_frontmatter_is_not_double_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNoteStore::new(dir.path(), "default");
        let body = "---\ntitle: \"Use Postgres\"\ntype: decision\ntags: [decision]\npermalink: decisions/use-postgres\n---\n\n# Use Postgres\n\nbody text\n";
        let permalink = store.write_note("decisions", "Use Postgres", body, None).await.unwrap();

        let note = store.read_note(&permalink, None).await.unwrap();
        assert_eq!(note.frontmatter.get("type").and_then(|v| v.as_str()), Some("decision"));
        assert!(!note.body.starts_with("---"));
        assert!(note.body.contains("body text"));
    }

    #[tokio::test]
    async fn search_finds_substring_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNoteStore::new(dir.path(), "default");
        store.write_note("notes", "Fox", "the quick brown fox", None).await.unwrap();
        store.write_note("notes", "Dog", "a lazy dog slept", None).await.unwrap();

        let hits = store.search("fox", None, false, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].permalink, "notes/fox");
    }

    #[tokio::test]
    async fn delete_removes_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNoteStore::new(dir.path(), "default");
        let permalink = store.write_note("notes", "Temp", "body", None).await.unwrap();
        store.delete_note(&permalink, None).await.unwrap();
        assert!(store.read_note(&permalink, None).await.is_err());
    }
}
