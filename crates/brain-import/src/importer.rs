use crate::classify::{classify, EntityType};
use crate::frontmatter::split_frontmatter;
use crate::observations::extract_observations;
use crate::relations::extract_relations;
use crate::render::{render_note, slugify};
use crate::sectioning::{find_section, sectionize};
use brain_core::error::Result;
use brain_core::note::{DirEntryKind, Note, NoteStore};
use brain_pipeline::EmbeddingPipeline;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const MIN_OBSERVATIONS_FOR_CONFORMANCE: usize = 3;
const MIN_RELATIONS_FOR_CONFORMANCE: usize = 2;

/// Entity types that own a subtree (`<type>/<slug>/overview.md`) rather
/// than a single flat file, per the conformance rules in the design docs.
const SCOPED_FOLDERS: &[&str] = &["decisions", "requirements", "designs", "tasks", "sessions"];

/// Legacy flat-file prefixes a prior schema used, now redundant with the
/// folder-derived entity type.
const LEGACY_PREFIXES: &[&str] =
    &["spec-", "decision-", "requirement-", "design-", "task-", "session-", "adr-", "req-"];

/// Outcome of a single `write_note` during [`AnalyzeImporter::import`].
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub written: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConformIssueKind {
    MissingFrontmatter,
    BadPrefix,
    RootLevelScoped,
    RedundantChildPrefix,
    NotOverview,
    MissingObservations,
    MissingRelations,
}

impl ConformIssueKind {
    pub fn auto_fixable(self) -> bool {
        !matches!(self, Self::MissingObservations | Self::MissingRelations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    /// Strip a redundant prefix from the title/filename, same folder.
    Rename,
    /// Move the note under a different folder (nesting or de-nesting).
    Restructure,
    /// Rewrite the body with canonical front matter prepended.
    AddFrontmatter,
}

#[derive(Debug, Clone)]
pub struct ConformFix {
    pub action: FixAction,
    pub target_permalink: String,
}

#[derive(Debug, Clone)]
pub struct ConformIssue {
    pub permalink: String,
    pub kind: ConformIssueKind,
    pub fix: Option<ConformFix>,
}

/// Result of a conformance pass: every issue found, any rename/move
/// conflicts (two sources proposing the same target), and (outside
/// dry-run) the fixes actually applied.
#[derive(Debug, Clone, Default)]
pub struct ConformReport {
    pub issues: Vec<ConformIssue>,
    pub conflicts: Vec<(String, Vec<String>)>,
    pub applied: Vec<(String, String)>,
}

impl ConformReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Groups fixable issues by action, for a grouped dry-run preview.
    pub fn grouped_preview(&self) -> HashMap<&'static str, Vec<&ConformIssue>> {
        let mut groups: HashMap<&'static str, Vec<&ConformIssue>> = HashMap::new();
        for issue in &self.issues {
            let Some(fix) = &issue.fix else { continue };
            let label = match fix.action {
                FixAction::Rename => "rename",
                FixAction::Restructure => "restructure",
                FixAction::AddFrontmatter => "add-frontmatter",
            };
            groups.entry(label).or_default().push(issue);
        }
        groups
    }
}

/// Parses foreign markdown corpora into target-schema notes, and audits
/// notes already in the target store against that schema.
pub struct AnalyzeImporter {
    target: Arc<dyn NoteStore>,
    pipeline: Option<Arc<EmbeddingPipeline>>,
}

impl AnalyzeImporter {
    pub fn new(target: Arc<dyn NoteStore>, pipeline: Option<Arc<EmbeddingPipeline>>) -> Self {
        Self { target, pipeline }
    }

    /// Walks `source_root`, transforming every `.md` file into a
    /// target-schema-conformant note. Re-running on an unchanged source
    /// produces byte-identical notes (the render path is pure and
    /// deterministic given the same front matter/body/source path).
    pub async fn import(&self, source_root: &Path, project: Option<&str>) -> Result<ImportReport> {
        let mut files = Vec::new();
        collect_markdown_files(source_root, &mut files);

        let mut report = ImportReport { written: Vec::new(), failed: Vec::new() };
        for path in files {
            let source_path = path.to_string_lossy().replace('\\', "/");
            match self.import_one(source_root, &path, &source_path, project).await {
                Ok(permalink) => report.written.push(permalink),
                Err(e) => {
                    warn!(source = %source_path, error = %e, "failed to import note");
                    report.failed.push((source_path, e.to_string()));
                }
            }
        }
        info!(written = report.written.len(), failed = report.failed.len(), "import complete");
        Ok(report)
    }

    async fn import_one(
        &self,
        source_root: &Path,
        path: &Path,
        source_path: &str,
        project: Option<&str>,
    ) -> Result<String> {
        let raw = std::fs::read_to_string(path).map_err(|e| brain_core::error::BrainError::NotFound {
            what: format!("source file {source_path}: {e}"),
            context: brain_core::error::ErrorContext::new(),
        })?;
        let (frontmatter, body) = split_frontmatter(&raw);

        let relative_folder = path
            .parent()
            .and_then(|p| p.strip_prefix(source_root).ok())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let filename = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();

        let entity_type = classify(&frontmatter, &relative_folder, &filename);
        let title = frontmatter
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| filename.replace(['-', '_'], " "));

        let sections = sectionize(body);
        let context = find_section(&sections, "Context")
            .map(|s| s.body.clone())
            .or_else(|| crate::sectioning::first_paragraph(body))
            .unwrap_or_default();

        let observations = extract_observations(entity_type, &title, body, &sections, source_path);
        let relations = extract_relations(entity_type, body, &frontmatter, &sections);

        let folder = format!("{}s", entity_type.as_str());
        let slug = slugify(&title);
        let permalink = format!("{folder}/{slug}");

        let mut tags: Vec<String> = frontmatter
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if !tags.iter().any(|t| t == entity_type.as_str()) {
            tags.push(entity_type.as_str().to_string());
        }

        let rendered = render_note(&title, entity_type, &tags, &permalink, &context, &observations, &relations);
        let permalink = self.target.write_note(&folder, &title, &rendered, project).await?;

        if let Some(pipeline) = &self.pipeline {
            if let Err(e) = pipeline.process_note(&permalink).await {
                warn!(permalink, error = %e, "embedding pass failed for imported note");
            }
        }

        Ok(permalink)
    }

    /// Audits every note under `project` against the target schema.
    /// `preview` only affects whether [`ConformReport::applied`] is
    /// populated; the report's `issues` are always computed.
    pub async fn conform(&self, project: Option<&str>, preview: bool) -> Result<ConformReport> {
        let entries = self.target.list_directory(project, 16, None).await?;
        let mut report = ConformReport::default();
        let mut proposed_targets: HashMap<String, Vec<String>> = HashMap::new();

        for entry in entries {
            if entry.kind == DirEntryKind::Dir {
                continue;
            }
            let note = match self.target.read_note(&entry.permalink, project).await {
                Ok(n) => n,
                Err(_) => continue,
            };

            for issue in detect_issues(&note) {
                if let Some(fix) = &issue.fix {
                    proposed_targets.entry(fix.target_permalink.clone()).or_default().push(issue.permalink.clone());
                }
                report.issues.push(issue);
            }
        }

        for (target, sources) in proposed_targets {
            if sources.len() > 1 {
                report.conflicts.push((target, sources));
            }
        }

        if !preview {
            let conflicted: std::collections::HashSet<&str> =
                report.conflicts.iter().flat_map(|(_, sources)| sources.iter().map(String::as_str)).collect();
            for issue in report.issues.clone() {
                if conflicted.contains(issue.permalink.as_str()) {
                    continue;
                }
                if let Some(fix) = &issue.fix {
                    if self.apply_fix(&issue.permalink, fix, project).await.is_ok() {
                        report.applied.push((issue.permalink.clone(), fix.target_permalink.clone()));
                    }
                }
            }
        }

        Ok(report)
    }

    async fn apply_fix(&self, permalink: &str, fix: &ConformFix, project: Option<&str>) -> Result<()> {
        let note = self.target.read_note(permalink, project).await?;
        match fix.action {
            FixAction::AddFrontmatter => {
                let body = canonical_frontmatter_body(&note);
                self.target.write_note(&note.folder, &note.title, &body, project).await?;
            }
            FixAction::Rename | FixAction::Restructure => {
                let (folder, title) = split_target(&fix.target_permalink);
                self.target.write_note(&folder, &title, &note.body, project).await?;
                if fix.target_permalink != permalink {
                    self.target.delete_note(permalink, project).await?;
                }
            }
        }
        Ok(())
    }
}

fn split_target(permalink: &str) -> (String, String) {
    match permalink.rsplit_once('/') {
        Some((folder, file)) => (folder.to_string(), file.to_string()),
        None => (String::new(), permalink.to_string()),
    }
}

fn canonical_frontmatter_body(note: &Note) -> String {
    format!(
        "---\ntitle: \"{}\"\ntype: note\ntags: []\npermalink: {}\n---\n\n{}",
        note.title, note.permalink, note.body
    )
}

/// Detects every issue a single note has against the target schema.
/// At most one structural (rename/restructure) issue fires per note,
/// since applying more than one at once would require a compound fix;
/// content-level issues (missing observations/relations) can coexist
/// with a structural one or stand alone.
fn detect_issues(note: &Note) -> Vec<ConformIssue> {
    let mut issues = Vec::new();

    // `note.frontmatter` reflects whatever the NoteStore itself recovered
    // from its own wrapper (e.g. just `title`), not the canonical
    // `title`/`type`/`tags`/`permalink` block this module renders. Re-derive
    // it from the body so conformance checking doesn't depend on a
    // particular store's frontmatter fidelity.
    let (body_frontmatter, body) = split_frontmatter(&note.body);
    if !has_canonical_frontmatter(&body_frontmatter) {
        issues.push(ConformIssue {
            permalink: note.permalink.clone(),
            kind: ConformIssueKind::MissingFrontmatter,
            fix: Some(ConformFix {
                action: FixAction::AddFrontmatter,
                target_permalink: note.permalink.clone(),
            }),
        });
    }

    if let Some(structural) = detect_structural_issue(note) {
        issues.push(structural);
    }

    let sections = sectionize(body);
    let observation_count = find_section(&sections, "Observations").map(|s| bullet_count(&s.body)).unwrap_or(0);
    if observation_count < MIN_OBSERVATIONS_FOR_CONFORMANCE {
        issues.push(ConformIssue {
            permalink: note.permalink.clone(),
            kind: ConformIssueKind::MissingObservations,
            fix: None,
        });
    }
    let relation_count = find_section(&sections, "Relations").map(|s| bullet_count(&s.body)).unwrap_or(0);
    if relation_count < MIN_RELATIONS_FOR_CONFORMANCE {
        issues.push(ConformIssue {
            permalink: note.permalink.clone(),
            kind: ConformIssueKind::MissingRelations,
            fix: None,
        });
    }

    issues
}

fn bullet_count(body: &str) -> usize {
    body.lines().filter(|l| { let t = l.trim(); t.starts_with("- ") || t.starts_with("* ") }).count()
}

fn has_canonical_frontmatter(frontmatter: &BTreeMap<String, Value>) -> bool {
    ["title", "type", "tags", "permalink"].iter().all(|k| frontmatter.contains_key(*k))
}

/// Checks, in priority order, for a legacy flat-file prefix, a scoped type
/// sitting at its folder root, a child file redundantly repeating its
/// parent folder's name, or a scoped main file that isn't `overview`.
fn detect_structural_issue(note: &Note) -> Option<ConformIssue> {
    let segments: Vec<&str> = note.permalink.split('/').collect();
    let filename = *segments.last()?;

    if let Some(prefix) = LEGACY_PREFIXES.iter().find(|p| filename.starts_with(**p)) {
        let stripped = &filename[prefix.len()..];
        if !stripped.is_empty() {
            let target = with_last_segment(&segments, stripped);
            return Some(ConformIssue {
                permalink: note.permalink.clone(),
                kind: ConformIssueKind::BadPrefix,
                fix: Some(ConformFix { action: FixAction::Rename, target_permalink: target }),
            });
        }
    }

    if segments.len() == 2 {
        let folder = segments[0];
        if SCOPED_FOLDERS.contains(&folder) {
            let target = format!("{folder}/{filename}/overview");
            return Some(ConformIssue {
                permalink: note.permalink.clone(),
                kind: ConformIssueKind::RootLevelScoped,
                fix: Some(ConformFix { action: FixAction::Restructure, target_permalink: target }),
            });
        }
        if let Some(stripped) = filename.strip_prefix(&format!("{folder}-")) {
            if !stripped.is_empty() {
                let target = format!("{folder}/{stripped}");
                return Some(ConformIssue {
                    permalink: note.permalink.clone(),
                    kind: ConformIssueKind::RedundantChildPrefix,
                    fix: Some(ConformFix { action: FixAction::Rename, target_permalink: target }),
                });
            }
        }
    }

    if segments.len() >= 3 {
        let type_folder = segments[0];
        if SCOPED_FOLDERS.contains(&type_folder) && filename != "overview" {
            let target = with_last_segment(&segments, "overview");
            return Some(ConformIssue {
                permalink: note.permalink.clone(),
                kind: ConformIssueKind::NotOverview,
                fix: Some(ConformFix { action: FixAction::Rename, target_permalink: target }),
            });
        }
    }

    None
}

fn with_last_segment(segments: &[&str], new_last: &str) -> String {
    let mut parts: Vec<&str> = segments[..segments.len() - 1].to_vec();
    parts.push(new_last);
    parts.join("/")
}

/// Enumerates `.md` files under `dir`, excluding hidden directories and
/// `node_modules`, matching the exclusion rule the pipeline's catch-up
/// scan and `FileNoteStore` both use.
fn collect_markdown_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        if path.is_dir() {
            collect_markdown_files(&path, out);
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            out.push(path);
        }
    }
}
