use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Decision,
    Requirement,
    Design,
    Task,
    Session,
    Note,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Decision => "decision",
            EntityType::Requirement => "requirement",
            EntityType::Design => "design",
            EntityType::Task => "task",
            EntityType::Session => "session",
            EntityType::Note => "note",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "decision" => Some(EntityType::Decision),
            "requirement" => Some(EntityType::Requirement),
            "design" => Some(EntityType::Design),
            "task" => Some(EntityType::Task),
            "session" => Some(EntityType::Session),
            "note" => Some(EntityType::Note),
            _ => None,
        }
    }
}

/// Directory names mapped to the type they imply, checked when front
/// matter is silent or invalid.
const DIRECTORY_PREFIX_TABLE: &[(&str, EntityType)] = &[
    ("decisions", EntityType::Decision),
    ("decision", EntityType::Decision),
    ("requirements", EntityType::Requirement),
    ("requirement", EntityType::Requirement),
    ("designs", EntityType::Design),
    ("design", EntityType::Design),
    ("tasks", EntityType::Task),
    ("task", EntityType::Task),
    ("sessions", EntityType::Session),
    ("session", EntityType::Session),
];

static ADR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)ADR-\d+").unwrap());
static REQ_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)REQ-\d+").unwrap());
static DESIGN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)DESIGN-\d+").unwrap());
static TASK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)TASK-\d+").unwrap());
static SESSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}-session").unwrap());

/// Classifies an entity's type: front matter `type` first, then directory
/// prefix, then filename regex, falling back to `note`.
pub fn classify(frontmatter: &BTreeMap<String, Value>, relative_folder: &str, filename: &str) -> EntityType {
    if let Some(Value::String(t)) = frontmatter.get("type") {
        if let Some(ty) = EntityType::from_str(t) {
            return ty;
        }
    }

    let top_folder = relative_folder.split('/').next().unwrap_or("");
    if let Some((_, ty)) = DIRECTORY_PREFIX_TABLE.iter().find(|(name, _)| *name == top_folder) {
        return *ty;
    }

    if ADR_RE.is_match(filename) {
        return EntityType::Decision;
    }
    if REQ_RE.is_match(filename) {
        return EntityType::Requirement;
    }
    if DESIGN_RE.is_match(filename) {
        return EntityType::Design;
    }
    if TASK_RE.is_match(filename) {
        return EntityType::Task;
    }
    if SESSION_RE.is_match(filename) {
        return EntityType::Session;
    }

    EntityType::Note
}
