use brain_core::session::{Observation, Relation};
use crate::classify::EntityType;

/// Turns a title into a lowercase, hyphen-separated slug, matching
/// `FileNoteStore`'s own slugification so permalinks agree.
pub fn slugify(title: &str) -> String {
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

fn yaml_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    format!("[{}]", items.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(", "))
}

fn render_observations(observations: &[Observation]) -> String {
    observations
        .iter()
        .map(|o| {
            let category = serde_json::to_value(o.category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            format!("- **{category}**: {}", o.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_relations(relations: &[Relation]) -> String {
    relations
        .iter()
        .map(|r| {
            let relation_type = serde_json::to_value(r.relation_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            match &r.context {
                Some(ctx) => format!("- {relation_type} [[{}]] ({ctx})", r.target),
                None => format!("- {relation_type} [[{}]]", r.target),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a target-schema-conformant note body: canonical front matter
/// (`title`, `type`, `tags`, `permalink`), an H1, then `## Context`,
/// `## Observations`, `## Relations`. Deterministic given the same inputs
/// so re-running `import` on unchanged source is byte-identical.
pub fn render_note(
    title: &str,
    entity_type: EntityType,
    tags: &[String],
    permalink: &str,
    context: &str,
    observations: &[Observation],
    relations: &[Relation],
) -> String {
    format!(
        "---\ntitle: \"{title}\"\ntype: {}\ntags: {}\npermalink: {permalink}\n---\n\n# {title}\n\n## Context\n\n{context}\n\n## Observations\n\n{}\n\n## Relations\n\n{}\n",
        entity_type.as_str(),
        yaml_list(tags),
        render_observations(observations),
        render_relations(relations),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::session::{ObservationCategory, RelationType};

    #[test]
    fn slugify_collapses_non_alphanumerics() {
        assert_eq!(slugify("ADR 001: Use Postgres!"), "adr-001-use-postgres");
    }

    #[test]
    fn render_is_deterministic() {
        let obs = vec![Observation { category: ObservationCategory::Fact, content: "a fact".to_string(), tags: vec![] }];
        let rel = vec![Relation { relation_type: RelationType::RelatesTo, target: "x".to_string(), context: None }];
        let a = render_note("Title", EntityType::Note, &["note".to_string()], "notes/title", "ctx", &obs, &rel);
        let b = render_note("Title", EntityType::Note, &["note".to_string()], "notes/title", "ctx", &obs, &rel);
        assert_eq!(a, b);
        assert!(a.contains("## Observations"));
        assert!(a.contains("## Relations"));
    }
}
