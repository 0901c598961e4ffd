use crate::classify::EntityType;
use crate::sectioning::Section;
use brain_core::session::{Relation, RelationType};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const MIN_RELATIONS: usize = 2;
const MAX_RELATIONS: usize = 5;

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap());
static ENTITY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(ADR|REQ|DESIGN|TASK)-\d+\b").unwrap());

/// Front matter keys that name relations directly, mapped to the
/// relation type they imply.
const FRONTMATTER_RELATION_FIELDS: &[(&str, RelationType)] = &[
    ("implements", RelationType::Implements),
    ("depends_on", RelationType::DependsOn),
    ("extends", RelationType::Extends),
    ("part_of", RelationType::PartOf),
    ("related", RelationType::RelatesTo),
];

/// Section headings that imply a hierarchical relation to whatever they name.
const HIERARCHICAL_SECTIONS: &[(&str, RelationType)] = &[
    ("Depends On", RelationType::DependsOn),
    ("Implements", RelationType::Implements),
    ("Part Of", RelationType::PartOf),
    ("Supersedes", RelationType::Supersedes),
    ("See Also", RelationType::RelatesTo),
];

fn push_unique(relations: &mut Vec<Relation>, seen: &mut std::collections::HashSet<String>, relation: Relation) {
    if relations.len() >= MAX_RELATIONS {
        return;
    }
    if seen.insert(relation.target.clone()) {
        relations.push(relation);
    }
}

fn wikilinks(body: &str) -> Vec<String> {
    WIKILINK_RE.captures_iter(body).map(|c| c[1].trim().to_string()).collect()
}

fn entity_id_sweep(body: &str) -> Vec<String> {
    ENTITY_ID_RE.find_iter(body).map(|m| m.as_str().to_string()).collect()
}

fn frontmatter_targets(frontmatter: &BTreeMap<String, Value>, field: &str) -> Vec<String> {
    match frontmatter.get(field) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn section_targets(section_body: &str) -> Vec<String> {
    let mut targets = wikilinks(section_body);
    if targets.is_empty() {
        targets.extend(
            section_body
                .lines()
                .filter_map(|l| l.trim().strip_prefix("- ").or_else(|| l.trim().strip_prefix("* ")))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }
    targets
}

/// Deterministic filler used when extraction yields fewer than the
/// minimum relation count: ties the note back to its own entity type,
/// then to an "imports" umbrella relation, in that fixed order.
fn filler_relation(index: usize, entity_type: EntityType) -> Relation {
    let fillers = [
        Relation {
            relation_type: RelationType::PartOf,
            target: format!("{}s", entity_type.as_str()),
            context: Some("grouped by entity type on import".to_string()),
        },
        Relation {
            relation_type: RelationType::RelatesTo,
            target: "imports/overview".to_string(),
            context: Some("derived during corpus import".to_string()),
        },
    ];
    fillers[index % fillers.len()].clone()
}

/// Extracts 2..=5 relations: wikilinks, front matter relation fields, an
/// entity-ID regex sweep over the body, and hierarchical section
/// references, deduplicated by target and padded with deterministic
/// filler when short.
pub fn extract_relations(
    entity_type: EntityType,
    body: &str,
    frontmatter: &BTreeMap<String, Value>,
    sections: &[Section],
) -> Vec<Relation> {
    let mut relations = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (field, relation_type) in FRONTMATTER_RELATION_FIELDS {
        for target in frontmatter_targets(frontmatter, field) {
            push_unique(&mut relations, &mut seen, Relation { relation_type: *relation_type, target, context: None });
        }
    }

    for (heading, relation_type) in HIERARCHICAL_SECTIONS {
        let Some(section) = sections.iter().find(|s| s.heading.eq_ignore_ascii_case(heading)) else {
            continue;
        };
        for target in section_targets(&section.body) {
            push_unique(
                &mut relations,
                &mut seen,
                Relation { relation_type: *relation_type, target, context: Some(format!("from ## {heading}")) },
            );
        }
    }

    for target in wikilinks(body) {
        push_unique(&mut relations, &mut seen, Relation { relation_type: RelationType::RelatesTo, target, context: None });
    }

    for target in entity_id_sweep(body) {
        push_unique(
            &mut relations,
            &mut seen,
            Relation { relation_type: RelationType::RelatesTo, target, context: Some("entity-id sweep".to_string()) },
        );
    }

    let mut filler_index = 0;
    while relations.len() < MIN_RELATIONS {
        let candidate = filler_relation(filler_index, entity_type);
        filler_index += 1;
        if seen.contains(&candidate.target) {
            continue;
        }
        seen.insert(candidate.target.clone());
        relations.push(candidate);
    }

    relations.truncate(MAX_RELATIONS);
    relations
}
