use crate::classify::EntityType;
use crate::sectioning::{find_section, first_paragraph, Section};
use brain_core::session::{Observation, ObservationCategory};

const MIN_OBSERVATIONS: usize = 3;
const MAX_OBSERVATIONS: usize = 10;

/// Section headings checked (in order) for each entity type, paired with
/// the category assigned to the bullet items found there.
fn strategy_for(entity_type: EntityType) -> &'static [(&'static str, ObservationCategory)] {
    match entity_type {
        EntityType::Decision => &[
            ("Decision", ObservationCategory::Decision),
            ("Context", ObservationCategory::Fact),
            ("Consequences", ObservationCategory::Outcome),
            ("Rationale", ObservationCategory::Insight),
        ],
        EntityType::Requirement => &[
            ("Requirement", ObservationCategory::Requirement),
            ("Acceptance Criteria", ObservationCategory::Requirement),
            ("Background", ObservationCategory::Fact),
        ],
        EntityType::Design => &[
            ("Approach", ObservationCategory::Technique),
            ("Design", ObservationCategory::Technique),
            ("Tradeoffs", ObservationCategory::Insight),
        ],
        EntityType::Task => &[
            ("Problem", ObservationCategory::Problem),
            ("Solution", ObservationCategory::Solution),
            ("Notes", ObservationCategory::Fact),
        ],
        EntityType::Session => &[
            ("Summary", ObservationCategory::Fact),
            ("Outcome", ObservationCategory::Outcome),
            ("Problems", ObservationCategory::Problem),
        ],
        EntityType::Note => &[
            ("Summary", ObservationCategory::Fact),
            ("Notes", ObservationCategory::Fact),
        ],
    }
}

/// Splits a section body into bullet-ish lines: `- item`, `* item`, or
/// (falling back) non-empty paragraphs, each trimmed of list markers.
fn bullet_lines(body: &str) -> Vec<String> {
    let lines: Vec<String> = body
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let stripped = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* "));
            stripped.map(str::to_string).filter(|s| !s.is_empty())
        })
        .collect();
    if !lines.is_empty() {
        return lines;
    }
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deterministic filler used when a note's sections don't yield the
/// minimum observation count: title, type, first paragraph, source path,
/// in that fixed order, cycling if still short.
fn filler_observation(index: usize, title: &str, entity_type: EntityType, body: &str, source_path: &str) -> Observation {
    let fillers = [
        format!("Imported from \"{title}\""),
        format!("Classified as {}", entity_type.as_str()),
        first_paragraph(body).unwrap_or_else(|| "No body content available.".to_string()),
        format!("Source: {source_path}"),
    ];
    Observation {
        category: ObservationCategory::Fact,
        content: fillers[index % fillers.len()].clone(),
        tags: vec!["imported".to_string()],
    }
}

/// Extracts 3..=10 observations from `sections` per the type-specific
/// strategy, padding shortfalls with deterministic filler content.
pub fn extract_observations(
    entity_type: EntityType,
    title: &str,
    body: &str,
    sections: &[Section],
    source_path: &str,
) -> Vec<Observation> {
    let mut observations = Vec::new();

    for (heading, category) in strategy_for(entity_type) {
        let Some(section) = find_section(sections, heading) else {
            continue;
        };
        for line in bullet_lines(&section.body) {
            if observations.len() >= MAX_OBSERVATIONS {
                break;
            }
            observations.push(Observation {
                category: *category,
                content: line,
                tags: vec![entity_type.as_str().to_string()],
            });
        }
    }

    let mut filler_index = 0;
    while observations.len() < MIN_OBSERVATIONS {
        observations.push(filler_observation(filler_index, title, entity_type, body, source_path));
        filler_index += 1;
    }

    observations.truncate(MAX_OBSERVATIONS);
    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sectioning::sectionize;

    #[test]
    fn extracts_from_matching_section() {
        let body = "# ADR\n\n## Decision\n\n- use postgres\n- run migrations nightly\n";
        let sections = sectionize(body);
        let obs = extract_observations(EntityType::Decision, "ADR", body, &sections, "adr.md");
        assert!(obs.iter().any(|o| o.content == "use postgres"));
        assert!(obs.len() >= 3);
    }

    #[test]
    fn pads_with_filler_when_short() {
        let body = "# Note\n\nJust a sentence.\n";
        let sections = sectionize(body);
        let obs = extract_observations(EntityType::Note, "Note", body, &sections, "note.md");
        assert_eq!(obs.len(), 3);
    }

    #[test]
    fn never_exceeds_maximum() {
        let mut body = "# Decision\n\n## Decision\n\n".to_string();
        for i in 0..20 {
            body.push_str(&format!("- point {i}\n"));
        }
        let sections = sectionize(&body);
        let obs = extract_observations(EntityType::Decision, "Decision", &body, &sections, "d.md");
        assert_eq!(obs.len(), MAX_OBSERVATIONS);
    }

    #[test]
    fn deterministic_across_runs() {
        let body = "# Note\n\nsingle paragraph\n";
        let sections = sectionize(body);
        let a = extract_observations(EntityType::Note, "Note", body, &sections, "n.md");
        let b = extract_observations(EntityType::Note, "Note", body, &sections, "n.md");
        assert_eq!(a, b);
    }
}
