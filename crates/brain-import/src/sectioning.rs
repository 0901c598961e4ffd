/// A heading-delimited slice of a markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub level: u8,
    pub heading: String,
    pub body: String,
}

/// Splits `body` into sections at each ATX heading (`#`..`######`). Text
/// before the first heading is returned as a section with `level = 0` and
/// an empty heading.
pub fn sectionize(body: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_level = 0u8;
    let mut current_heading = String::new();
    let mut current_body = String::new();

    for line in body.lines() {
        if let Some((level, heading)) = parse_heading(line) {
            sections.push(Section {
                level: current_level,
                heading: std::mem::take(&mut current_heading),
                body: current_body.trim_matches('\n').to_string(),
            });
            current_level = level;
            current_heading = heading;
            current_body.clear();
        } else {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    sections.push(Section {
        level: current_level,
        heading: current_heading,
        body: current_body.trim_matches('\n').to_string(),
    });

    sections.into_iter().filter(|s| !(s.level == 0 && s.heading.is_empty() && s.body.is_empty())).collect()
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].trim();
    if trimmed.as_bytes().get(hashes).map(|b| *b == b' ').unwrap_or(false) || rest.is_empty() {
        Some((hashes as u8, rest.to_string()))
    } else {
        None
    }
}

/// Finds the first section whose heading matches `name` case-insensitively.
pub fn find_section<'a>(sections: &'a [Section], name: &str) -> Option<&'a Section> {
    sections.iter().find(|s| s.heading.eq_ignore_ascii_case(name))
}

/// The first non-empty paragraph in `body` (used as deterministic filler
/// content and for snippet-style previews).
pub fn first_paragraph(body: &str) -> Option<String> {
    body.split("\n\n").map(str::trim).find(|p| !p.is_empty()).map(str::to_string)
}
