use serde_json::Value;
use std::collections::BTreeMap;

/// Splits `raw` into its `---`-fenced front matter (if any) and the
/// remaining body.
pub fn split_frontmatter(raw: &str) -> (BTreeMap<String, Value>, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    if let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) {
        if let Some(end) = rest.find("\n---") {
            let block = &rest[..end];
            let after_fence = &rest[end + 4..];
            let body = after_fence.strip_prefix('\n').unwrap_or(after_fence).trim_start_matches('\n');
            return (parse_block(block), body);
        }
    }
    (BTreeMap::new(), raw)
}

/// A permissive mini-YAML parser covering the shapes real note corpora use:
/// quoted/boolean/number/null scalars, inline `[a, b]` arrays, block `- item`
/// arrays, and one level of nesting under a key.
fn parse_block(block: &str) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    let mut last_key: Option<String> = None;
    let mut pending_list: Vec<Value> = Vec::new();

    for line in block.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let content = trimmed.trim_start();

        if let Some(item) = content.strip_prefix("- ") {
            if indent > 0 {
                pending_list.push(parse_scalar(item.trim()));
                continue;
            }
        }

        if let Some(key) = last_key.take() {
            if !pending_list.is_empty() {
                map.insert(key, Value::Array(std::mem::take(&mut pending_list)));
            }
        }

        if let Some((key, value)) = content.split_once(':') {
            let key = key.trim().trim_matches('"').trim_matches('\'').to_string();
            let value = value.trim();
            if value.is_empty() {
                last_key = Some(key);
            } else {
                map.insert(key, parse_value(value));
            }
        }
    }

    if let Some(key) = last_key {
        if !pending_list.is_empty() {
            map.insert(key, Value::Array(pending_list));
        }
    }

    map
}

fn parse_value(value: &str) -> Value {
    if value.starts_with('[') && value.ends_with(']') {
        let inner = &value[1..value.len() - 1];
        if inner.trim().is_empty() {
            return Value::Array(Vec::new());
        }
        return Value::Array(inner.split(',').map(|s| parse_scalar(s.trim())).collect());
    }
    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Value {
    let value = value.trim();
    if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
        || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
    {
        return Value::String(value[1..value.len() - 1].to_string());
    }
    match value {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "~" | "" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = value.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = value.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_frontmatter_returns_full_body() {
        let (fm, body) = split_frontmatter("# Title\n\nbody text");
        assert!(fm.is_empty());
        assert_eq!(body, "# Title\n\nbody text");
    }

    #[test]
    fn parses_scalars_inline_array_and_block_list() {
        let raw = "---\ntitle: \"Hello World\"\ntype: decision\ncount: 3\nactive: true\ntags: [a, b, c]\nrelated:\n  - x\n  - y\n---\n\nbody\n";
        let (fm, body) = split_frontmatter(raw);
        assert_eq!(fm.get("title"), Some(&Value::String("Hello World".to_string())));
        assert_eq!(fm.get("type"), Some(&Value::String("decision".to_string())));
        assert_eq!(fm.get("count"), Some(&Value::Number(3.into())));
        assert_eq!(fm.get("active"), Some(&Value::Bool(true)));
        assert_eq!(
            fm.get("tags"),
            Some(&Value::Array(vec![
                Value::String("a".to_string()),
                Value::String("b".to_string()),
                Value::String("c".to_string())
            ]))
        );
        assert_eq!(
            fm.get("related"),
            Some(&Value::Array(vec![Value::String("x".to_string()), Value::String("y".to_string())]))
        );
        assert_eq!(body, "body\n");
    }

    #[test]
    fn missing_fence_terminator_is_treated_as_body() {
        let (fm, body) = split_frontmatter("---\ntitle: no closing fence\n");
        assert!(fm.is_empty());
        assert!(body.starts_with("---"));
    }
}
