//! SLX catalog filters

use rw_core::domain::slx::{Slx, Tag};
use serde_json::Value;

/// SLXs carrying at least one of `tags`
///
/// Tag names and values compare case-insensitively.
pub fn slxs_with_tags<'a>(slxs: &'a [Slx], tags: &[Tag]) -> Vec<&'a Slx> {
    slxs.iter()
        .filter(|slx| slx.spec.tags.iter().any(|t| tags.iter().any(|want| t.matches(want))))
        .collect()
}

/// SLXs where any entity appears as a substring of the name, alias, a tag
/// value, a configProvided value or an additionalContext value
///
/// Matching is case-insensitive. Empty entities are ignored.
pub fn slxs_matching_entities<'a>(slxs: &'a [Slx], entities: &[String]) -> Vec<&'a Slx> {
    let needles: Vec<String> = entities
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    if needles.is_empty() {
        return Vec::new();
    }

    slxs.iter()
        .filter(|slx| {
            let haystacks = searchable_text(slx);
            needles
                .iter()
                .any(|needle| haystacks.iter().any(|h| h.contains(needle.as_str())))
        })
        .collect()
}

/// Lowercased text fields an entity search looks at
fn searchable_text(slx: &Slx) -> Vec<String> {
    let spec = &slx.spec;
    let mut fields = vec![slx.name.to_lowercase()];

    if let Some(alias) = &spec.alias {
        fields.push(alias.to_lowercase());
    }
    fields.extend(spec.tags.iter().map(|t| t.value.to_lowercase()));
    fields.extend(spec.config_provided.iter().map(|c| value_text(&c.value)));
    fields.extend(spec.additional_context.values().map(value_text));

    fields
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        Value::Null => String::new(),
        other => other.to_string().to_lowercase(),
    }
}

/// Parses `name:value` (or `name=value`) into a tag
pub fn parse_tag(raw: &str) -> Option<Tag> {
    let (name, value) = raw.split_once(':').or_else(|| raw.split_once('='))?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() {
        return None;
    }
    Some(Tag::new(name, value))
}
