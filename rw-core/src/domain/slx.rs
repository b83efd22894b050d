//! SLX domain types
//!
//! SLXs are read-only catalog entries here: they are listed, filtered and
//! returned, never modified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::null_as_default;

/// A name/value pair on an SLX spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive equality on both name and value
    pub fn matches(&self, other: &Tag) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.value.eq_ignore_ascii_case(&other.value)
    }
}

/// Configuration value supplied to an SLX's code bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlxSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub config_provided: Vec<ConfigEntry>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_context: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named, taggable resource in the workspace catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slx {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: SlxSpec,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Slx {
    /// Name without the `workspace--` prefix
    pub fn short_name(&self) -> &str {
        short_slx_name(&self.name)
    }

    /// `sli.spec.intervalSeconds`, when the SLX has an SLI
    ///
    /// Zero counts as unset.
    pub fn sli_interval_seconds(&self) -> Option<u64> {
        let interval = self.extra.get("sli")?.get("spec")?.get("intervalSeconds")?;
        let seconds = match interval {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        seconds.filter(|s| *s > 0)
    }
}

/// Strips a `workspace--` prefix from a fully qualified SLX name
pub fn short_slx_name(name: &str) -> &str {
    match name.split_once("--") {
        Some((_, short)) => short,
        None => name,
    }
}

/// Body of `GET /{workspace}/slxs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlxList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Slx>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_strips_workspace_prefix() {
        assert_eq!(short_slx_name("my-ws--k8s-health"), "k8s-health");
        assert_eq!(short_slx_name("k8s-health"), "k8s-health");
        assert_eq!(short_slx_name("ws--a--b"), "a--b");
    }

    #[test]
    fn test_tag_match_ignores_case() {
        let a = Tag::new("Platform", "Kubernetes");
        let b = Tag::new("platform", "kubernetes");
        let c = Tag::new("platform", "azure");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_sli_interval_from_number_or_string() {
        let a: Slx =
            serde_json::from_str(r#"{"name": "x", "sli": {"spec": {"intervalSeconds": 300}}}"#)
                .unwrap();
        let b: Slx =
            serde_json::from_str(r#"{"name": "x", "sli": {"spec": {"intervalSeconds": "120"}}}"#)
                .unwrap();
        let c: Slx = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(a.sli_interval_seconds(), Some(300));
        assert_eq!(b.sli_interval_seconds(), Some(120));
        assert_eq!(c.sli_interval_seconds(), None);
    }

    #[test]
    fn test_zero_sli_interval_is_unset() {
        for interval in [r#"0"#, r#""0""#] {
            let raw = format!(r#"{{"name": "x", "sli": {{"spec": {{"intervalSeconds": {}}}}}}}"#, interval);
            let slx: Slx = serde_json::from_str(&raw).unwrap();
            assert_eq!(slx.sli_interval_seconds(), None, "interval={}", interval);
        }
    }

    #[test]
    fn test_null_spec_is_empty() {
        let list: SlxList =
            serde_json::from_str(r#"{"results": [{"name": "ws--a", "spec": null}]}"#).unwrap();
        assert_eq!(list.results.len(), 1);
        assert!(list.results[0].spec.tags.is_empty());
        assert_eq!(list.results[0].spec.alias, None);
    }

    #[test]
    fn test_slx_list_tolerates_missing_fields() {
        let list: SlxList = serde_json::from_str(
            r#"{"results": [{"name": "ws--a", "spec": {"tags": null}}, {"name": "ws--b"}]}"#,
        )
        .unwrap();
        assert_eq!(list.results.len(), 2);
        assert!(list.results[0].spec.tags.is_empty());
        assert_eq!(list.results[1].short_name(), "b");
    }
}
