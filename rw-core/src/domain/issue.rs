//! Issue domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::lenient;

/// Severity assigned when an issue carries none.
pub const DEFAULT_SEVERITY: i64 = 4;

/// A finding attached to a RunRequest
///
/// Unknown fields are kept in `extra` so an issue can be handed back to
/// callers exactly as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub severity: Option<i64>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,

    /// Usually a JSON document encoded as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// An issue is open only when the server says `closed: false`.
    pub fn is_open(&self) -> bool {
        self.closed == Some(false)
    }

    /// Sort key for reports: lower is more severe
    pub fn severity_rank(&self) -> i64 {
        self.severity.unwrap_or(DEFAULT_SEVERITY)
    }

    pub fn severity_level(&self) -> Severity {
        Severity::from_rank(self.severity_rank())
    }
}

/// Named severity buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            1 => Severity::Critical,
            2 => Severity::High,
            3 => Severity::Medium,
            4 => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
            Severity::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_severity_defaults_to_low() {
        let issue: Issue = serde_json::from_str(r#"{"title": "x", "closed": false}"#).unwrap();
        assert_eq!(issue.severity_rank(), 4);
        assert_eq!(issue.severity_level(), Severity::Low);
    }

    #[test]
    fn test_open_requires_explicit_false() {
        let open: Issue = serde_json::from_str(r#"{"closed": false}"#).unwrap();
        let closed: Issue = serde_json::from_str(r#"{"closed": true}"#).unwrap();
        let unknown: Issue = serde_json::from_str(r#"{}"#).unwrap();

        assert!(open.is_open());
        assert!(!closed.is_open());
        assert!(!unknown.is_open());
    }

    #[test]
    fn test_odd_field_shapes_fall_back() {
        let issue: Issue =
            serde_json::from_str(r#"{"closed": false, "severity": "high", "title": ["a"]}"#).unwrap();
        assert!(issue.is_open());
        assert_eq!(issue.severity_rank(), DEFAULT_SEVERITY);
        assert_eq!(issue.title, None);
    }

    #[test]
    fn test_unmapped_severity_is_unknown() {
        assert_eq!(Severity::from_rank(9).to_string(), "Unknown");
        assert_eq!(Severity::from_rank(1).to_string(), "Critical");
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let raw = r#"{"closed": false, "severity": 2, "resource": "pod-a"}"#;
        let issue: Issue = serde_json::from_str(raw).unwrap();
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["resource"], "pod-a");
        assert_eq!(value["severity"], 2);
    }
}
