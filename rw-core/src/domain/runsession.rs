//! RunSession and RunRequest domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::issue::Issue;
use super::serde_helpers::{lenient, null_as_default};

/// A server-side record grouping RunRequests triggered together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSession {
    /// Opaque identifier; the API uses both strings and integers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Entries in arrival order
    #[serde(default, deserialize_with = "null_as_default")]
    pub run_requests: Vec<RunRequest>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunSession {
    /// All issues across every RunRequest, in request order
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.run_requests.iter().flat_map(|rr| rr.issues.iter())
    }

    /// Issues whose `closed` flag is explicitly false
    pub fn open_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues().filter(|issue| issue.is_open())
    }

    /// RunRequests ordered by creation time
    ///
    /// Requests without a parseable timestamp keep their relative order and
    /// sort after the timestamped ones.
    pub fn sorted_by_created(&self) -> Vec<&RunRequest> {
        let mut requests: Vec<&RunRequest> = self.run_requests.iter().collect();
        requests.sort_by_key(|rr| match rr.created_at() {
            Some(ts) => (0, Some(ts)),
            None => (1, None),
        });
        requests
    }
}

/// Where a RunRequest came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// The server filled in `source` itself
    Named(String),
    SearchQuery,
    Issue,
    SliAlert,
    Workflow,
}

impl std::fmt::Display for RequestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestSource::Named(name) => write!(f, "{}", name),
            RequestSource::SearchQuery => write!(f, "search"),
            RequestSource::Issue => write!(f, "issue"),
            RequestSource::SliAlert => write!(f, "alert"),
            RequestSource::Workflow => write!(f, "workflow"),
        }
    }
}

/// One execution request within a RunSession
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub slx_name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub task_titles: Vec<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,

    /// A bare name on older records, an object with `name` on newer ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Value>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_search_query: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_issue: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_sli_alert: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_workflow: Option<Value>,

    #[serde(default, deserialize_with = "lenient")]
    pub issues: Vec<Issue>,

    /// Key-value annotations, usually a list of objects
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub memo: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunRequest {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Resolves the request's origin
    ///
    /// An explicit `source` wins. Otherwise exactly one of the trigger-origin
    /// fields must be set; none or several yields `None`.
    pub fn source(&self) -> Option<RequestSource> {
        if let Some(source) = self.source.as_deref().filter(|s| !s.is_empty()) {
            return Some(RequestSource::Named(source.to_string()));
        }

        let present = |field: &Option<Value>| matches!(field, Some(v) if !v.is_null());
        let candidates = [
            (present(&self.from_search_query), RequestSource::SearchQuery),
            (present(&self.from_issue), RequestSource::Issue),
            (present(&self.from_sli_alert), RequestSource::SliAlert),
            (present(&self.from_workflow), RequestSource::Workflow),
        ];

        let mut found = candidates.into_iter().filter(|(set, _)| *set);
        match (found.next(), found.next()) {
            (Some((_, source)), None) => Some(source),
            _ => None,
        }
    }

    /// Persona name, from either persona shape
    pub fn persona_name(&self) -> Option<&str> {
        let name = match self.persona.as_ref()? {
            Value::String(name) => name.as_str(),
            Value::Object(persona) => persona.get("name")?.as_str()?,
            _ => return None,
        };
        Some(name).filter(|name| !name.is_empty())
    }

    /// First memo value recorded under `key`
    ///
    /// Entries that are not objects are skipped.
    pub fn memo_value(&self, key: &str) -> Option<&Value> {
        match &self.memo {
            Value::Array(entries) => entries.iter().find_map(|entry| entry.get(key)),
            Value::Object(memo) => memo.get(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_collections_become_empty() {
        let rs: RunSession =
            serde_json::from_str(r#"{"id": 7, "runRequests": [{"issues": null, "memo": null}]}"#)
                .unwrap();
        assert_eq!(rs.run_requests.len(), 1);
        assert!(rs.run_requests[0].issues.is_empty());
        assert!(rs.run_requests[0].memo.is_null());
    }

    #[test]
    fn test_source_prefers_explicit_field() {
        let rr: RunRequest =
            serde_json::from_str(r#"{"source": "manual", "fromIssue": {"id": 1}}"#).unwrap();
        assert_eq!(rr.source(), Some(RequestSource::Named("manual".to_string())));
    }

    #[test]
    fn test_source_inferred_from_single_origin() {
        let rr: RunRequest = serde_json::from_str(r#"{"fromSliAlert": {"id": 3}}"#).unwrap();
        assert_eq!(rr.source(), Some(RequestSource::SliAlert));
        assert_eq!(rr.source().unwrap().to_string(), "alert");
    }

    #[test]
    fn test_source_ambiguous_or_absent() {
        let both: RunRequest =
            serde_json::from_str(r#"{"fromIssue": 1, "fromWorkflow": "wf"}"#).unwrap();
        let none: RunRequest = serde_json::from_str(r#"{"fromIssue": null}"#).unwrap();
        assert_eq!(both.source(), None);
        assert_eq!(none.source(), None);
    }

    #[test]
    fn test_persona_accepts_string_or_object() {
        let a: RunRequest = serde_json::from_str(r#"{"persona": "eager-edgar"}"#).unwrap();
        let b: RunRequest = serde_json::from_str(r#"{"persona": {"name": "cautious-cathy"}}"#).unwrap();
        let c: RunRequest = serde_json::from_str(r#"{"persona": {"id": 12}}"#).unwrap();
        assert_eq!(a.persona_name(), Some("eager-edgar"));
        assert_eq!(b.persona_name(), Some("cautious-cathy"));
        assert_eq!(c.persona_name(), None);
    }

    #[test]
    fn test_unexpected_shapes_do_not_reject_request() {
        let rs: RunSession = serde_json::from_str(
            r#"{"runRequests": [
                {"memo": {"k": "v"}, "issues": [{"closed": false}]},
                {"memo": ["note", {"k": "later"}], "issues": [{"closed": false}]},
                {"requester": {"email": "a@b.c"}, "persona": {"id": 1}, "issues": [{"closed": true}]},
                {"taskTitles": "not a list", "slxName": 7, "created": 17000}
            ]}"#,
        )
        .unwrap();

        assert_eq!(rs.run_requests.len(), 4);
        assert_eq!(rs.open_issues().count(), 2);
        assert_eq!(rs.run_requests[0].memo_value("k"), Some(&serde_json::json!("v")));
        assert_eq!(rs.run_requests[1].memo_value("k"), Some(&serde_json::json!("later")));
        assert_eq!(rs.run_requests[2].requester, None);
        assert!(rs.run_requests[3].task_titles.is_empty());
        assert_eq!(rs.run_requests[3].slx_name, None);
    }

    #[test]
    fn test_sorted_by_created() {
        let rs: RunSession = serde_json::from_str(
            r#"{"runRequests": [
                {"slxName": "c"},
                {"slxName": "b", "created": "2024-01-01T02:00:00Z"},
                {"slxName": "a", "created": "2024-01-01T01:00:00Z"}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = rs
            .sorted_by_created()
            .iter()
            .map(|rr| rr.slx_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_memo_value_first_match() {
        let rr: RunRequest =
            serde_json::from_str(r#"{"memo": [{"a": 1}, {"b": 2}, {"b": 3}]}"#).unwrap();
        assert_eq!(rr.memo_value("b"), Some(&serde_json::json!(2)));
        assert_eq!(rr.memo_value("z"), None);
    }
}
