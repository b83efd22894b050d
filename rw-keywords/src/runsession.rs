//! RunSession reports
//!
//! Pure transforms over RunSession JSON: issue counts, the open-issue
//! markdown report, requester/persona summaries and backtick keyword
//! extraction. None of these keep state between calls.

use regex::Regex;
use rw_core::domain::issue::Issue;
use rw_core::domain::runsession::RunSession;
use serde_json::Value;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Returned by [`most_referenced_resource`] when no title quotes anything
pub const NOT_FOUND: &str = "not found";

/// Requesters on this domain are platform automation, not people
pub const SYSTEM_REQUESTER_DOMAIN: &str = "@workspaces.runwhen.com";
pub const SYSTEM_REQUESTER_LABEL: &str = "RunWhen System";

const MISSING: &str = "N/A";

static BACKTICKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("backtick pattern is valid"));

#[derive(Debug, Error)]
pub enum RunSessionError {
    #[error("invalid RunSession JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn parse_runsession(data: &str) -> Result<RunSession, RunSessionError> {
    Ok(serde_json::from_str(data)?)
}

/// Number of issues not closed
pub fn count_open_issues(data: &str) -> Result<usize, RunSessionError> {
    Ok(parse_runsession(data)?.open_issues().count())
}

/// Issues not closed, as the server sent them
pub fn open_issues(data: &str) -> Result<Vec<Issue>, RunSessionError> {
    Ok(parse_runsession(data)?.open_issues().cloned().collect())
}

/// Markdown report, most severe first
///
/// Issues of equal severity keep their input order. Missing fields render
/// as `N/A`.
pub fn open_issue_markdown(issues: &[Issue]) -> String {
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by_key(|issue| issue.severity_rank());

    let mut out = String::new();
    for issue in sorted {
        let title = issue.title.as_deref().unwrap_or(MISSING);
        let next_steps = issue.next_steps.as_deref().map(str::trim).unwrap_or(MISSING);
        let details = match &issue.details {
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            None => MISSING.to_string(),
        };

        let _ = write!(
            out,
            "## {}\n\n**Severity:** {}\n\n**Next Steps:**\n{}\n\n",
            title,
            issue.severity_level(),
            next_steps
        );
        let _ = write!(out, "**Details:**\n```json\n{}\n```\n\n", details);
    }

    out
}

/// Output flavour for [`requester_summary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Markdown,
}

impl FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(SummaryFormat::Text),
            "markdown" | "md" => Ok(SummaryFormat::Markdown),
            other => Err(format!("unknown summary format: {}", other)),
        }
    }
}

/// Requester with platform automation collapsed to one label
pub fn normalize_requester(requester: &str) -> &str {
    if requester.ends_with(SYSTEM_REQUESTER_DOMAIN) {
        SYSTEM_REQUESTER_LABEL
    } else {
        requester
    }
}

/// Lists who asked for work in a RunSession and which personas ran it
pub fn requester_summary(data: &str, format: SummaryFormat) -> Result<String, RunSessionError> {
    let session = parse_runsession(data)?;

    let mut requesters: Vec<&str> = Vec::new();
    let mut personas: Vec<&str> = Vec::new();

    for rr in &session.run_requests {
        if let Some(requester) = rr.requester.as_deref().filter(|r| !r.is_empty()) {
            push_distinct(&mut requesters, normalize_requester(requester));
        }
        if let Some(persona) = rr.persona_name() {
            push_distinct(&mut personas, persona);
        }
    }

    let mut out = String::new();
    match format {
        SummaryFormat::Text => {
            write_list(&mut out, "Requesters:", &requesters);
            write_list(&mut out, "Personas:", &personas);
        }
        SummaryFormat::Markdown => {
            write_list(&mut out, "### Requesters", &requesters);
            out.push('\n');
            write_list(&mut out, "### Personas", &personas);
        }
    }

    Ok(out)
}

fn push_distinct<'a>(items: &mut Vec<&'a str>, item: &'a str) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn write_list(out: &mut String, heading: &str, items: &[&str]) {
    out.push_str(heading);
    out.push('\n');
    if items.is_empty() {
        out.push_str("- None\n");
    }
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

/// Backtick-quoted substrings of a title, in order
pub fn title_keywords(title: &str) -> impl Iterator<Item = &str> {
    BACKTICKED
        .captures_iter(title)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Distinct backtick-quoted keywords across open issue titles
pub fn open_issue_keywords(data: &str) -> Result<Vec<String>, RunSessionError> {
    let session = parse_runsession(data)?;

    let mut keywords: Vec<String> = Vec::new();
    for title in session.open_issues().filter_map(|i| i.title.as_deref()) {
        for keyword in title_keywords(title) {
            if !keywords.iter().any(|k| k == keyword) {
                keywords.push(keyword.to_string());
            }
        }
    }

    Ok(keywords)
}

/// The keyword quoted most often across all issue titles, open or closed
///
/// Ties go to the keyword seen first. Returns [`NOT_FOUND`] when no title
/// quotes anything.
pub fn most_referenced_resource(data: &str) -> Result<String, RunSessionError> {
    let session = parse_runsession(data)?;

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for title in session.issues().filter_map(|i| i.title.as_deref()) {
        for keyword in title_keywords(title) {
            match counts.iter_mut().find(|(k, _)| *k == keyword) {
                Some((_, n)) => *n += 1,
                None => counts.push((keyword, 1)),
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (keyword, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((keyword, n));
        }
    }

    Ok(best
        .map(|(keyword, _)| keyword.to_string())
        .unwrap_or_else(|| NOT_FOUND.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(issues: Value) -> String {
        json!({"id": "rs-1", "runRequests": [{"issues": issues}]}).to_string()
    }

    #[test]
    fn test_count_open_issues() {
        let data = session(json!([
            {"title": "a", "closed": false},
            {"title": "b", "closed": true},
            {"title": "c", "closed": false}
        ]));
        assert_eq!(count_open_issues(&data).unwrap(), 2);
    }

    #[test]
    fn test_open_issues_spans_run_requests() {
        let data = json!({"runRequests": [
            {"issues": [{"title": "a", "closed": false}]},
            {"issues": [{"title": "b", "closed": true}, {"title": "c", "closed": false}]},
            {}
        ]})
        .to_string();

        let titles: Vec<_> = open_issues(&data)
            .unwrap()
            .into_iter()
            .map(|i| i.title.unwrap())
            .collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn test_unrelated_fields_do_not_block_counts() {
        let payloads = [
            json!({"runRequests": [{"memo": {"k": "v"}, "issues": [{"closed": false}]}]}),
            json!({"runRequests": [{"memo": ["a", "b"], "issues": [{"closed": false}]}]}),
            json!({"runRequests": [{"persona": {"id": 3}, "issues": [{"closed": false}]}]}),
            json!({"runRequests": [{"requester": {"email": "x@y.z"}, "issues": [{"closed": false}]}]}),
        ];
        for payload in payloads {
            let data = payload.to_string();
            assert_eq!(count_open_issues(&data).unwrap(), 1, "payload={}", data);
            assert!(requester_summary(&data, SummaryFormat::Text).is_ok());
        }
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(count_open_issues("{not json").is_err());
    }

    #[test]
    fn test_markdown_orders_by_severity() {
        let issues: Vec<Issue> = serde_json::from_value(json!([
            {"title": "three", "severity": 3},
            {"title": "one", "severity": 1},
            {"title": "two", "severity": 2}
        ]))
        .unwrap();

        let md = open_issue_markdown(&issues);
        let one = md.find("## one").unwrap();
        let two = md.find("## two").unwrap();
        let three = md.find("## three").unwrap();
        assert!(one < two && two < three);
        assert!(md.contains("**Severity:** Critical"));
    }

    #[test]
    fn test_markdown_ties_keep_input_order() {
        let issues: Vec<Issue> = serde_json::from_value(json!([
            {"title": "first"},
            {"title": "second", "severity": 4},
            {"title": "urgent", "severity": 1}
        ]))
        .unwrap();

        let md = open_issue_markdown(&issues);
        let urgent = md.find("## urgent").unwrap();
        let first = md.find("## first").unwrap();
        let second = md.find("## second").unwrap();
        assert!(urgent < first && first < second);
    }

    #[test]
    fn test_markdown_missing_fields() {
        let issues = vec![Issue::default()];
        let md = open_issue_markdown(&issues);
        assert_eq!(
            md,
            "## N/A\n\n**Severity:** Low\n\n**Next Steps:**\nN/A\n\n**Details:**\n```json\nN/A\n```\n\n"
        );
    }

    #[test]
    fn test_markdown_is_deterministic() {
        let issues: Vec<Issue> = serde_json::from_value(json!([
            {"title": "b", "severity": 2, "nextSteps": "  restart  ", "details": "{\"pod\": \"x\"}"},
            {"title": "a", "severity": 1, "details": {"pod": "y"}}
        ]))
        .unwrap();
        assert_eq!(open_issue_markdown(&issues), open_issue_markdown(&issues));
        assert!(open_issue_markdown(&issues).contains("**Next Steps:**\nrestart\n"));
    }

    #[test]
    fn test_requester_summary_text() {
        let data = json!({"runRequests": [
            {"requester": "alice@example.com", "persona": "eager-edgar"},
            {"requester": "bot-7@workspaces.runwhen.com", "persona": {"name": "cautious-cathy"}},
            {"requester": "alice@example.com", "persona": "eager-edgar"},
            {"requester": "sched@workspaces.runwhen.com"}
        ]})
        .to_string();

        let text = requester_summary(&data, SummaryFormat::Text).unwrap();
        assert_eq!(
            text,
            "Requesters:\n- alice@example.com\n- RunWhen System\nPersonas:\n- eager-edgar\n- cautious-cathy\n"
        );
        assert_eq!(text, requester_summary(&data, SummaryFormat::Text).unwrap());
    }

    #[test]
    fn test_requester_summary_markdown_empty() {
        let md = requester_summary(r#"{"runRequests": []}"#, SummaryFormat::Markdown).unwrap();
        assert_eq!(md, "### Requesters\n- None\n\n### Personas\n- None\n");
    }

    #[test]
    fn test_summary_format_from_str() {
        assert_eq!("Markdown".parse::<SummaryFormat>().unwrap(), SummaryFormat::Markdown);
        assert_eq!("text".parse::<SummaryFormat>().unwrap(), SummaryFormat::Text);
        assert!("html".parse::<SummaryFormat>().is_err());
    }

    #[test]
    fn test_open_issue_keywords() {
        let data = session(json!([
            {"title": "Pod `api-7f` restarting in `prod`", "closed": false},
            {"title": "Closed `ignored`", "closed": true},
            {"title": "Namespace `prod` has events", "closed": false}
        ]));
        assert_eq!(open_issue_keywords(&data).unwrap(), vec!["api-7f", "prod"]);
    }

    #[test]
    fn test_most_referenced_resource() {
        let data = session(json!([
            {"title": "fix `podA`", "closed": false},
            {"title": "check `podA` again", "closed": true},
            {"title": "see `podB`", "closed": false}
        ]));
        assert_eq!(most_referenced_resource(&data).unwrap(), "podA");
    }

    #[test]
    fn test_most_referenced_resource_tie_and_empty() {
        let tie = session(json!([
            {"title": "`b` then `a`", "closed": false},
            {"title": "`a` and `b`", "closed": false}
        ]));
        assert_eq!(most_referenced_resource(&tie).unwrap(), "b");

        let none = session(json!([{"title": "plain title", "closed": false}]));
        assert_eq!(most_referenced_resource(&none).unwrap(), NOT_FOUND);
    }
}
