//! SLX DTOs

use serde::{Deserialize, Serialize};

/// Body of `GET /{workspace}/slxs/{slx}/runbook`
///
/// Only the task titles are read; every level may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Runbook {
    #[serde(default)]
    pub status: RunbookStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookStatus {
    #[serde(default)]
    pub code_bundle: CodeBundle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeBundle {
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl Runbook {
    pub fn tasks(&self) -> &[String] {
        &self.status.code_bundle.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runbook_tasks() {
        let rb: Runbook = serde_json::from_str(
            r#"{"status": {"codeBundle": {"tasks": ["Check Pods", "Check Events"]}}}"#,
        )
        .unwrap();
        assert_eq!(rb.tasks(), ["Check Pods", "Check Events"]);

        let empty: Runbook = serde_json::from_str("{}").unwrap();
        assert!(empty.tasks().is_empty());
    }
}
