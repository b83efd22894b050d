//! RunSession DTOs

use serde::{Deserialize, Serialize};

/// Body of `PATCH /{workspace}/runsessions/{id}`
///
/// Appends RunRequests to an existing RunSession.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRunRequests {
    pub run_requests: Vec<RunRequestSpec>,
}

/// A RunRequest to create
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequestSpec {
    /// Fully qualified name, `workspace--slx`
    pub slx_name: String,
    pub task_titles: Vec<String>,
}

impl AddRunRequests {
    /// Builds a patch that runs `tasks` of `slx` in `workspace`
    pub fn for_slx(workspace: &str, slx: &str, tasks: Vec<String>) -> Self {
        Self {
            run_requests: vec![RunRequestSpec {
                slx_name: format!("{}--{}", workspace, slx),
                task_titles: tasks,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_body_shape() {
        let body = AddRunRequests::for_slx("ws", "k8s", vec!["Check Pods".to_string()]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "runRequests": [{"slxName": "ws--k8s", "taskTitles": ["Check Pods"]}]
            })
        );
    }
}
