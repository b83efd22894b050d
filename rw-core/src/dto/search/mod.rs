//! Task search DTOs

use serde::{Deserialize, Serialize};

/// Body of `POST /{workspace}/task-search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSearchRequest {
    pub query: Vec<String>,
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl TaskSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: vec![query.into()],
            ..Default::default()
        }
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }
}
