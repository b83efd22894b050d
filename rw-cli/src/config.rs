//! Configuration module
//!
//! Platform variables from the environment, with command-line flags taking
//! precedence.

use anyhow::{Context, Result};
use rw_client::WorkspaceClient;
use rw_keywords::PlatformConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub platform: PlatformConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            platform: PlatformConfig::from_env(),
        }
    }

    /// Replaces platform values with any flags given on the command line
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        workspace: Option<String>,
        token: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(api_url) = non_empty(api_url) {
            self.platform.workspace_api_url = Some(api_url);
        }
        if let Some(workspace) = non_empty(workspace) {
            self.platform.workspace = Some(workspace);
        }
        if let Some(token) = non_empty(token) {
            self.platform.user_token = Some(token);
        }
        self
    }

    /// Workspace client for commands that talk to the API
    pub fn client(&self) -> Result<WorkspaceClient> {
        self.platform
            .validate()
            .context("Invalid platform configuration")?;
        self.platform
            .workspace_client()
            .context("Workspace API not configured (set --api-url and --workspace)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Config {
        Config {
            platform: PlatformConfig::from_lookup(|_| None),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let mut config = empty();
        config.platform.workspace = Some("from-env".to_string());

        let config = config.with_overrides(
            Some("https://papi.example.com/api/v3/workspaces".to_string()),
            Some("from-flag".to_string()),
            Some(String::new()),
        );

        assert_eq!(config.platform.workspace.as_deref(), Some("from-flag"));
        assert_eq!(
            config.platform.workspace_api_url.as_deref(),
            Some("https://papi.example.com/api/v3/workspaces")
        );
        assert_eq!(config.platform.user_token, None);
    }

    #[test]
    fn test_client_requires_api_url() {
        let config = empty().with_overrides(None, Some("demo".to_string()), None);
        assert!(config.client().is_err());
    }

    #[test]
    fn test_client_built_from_flags() {
        let config = empty().with_overrides(
            Some("https://papi.example.com/api/v3/workspaces/".to_string()),
            Some("/workspaces/demo".to_string()),
            None,
        );
        let client = config.client().unwrap();
        assert_eq!(client.workspace(), "demo");
    }
}
