//! RunWhen Workspace HTTP Client
//!
//! A small, typed HTTP client for the RunWhen workspace API.
//!
//! Both the keyword library and the CLI go through this crate, so URL
//! construction and bearer authentication live in one place.
//!
//! # Example
//!
//! ```no_run
//! use rw_client::WorkspaceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WorkspaceClient::new("https://papi.example.com/api/v3/workspaces", "my-ws")
//!         .with_token("secret");
//!
//!     let slxs = client.list_slxs().await?;
//!     println!("{} SLXs in workspace", slxs.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod runsessions;
mod search;
mod slxs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Timeout applied to every request unless an endpoint needs longer
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for one workspace of the RunWhen API
///
/// Endpoints are grouped by resource:
/// - SLX catalog (list, detail, runbook)
/// - RunSessions (fetch, append RunRequests, runbook runs)
/// - Task search
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    /// Workspace API root (e.g., "https://papi.example.com/api/v3/workspaces")
    base_url: String,
    /// Workspace name without any `workspaces/` prefix
    workspace: String,
    /// Bearer token attached to every request when present
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl WorkspaceClient {
    /// Create a new workspace client
    ///
    /// # Arguments
    /// * `base_url` - Workspace API root, usually `RW_WORKSPACE_API_URL`
    /// * `workspace` - Workspace name, usually `RW_WORKSPACE`
    ///
    /// # Example
    /// ```
    /// use rw_client::WorkspaceClient;
    ///
    /// let client = WorkspaceClient::new("http://localhost:8000/api/v3/workspaces/", "/workspaces/demo");
    /// assert_eq!(client.workspace(), "demo");
    /// ```
    pub fn new(base_url: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self::with_client(base_url, workspace, Client::new())
    }

    /// Create a new workspace client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        workspace: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        let workspace = workspace.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            workspace: normalize_workspace(&workspace).to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach a bearer token when one is available
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Get the base URL of the workspace API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the normalized workspace name
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// `{base}/{workspace}`
    fn workspace_url(&self) -> String {
        format!("{}/{}", self.base_url, self.workspace)
    }

    /// Start a request with authentication and the default timeout applied
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        let builder = self
            .client
            .request(method, url)
            .timeout(DEFAULT_REQUEST_TIMEOUT);

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Strips leading slashes and a `workspaces/` prefix from a workspace name
pub fn normalize_workspace(workspace: &str) -> &str {
    let trimmed = workspace.trim_start_matches('/');
    trimmed
        .strip_prefix("workspaces/")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = WorkspaceClient::new("http://localhost:8000/api/v3/workspaces", "demo");
        assert_eq!(client.base_url(), "http://localhost:8000/api/v3/workspaces");
        assert_eq!(client.workspace(), "demo");
        assert_eq!(
            client.workspace_url(),
            "http://localhost:8000/api/v3/workspaces/demo"
        );
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = WorkspaceClient::new("http://localhost:8000/", "demo");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = WorkspaceClient::with_client("http://localhost:8000", "demo", http_client);
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_normalize_workspace() {
        assert_eq!(normalize_workspace("demo"), "demo");
        assert_eq!(normalize_workspace("/demo"), "demo");
        assert_eq!(normalize_workspace("workspaces/demo"), "demo");
        assert_eq!(normalize_workspace("/workspaces/demo/"), "demo");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = WorkspaceClient::new("http://localhost:8000", "demo")
            .with_optional_token(Some(String::new()));
        assert!(client.token.is_none());

        let client = client.with_token("abc");
        assert_eq!(client.token.as_deref(), Some("abc"));
    }
}
