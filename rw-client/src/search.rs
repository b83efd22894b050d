//! Task search endpoint

use crate::WorkspaceClient;
use crate::error::Result;
use reqwest::Method;
use rw_core::dto::search::TaskSearchRequest;
use serde_json::Value;

impl WorkspaceClient {
    /// Search the workspace's tasks
    ///
    /// # Arguments
    /// * `req` - Query, optional persona and SLX scope
    ///
    /// # Returns
    /// The server's search-result document, unmodified
    ///
    /// # Example
    /// ```no_run
    /// # use rw_client::WorkspaceClient;
    /// # use rw_core::dto::search::TaskSearchRequest;
    /// # async fn example() -> rw_client::Result<()> {
    /// let client = WorkspaceClient::new("http://localhost:8000/api/v3/workspaces", "demo");
    /// let results = client
    ///     .task_search(&TaskSearchRequest::new("pods restarting"))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn task_search(&self, req: &TaskSearchRequest) -> Result<Value> {
        let url = format!("{}/task-search", self.workspace_url());
        let response = self
            .request(Method::POST, &url)
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
