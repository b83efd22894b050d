//! RunSession endpoints

use crate::WorkspaceClient;
use crate::error::{ClientError, Result};
use reqwest::Method;
use rw_core::domain::runsession::RunSession;
use rw_core::dto::runsession::AddRunRequests;
use serde_json::Value;

impl WorkspaceClient {
    // =============================================================================
    // RunSessions
    // =============================================================================

    /// Fetch a RunSession exactly as the server returns it
    ///
    /// The poller and report keywords work on the raw document so that fields
    /// this crate does not model are passed through untouched.
    pub async fn get_runsession_json(&self, runsession_id: &str) -> Result<Value> {
        let url = format!("{}/runsessions/{}", self.workspace_url(), runsession_id);
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    /// Fetch a RunSession as a typed record
    pub async fn get_runsession(&self, runsession_id: &str) -> Result<RunSession> {
        let raw = self.get_runsession_json(runsession_id).await?;
        serde_json::from_value(raw)
            .map_err(|e| ClientError::ParseError(format!("Invalid RunSession document: {}", e)))
    }

    /// Append RunRequests to a RunSession
    ///
    /// # Arguments
    /// * `runsession_id` - The RunSession to extend
    /// * `req` - The RunRequests to add
    ///
    /// # Returns
    /// The updated RunSession document
    pub async fn add_run_requests(&self, runsession_id: &str, req: &AddRunRequests) -> Result<Value> {
        let url = format!("{}/runsessions/{}", self.workspace_url(), runsession_id);
        let response = self
            .request(Method::PATCH, &url)
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch a runbook run (one RunRequest) from the SLX API
    ///
    /// # Arguments
    /// * `slx_api_url` - SLX-scoped API root, usually `RW_SLX_API_URL`
    /// * `runrequest_id` - The RunRequest ID
    pub async fn get_runbook_run(&self, slx_api_url: &str, runrequest_id: &str) -> Result<Value> {
        let url = format!(
            "{}/runbook/runs/{}",
            slx_api_url.trim_end_matches('/'),
            runrequest_id
        );
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }
}
