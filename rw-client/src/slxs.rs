//! SLX catalog endpoints

use crate::WorkspaceClient;
use crate::error::Result;
use reqwest::Method;
use rw_core::domain::slx::{Slx, SlxList};
use rw_core::dto::slx::Runbook;
use std::time::Duration;

/// SLX detail responses embed the full SLI/runbook spec and can be slow
const SLX_DETAIL_TIMEOUT: Duration = Duration::from_secs(120);

impl WorkspaceClient {
    // =============================================================================
    // SLX Catalog
    // =============================================================================

    /// List every SLX in the workspace
    ///
    /// # Returns
    /// The `results` array of `GET /{workspace}/slxs`
    pub async fn list_slxs(&self) -> Result<Vec<Slx>> {
        let url = format!("{}/slxs", self.workspace_url());
        let response = self.request(Method::GET, &url).send().await?;

        let list: SlxList = self.handle_response(response).await?;
        Ok(list.results)
    }

    /// Get a single SLX by short name
    ///
    /// # Arguments
    /// * `slx` - SLX short name (no `workspace--` prefix)
    pub async fn get_slx(&self, slx: &str) -> Result<Slx> {
        let url = self.slx_detail_url(slx);
        let response = self
            .request(Method::GET, &url)
            .timeout(SLX_DETAIL_TIMEOUT)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the runbook of an SLX
    ///
    /// # Arguments
    /// * `slx` - SLX short name
    ///
    /// # Returns
    /// The runbook, whose code bundle lists the task titles
    pub async fn get_runbook(&self, slx: &str) -> Result<Runbook> {
        let url = format!("{}/slxs/{}/runbook", self.workspace_url(), slx);
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    /// Detail URL for an SLX
    ///
    /// Platform deployments disagree on whether `RW_WORKSPACE_API_URL` already
    /// ends in `/workspaces`; add the segment only when it is missing.
    fn slx_detail_url(&self, slx: &str) -> String {
        if self.base_url.ends_with("/workspaces") {
            format!("{}/{}/slxs/{}", self.base_url, self.workspace, slx)
        } else {
            format!(
                "{}/workspaces/{}/slxs/{}",
                self.base_url, self.workspace, slx
            )
        }
    }
}
