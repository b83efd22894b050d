//! Container registry tag lookups
//!
//! Only Azure Container Registry is supported. Tag listing sits behind the
//! [`TagLister`] trait so update detection can run against any source.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const TAG_LIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry authentication failed: {0}")]
    Auth(String),

    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to fetch tags: {status} {message}")]
    Api { status: u16, message: String },

    #[error("image {image} is not hosted in registry {registry}")]
    ForeignImage { image: String, registry: String },
}

/// Lists the tags of a repository in one registry
#[async_trait]
pub trait TagLister: Send + Sync {
    /// Registry host, e.g. `myacr.azurecr.io`
    fn registry(&self) -> &str;

    /// Tags of `repository`, in the order the registry returns them
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError>;
}

/// Tags available for an image whose current tag is no longer listed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagUpdate {
    pub current_tag: String,
    pub available_tags: Vec<String>,
    pub recommended_tag: Option<String>,
}

/// Compares an image's current tag with what the registry lists
///
/// # Returns
/// `None` while the current tag is still listed. Otherwise the listed tags,
/// recommending the last one.
///
/// # Errors
/// `ForeignImage` when the image lives in another registry; listing and
/// authentication failures are passed through.
pub async fn check_image_updates(
    lister: &dyn TagLister,
    image_name: &str,
    current_tag: &str,
) -> Result<Option<TagUpdate>, RegistryError> {
    let prefix = format!("{}/", lister.registry());
    let repository = image_name
        .strip_prefix(&prefix)
        .ok_or_else(|| RegistryError::ForeignImage {
            image: image_name.to_string(),
            registry: lister.registry().to_string(),
        })?;

    let tags = lister.list_tags(repository).await?;
    debug!("{} has {} tag(s)", repository, tags.len());

    if tags.iter().any(|t| t == current_tag) {
        return Ok(None);
    }

    Ok(Some(TagUpdate {
        current_tag: current_tag.to_string(),
        recommended_tag: tags.last().cloned(),
        available_tags: tags,
    }))
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Azure Container Registry client using the `/acr/v1` data-plane API
#[derive(Debug, Clone)]
pub struct AcrClient {
    registry: String,
    token: String,
    client: Client,
}

impl AcrClient {
    /// Create a client with an existing access token
    pub fn new(registry: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            registry: registry.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Obtain a token through the Azure CLI
    ///
    /// Runs `az acr login --name <registry> --expose-token` and uses the
    /// returned access token.
    pub fn login(registry: &str) -> Result<Self, RegistryError> {
        let name = registry.split('.').next().unwrap_or(registry);
        info!("Requesting ACR token for {}", name);

        let output = Command::new("az")
            .args([
                "acr",
                "login",
                "--name",
                name,
                "--expose-token",
                "--output",
                "tsv",
                "--query",
                "accessToken",
            ])
            .output()
            .map_err(|e| RegistryError::Auth(format!("failed to execute az: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::Auth(stderr.trim().to_string()));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(RegistryError::Auth("az returned an empty token".to_string()));
        }

        Ok(Self::new(registry, token))
    }

    /// Registry host from `registry.azurecr.io[,subscription_id]`
    pub fn parse_details(details: &str) -> &str {
        details.split(',').next().unwrap_or(details).trim()
    }
}

#[async_trait]
impl TagLister for AcrClient {
    fn registry(&self) -> &str {
        &self.registry
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        let url = format!("https://{}/acr/v1/{}/_tags", self.registry, repository);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(TAG_LIST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Auth(format!("token rejected by {}", self.registry)));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RegistryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let list: TagList = response.json().await?;
        Ok(list.tags.into_iter().map(|t| t.name).collect())
    }
}
