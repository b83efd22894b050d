//! Workspace keywords
//!
//! Operations that talk to the workspace API: SLX lookups, adding RunRequests
//! to a RunSession, task search and memo reads. Each keyword maps to one or
//! two requests through [`WorkspaceClient`].

use rw_client::{ClientError, WorkspaceClient};
use rw_core::domain::runsession::RunSession;
use rw_core::domain::slx::{Slx, Tag, short_slx_name};
use rw_core::dto::runsession::AddRunRequests;
use rw_core::dto::search::TaskSearchRequest;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PlatformConfig};
use crate::slx::{slxs_matching_entities, slxs_with_tags};

/// Interval assumed when an SLX has no readable SLI interval
pub const DEFAULT_SLI_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no SLX name in RW_SLX, RW_SLX_NAME or RunSession {0}")]
    SlxNameNotFound(String),
}

/// SLXs in the workspace carrying any of `tags`
pub async fn list_slxs_with_tags(
    client: &WorkspaceClient,
    tags: &[Tag],
) -> Result<Vec<Slx>, ClientError> {
    let slxs = client.list_slxs().await?;
    let found: Vec<Slx> = slxs_with_tags(&slxs, tags).into_iter().cloned().collect();
    debug!("{} of {} SLX(s) matched tags", found.len(), slxs.len());
    Ok(found)
}

/// SLXs in the workspace mentioning any of `entities`
pub async fn search_slxs(
    client: &WorkspaceClient,
    entities: &[String],
) -> Result<Vec<Slx>, ClientError> {
    let slxs = client.list_slxs().await?;
    let found: Vec<Slx> = slxs_matching_entities(&slxs, entities)
        .into_iter()
        .cloned()
        .collect();
    debug!("{} of {} SLX(s) matched entities", found.len(), slxs.len());
    Ok(found)
}

/// Adds a RunRequest running every task of `slx` to a RunSession
///
/// A runbook that cannot be read contributes no task titles; the PATCH is
/// still sent.
pub async fn run_tasks_for_slx(
    client: &WorkspaceClient,
    slx: &str,
    runsession_id: &str,
) -> Result<Value, ClientError> {
    let slx = short_slx_name(slx);

    let tasks = match client.get_runbook(slx).await {
        Ok(runbook) => runbook.tasks().to_vec(),
        Err(e) => {
            warn!("Failed to read runbook for {}: {}", slx, e);
            Vec::new()
        }
    };

    info!(
        "Adding {} task(s) of {} to RunSession {}",
        tasks.len(),
        slx,
        runsession_id
    );
    let body = AddRunRequests::for_slx(client.workspace(), slx, tasks);
    client.add_run_requests(runsession_id, &body).await
}

/// Searches the workspace for tasks
///
/// # Arguments
/// * `query` - Free-text query
/// * `persona` - Optional persona to search as
/// * `scope` - SLXs to restrict the search to; empty searches everything
pub async fn task_search(
    client: &WorkspaceClient,
    query: &str,
    persona: Option<String>,
    scope: Vec<String>,
) -> Result<Value, ClientError> {
    let req = TaskSearchRequest::new(query)
        .with_persona(persona)
        .with_scope(scope);
    client.task_search(&req).await
}

/// The RunSession document as the server returns it
pub async fn runsession_details(
    client: &WorkspaceClient,
    runsession_id: &str,
) -> Result<Value, ClientError> {
    client.get_runsession_json(runsession_id).await
}

/// Short name of the SLX this process runs for
///
/// Checks RW_SLX, then RW_SLX_NAME, then the first RunRequest of the current
/// RunSession.
pub async fn current_slx_short_name(
    config: &PlatformConfig,
    client: &WorkspaceClient,
) -> Result<String, WorkspaceError> {
    if let Some(name) = slx_name_from_config(config) {
        return Ok(name);
    }

    let session_id = config.require_session_id()?;
    let session = client.get_runsession(session_id).await?;
    slx_name_from_session(&session)
        .ok_or_else(|| WorkspaceError::SlxNameNotFound(session_id.to_string()))
}

fn slx_name_from_config(config: &PlatformConfig) -> Option<String> {
    [&config.slx, &config.slx_name]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(|v| short_slx_name(v).to_string())
}

fn slx_name_from_session(session: &RunSession) -> Option<String> {
    session
        .run_requests
        .first()?
        .slx_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .map(|n| short_slx_name(n).to_string())
}

/// SLI interval of an SLX in seconds, 60 when unknown
pub async fn sli_interval_seconds(client: &WorkspaceClient, slx: &str) -> u64 {
    match client.get_slx(short_slx_name(slx)).await {
        Ok(found) => found.sli_interval_seconds().unwrap_or_else(|| {
            debug!("SLX {} has no SLI interval, using default", slx);
            DEFAULT_SLI_INTERVAL_SECONDS
        }),
        Err(e) => {
            warn!("Failed to read SLX {}: {}", slx, e);
            DEFAULT_SLI_INTERVAL_SECONDS
        }
    }
}

/// Memo value recorded on the current RunRequest
///
/// Returns `None` when RW_SLX_API_URL or RW_RUNREQUEST_ID is unset or no memo
/// entry holds `key`.
pub async fn memo_value(
    config: &PlatformConfig,
    client: &WorkspaceClient,
    key: &str,
) -> Result<Option<Value>, ClientError> {
    let (Some(slx_api_url), Some(runrequest_id)) =
        (config.slx_api_url.as_deref(), config.runrequest_id.as_deref())
    else {
        debug!("RW_SLX_API_URL or RW_RUNREQUEST_ID unset, no memo to read");
        return Ok(None);
    };

    let run = client.get_runbook_run(slx_api_url, runrequest_id).await?;
    Ok(memo_lookup(&run, key))
}

/// First memo entry holding `key` in a runbook run document
fn memo_lookup(run: &Value, key: &str) -> Option<Value> {
    match run.get("memo")? {
        Value::Array(entries) => entries.iter().find_map(|entry| entry.get(key)).cloned(),
        Value::Object(memo) => memo.get(key).cloned(),
        _ => None,
    }
}
