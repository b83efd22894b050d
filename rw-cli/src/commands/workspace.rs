//! Task search and memo handlers

use anyhow::Result;
use rw_keywords::workspace;
use serde_json::{Value, json};
use tracing::warn;

use super::print_json;
use crate::config::Config;

/// Search the workspace for tasks, printing `{}` on failure
pub async fn task_search(
    config: &Config,
    query: &str,
    persona: Option<String>,
    scope: Vec<String>,
) -> Result<()> {
    let client = config.client()?;
    let results = workspace::task_search(&client, query, persona, scope)
        .await
        .unwrap_or_else(|e| {
            warn!("Task search failed: {}", e);
            json!({})
        });
    print_json(&results)
}

/// Print a memo value of the current RunRequest, `null` when absent
pub async fn memo(config: &Config, key: &str) -> Result<()> {
    let client = config.client()?;
    let value = workspace::memo_value(&config.platform, &client, key)
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to read memo {}: {}", key, e);
            None
        });
    print_json(&value.unwrap_or(Value::Null))
}
