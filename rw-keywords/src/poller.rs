//! RunSession stability poller
//!
//! A RunSession keeps growing while automation adds RunRequests to it. The
//! poller refetches the session until its RunRequest count stops changing,
//! then hands back the settled snapshot.

use async_trait::async_trait;
use rw_client::{ClientError, WorkspaceClient};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::PollConfig;

/// Where snapshots come from
#[async_trait]
pub trait RunSessionSource: Send + Sync {
    async fn fetch_runsession(&self, runsession_id: &str) -> Result<Value, ClientError>;
}

#[async_trait]
impl RunSessionSource for WorkspaceClient {
    async fn fetch_runsession(&self, runsession_id: &str) -> Result<Value, ClientError> {
        self.get_runsession_json(runsession_id).await
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("record carries no RunSession identifier")]
    MissingIdentifier,

    #[error("failed to fetch RunSession {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("RunSession {id} did not stabilize within {waited:?}")]
    Timeout { id: String, waited: Duration },
}

impl PollError {
    /// Timeouts abort the caller; the other failures are reported and skipped
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }
}

/// RunSession ID referenced by a JSON record
///
/// The record's `runsession` (or `runSession`) field holds either an object
/// or a JSON string encoding one; its `id` may be a string or a number.
pub fn extract_runsession_id(record: &str) -> Option<String> {
    let record: Value = serde_json::from_str(record).ok()?;
    let reference = record
        .get("runsession")
        .or_else(|| record.get("runSession"))?;

    let reference = match reference {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded).ok()?,
        other => other.clone(),
    };

    match reference.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn run_request_count(snapshot: &Value) -> usize {
    snapshot
        .get("runRequests")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

/// Polls a RunSession until its RunRequest count settles
pub struct StabilityPoller<S> {
    config: PollConfig,
    source: S,
}

impl<S: RunSessionSource> StabilityPoller<S> {
    pub fn new(config: PollConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Waits for the RunSession referenced by `record` to stabilize
    ///
    /// # Returns
    /// The last snapshot, serialized as JSON
    pub async fn wait_for_stable(&self, record: &str) -> Result<String, PollError> {
        let id = extract_runsession_id(record).ok_or(PollError::MissingIdentifier)?;
        let snapshot = self.wait_for_stable_id(&id).await?;
        Ok(snapshot.to_string())
    }

    /// Waits for RunSession `id` to stabilize
    ///
    /// Stable means the last `stable_observations` fetches returned the same
    /// RunRequest count. Fetch errors end the wait immediately.
    pub async fn wait_for_stable_id(&self, id: &str) -> Result<Value, PollError> {
        info!(
            "Waiting for RunSession {} to stabilize (interval: {:?}, max wait: {:?})",
            id, self.config.poll_interval, self.config.max_wait
        );

        let start = Instant::now();
        let mut last_count: Option<usize> = None;
        let mut run_length: u32 = 0;

        loop {
            let snapshot = self
                .source
                .fetch_runsession(id)
                .await
                .map_err(|source| {
                    warn!("Failed to fetch RunSession {}: {}", id, source);
                    PollError::Fetch {
                        id: id.to_string(),
                        source,
                    }
                })?;

            let count = run_request_count(&snapshot);
            if last_count == Some(count) {
                run_length += 1;
            } else {
                last_count = Some(count);
                run_length = 1;
            }
            debug!(
                "RunSession {} has {} RunRequest(s), unchanged for {} fetch(es)",
                id, count, run_length
            );

            if run_length >= self.config.stable_observations {
                info!("RunSession {} stable at {} RunRequest(s)", id, count);
                return Ok(snapshot);
            }

            let waited = start.elapsed();
            if waited > self.config.max_wait {
                warn!("RunSession {} still changing after {:?}", id, waited);
                return Err(PollError::Timeout {
                    id: id.to_string(),
                    waited,
                });
            }

            time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Waits for the RunSession referenced by `record` using `source`
pub async fn wait_for_stable_runsession<S: RunSessionSource>(
    source: S,
    record: &str,
    config: PollConfig,
) -> Result<String, PollError> {
    StabilityPoller::new(config, source).wait_for_stable(record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays RunRequest counts, repeating the last one when exhausted
    struct Scripted {
        counts: Vec<usize>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(counts: &[usize]) -> Self {
            Self {
                counts: counts.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RunSessionSource for Scripted {
        async fn fetch_runsession(&self, runsession_id: &str) -> Result<Value, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let count = self.counts[call.min(self.counts.len() - 1)];
            Ok(json!({
                "id": runsession_id,
                "fetch": call + 1,
                "runRequests": vec![json!({}); count],
            }))
        }
    }

    /// Adds one RunRequest per fetch
    struct Growing(AtomicUsize);

    #[async_trait]
    impl RunSessionSource for Growing {
        async fn fetch_runsession(&self, _: &str) -> Result<Value, ClientError> {
            let count = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"runRequests": vec![json!({}); count]}))
        }
    }

    struct Failing;

    #[async_trait]
    impl RunSessionSource for Failing {
        async fn fetch_runsession(&self, _: &str) -> Result<Value, ClientError> {
            Err(ClientError::api_error(503, "unavailable"))
        }
    }

    fn fast_config() -> PollConfig {
        PollConfig::new(Duration::from_secs(5), Duration::from_secs(20))
    }

    #[test]
    fn test_extract_id_from_object_and_string() {
        assert_eq!(
            extract_runsession_id(r#"{"runsession": {"id": "rs-1"}}"#).as_deref(),
            Some("rs-1")
        );
        assert_eq!(
            extract_runsession_id(r#"{"runSession": "{\"id\": 42}"}"#).as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_extract_id_missing() {
        for record in [
            "not json",
            "{}",
            r#"{"runsession": {}}"#,
            r#"{"runsession": "{broken"}"#,
            r#"{"runsession": {"id": null}}"#,
            r#"{"runsession": {"id": ""}}"#,
        ] {
            assert_eq!(extract_runsession_id(record), None, "record={}", record);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stable_after_three_equal_counts() {
        let poller = StabilityPoller::new(PollConfig::default(), Scripted::new(&[1, 2, 2, 2, 5]));
        let start = Instant::now();

        let out = poller
            .wait_for_stable(r#"{"runsession": {"id": "rs-1"}}"#)
            .await
            .unwrap();

        let snapshot: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(snapshot["fetch"], 4);
        assert_eq!(snapshot["runRequests"].as_array().unwrap().len(), 2);
        assert_eq!(poller.source.calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_configurable() {
        let mut config = fast_config();
        config.stable_observations = 2;
        let poller = StabilityPoller::new(config, Scripted::new(&[3, 3]));

        let snapshot = poller.wait_for_stable_id("rs-1").await.unwrap();
        assert_eq!(snapshot["fetch"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_stable() {
        let poller = StabilityPoller::new(fast_config(), Growing(AtomicUsize::new(0)));

        let err = poller.wait_for_stable_id("rs-1").await.unwrap_err();
        match &err {
            PollError::Timeout { waited, .. } => assert!(*waited > Duration::from_secs(20)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_is_not_retried() {
        let poller = StabilityPoller::new(fast_config(), Failing);
        let err = poller
            .wait_for_stable(r#"{"runsession": {"id": 7}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Fetch { ref id, .. } if id == "7"));
        assert!(!err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_stable_runsession() {
        let out = wait_for_stable_runsession(
            Scripted::new(&[4]),
            r#"{"runSession": {"id": "rs-9"}}"#,
            PollConfig::default(),
        )
        .await
        .unwrap();
        let snapshot: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(snapshot["id"], "rs-9");
        assert_eq!(snapshot["fetch"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_identifier() {
        let poller = StabilityPoller::new(fast_config(), Scripted::new(&[1]));
        let err = poller.wait_for_stable(r#"{"other": 1}"#).await.unwrap_err();
        assert!(matches!(err, PollError::MissingIdentifier));
        assert_eq!(poller.source.calls(), 0);
    }
}
