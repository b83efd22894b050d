//! Platform configuration
//!
//! The RunWhen platform hands context to keywords through `RW_`-prefixed
//! environment variables. They are read once into [`PlatformConfig`] and the
//! struct is passed to each operation; nothing re-reads the environment later.

use rw_client::WorkspaceClient;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every platform variable
pub const PLATFORM_PREFIX: &str = "RW_";

/// Errors raised while importing platform configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Name does not start with `RW_`
    #[error("variable {0:?} is not a RunWhen platform variable; use a user variable instead")]
    NotPlatformVariable(String),

    /// Variable unset or empty
    #[error("platform variable {0} has no value defined")]
    Missing(String),

    /// Variable set to something unusable
    #[error("platform variable {name} is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

/// Imports a single platform variable from the process environment
///
/// # Errors
/// `NotPlatformVariable` for names without the `RW_` prefix, `Missing` when
/// the variable is unset or empty.
pub fn import_platform_variable(name: &str) -> Result<String, ConfigError> {
    import_with(name, |key| std::env::var(key).ok())
}

fn import_with<F>(name: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !name.starts_with(PLATFORM_PREFIX) {
        return Err(ConfigError::NotPlatformVariable(name.to_string()));
    }

    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Every platform variable the keywords understand
///
/// All fields are optional at load time; operations call the `require_*`
/// accessors for the ones they need, which fail loudly.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    pub workspace: Option<String>,
    pub workspace_api_url: Option<String>,
    pub slx_api_url: Option<String>,
    pub session_id: Option<String>,
    pub runrequest_id: Option<String>,
    pub slx: Option<String>,
    pub slx_name: Option<String>,
    pub user_token: Option<String>,
    pub frontend_url: Option<String>,
}

impl PlatformConfig {
    /// Creates configuration from environment variables
    ///
    /// Recognized variables:
    /// - RW_WORKSPACE, RW_WORKSPACE_API_URL, RW_SLX_API_URL
    /// - RW_SESSION_ID, RW_RUNREQUEST_ID
    /// - RW_SLX, RW_SLX_NAME
    /// - RW_USER_TOKEN, RW_FRONTEND_URL
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| import_with(name, &lookup).ok();

        Self {
            workspace: get("RW_WORKSPACE"),
            workspace_api_url: get("RW_WORKSPACE_API_URL"),
            slx_api_url: get("RW_SLX_API_URL"),
            session_id: get("RW_SESSION_ID"),
            runrequest_id: get("RW_RUNREQUEST_ID"),
            slx: get("RW_SLX"),
            slx_name: get("RW_SLX_NAME"),
            user_token: get("RW_USER_TOKEN"),
            frontend_url: get("RW_FRONTEND_URL"),
        }
    }

    /// Validates the values that are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("RW_WORKSPACE_API_URL", &self.workspace_api_url),
            ("RW_SLX_API_URL", &self.slx_api_url),
            ("RW_FRONTEND_URL", &self.frontend_url),
        ];

        for (name, value) in urls {
            if let Some(url) = value {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::Invalid {
                        name: name.to_string(),
                        reason: "must start with http:// or https://".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn require_workspace(&self) -> Result<&str, ConfigError> {
        require(&self.workspace, "RW_WORKSPACE")
    }

    pub fn require_workspace_api_url(&self) -> Result<&str, ConfigError> {
        require(&self.workspace_api_url, "RW_WORKSPACE_API_URL")
    }

    pub fn require_slx_api_url(&self) -> Result<&str, ConfigError> {
        require(&self.slx_api_url, "RW_SLX_API_URL")
    }

    pub fn require_session_id(&self) -> Result<&str, ConfigError> {
        require(&self.session_id, "RW_SESSION_ID")
    }

    pub fn require_runrequest_id(&self) -> Result<&str, ConfigError> {
        require(&self.runrequest_id, "RW_RUNREQUEST_ID")
    }

    /// Builds an authenticated workspace client
    ///
    /// Requires RW_WORKSPACE_API_URL and RW_WORKSPACE; RW_USER_TOKEN is
    /// attached when present.
    pub fn workspace_client(&self) -> Result<WorkspaceClient, ConfigError> {
        let client = WorkspaceClient::new(self.require_workspace_api_url()?, self.require_workspace()?)
            .with_optional_token(self.user_token.clone());
        Ok(client)
    }

    /// Frontend link to a RunSession, when RW_FRONTEND_URL is known
    pub fn runsession_link(&self, runsession_id: &str) -> Option<String> {
        let frontend = self.frontend_url.as_deref()?.trim_end_matches('/');
        let workspace = rw_client::normalize_workspace(self.workspace.as_deref()?);
        Some(format!(
            "{}/workspace/{}/runsessions/{}",
            frontend, workspace, runsession_id
        ))
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Tuning for the RunSession stability poller
///
/// The defaults are empirical; nothing downstream depends on their exact values.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between fetches
    pub poll_interval: Duration,

    /// Give up once this much time has passed since the first fetch
    pub max_wait: Duration,

    /// Consecutive identical RunRequest counts needed to call a session stable
    pub stable_observations: u32,
}

impl PollConfig {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
            ..Self::default()
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_wait < self.poll_interval {
            anyhow::bail!("max_wait must be at least one poll_interval");
        }

        if self.stable_observations == 0 {
            anyhow::bail!("stable_observations must be greater than 0");
        }

        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300), // 5 minutes
            stable_observations: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_import_rejects_non_platform_names() {
        let err = import_with("HOME", lookup(&[("HOME", "/root")])).unwrap_err();
        assert_eq!(err, ConfigError::NotPlatformVariable("HOME".to_string()));
    }

    #[test]
    fn test_import_missing_and_empty() {
        let env = lookup(&[("RW_EMPTY", "")]);
        assert_eq!(
            import_with("RW_EMPTY", &env).unwrap_err(),
            ConfigError::Missing("RW_EMPTY".to_string())
        );
        assert_eq!(
            import_with("RW_ABSENT", &env).unwrap_err(),
            ConfigError::Missing("RW_ABSENT".to_string())
        );
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = PlatformConfig::from_lookup(lookup(&[
            ("RW_WORKSPACE", "demo"),
            ("RW_WORKSPACE_API_URL", "https://papi.test/api/v3/workspaces"),
            ("RW_SESSION_ID", "42"),
            ("RW_USER_TOKEN", "tok"),
        ]));

        assert_eq!(config.require_workspace().unwrap(), "demo");
        assert_eq!(config.require_session_id().unwrap(), "42");
        assert_eq!(config.user_token.as_deref(), Some("tok"));
        assert!(config.require_runrequest_id().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = PlatformConfig {
            workspace_api_url: Some("papi.test".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_workspace_client_requires_url_and_workspace() {
        let config = PlatformConfig {
            workspace: Some("demo".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.workspace_client().unwrap_err(),
            ConfigError::Missing("RW_WORKSPACE_API_URL".to_string())
        );
    }

    #[test]
    fn test_runsession_link() {
        let config = PlatformConfig {
            workspace: Some("workspaces/demo".to_string()),
            frontend_url: Some("https://app.test/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.runsession_link("42").as_deref(),
            Some("https://app.test/workspace/demo/runsessions/42")
        );
    }

    #[test]
    fn test_default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_wait, Duration::from_secs(300));
        assert_eq!(config.stable_observations, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_config_validation() {
        let mut config = PollConfig::default();

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.poll_interval = Duration::from_secs(10);
        config.max_wait = Duration::from_secs(5);
        assert!(config.validate().is_err());

        config.max_wait = Duration::from_secs(60);
        config.stable_observations = 0;
        assert!(config.validate().is_err());
    }
}
