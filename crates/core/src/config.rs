use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable provider configuration, constructed once and passed into the
/// deployment client, poller, and alias manager. No pipeline component reads
/// the environment on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the hosting provider API, no trailing slash.
    pub api_url: String,
    pub api_token: String,
    pub account_id: String,
    /// Domain under which stable aliases live (`{project}.{base_domain}`).
    pub base_domain: String,
    #[serde(default)]
    pub poll: PollSchedule,
    /// Overall wall-clock budget for one publish attempt, in seconds.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

/// Bounded polling schedule: a short fixed interval for the first few
/// attempts, then a longer one, capped at `max_attempts`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollSchedule {
    pub fast_interval_ms: u64,
    pub slow_interval_ms: u64,
    /// Attempts that use the fast interval before switching to the slow one.
    pub fast_attempts: u32,
    pub max_attempts: u32,
    /// Leading attempts during which a 404 from the provider is treated as
    /// "not yet queryable" rather than an error.
    pub grace_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast_interval_ms: 2_000,
            slow_interval_ms: 10_000,
            fast_attempts: 10,
            max_attempts: 40,
            grace_attempts: 5,
        }
    }
}

impl PollSchedule {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_interval_ms)
    }
}

fn default_deadline_secs() -> u64 {
    600
}

impl ProviderConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Stable alias hostname for a project.
    pub fn stable_alias(&self, project_name: &str) -> String {
        format!("{}.{}", project_name, self.base_domain)
    }

    /// Load from the global config file, then apply environment overrides
    /// (`STOREKIT_API_URL`, `STOREKIT_API_TOKEN`, `STOREKIT_ACCOUNT_ID`,
    /// `STOREKIT_BASE_DOMAIN`). Env-only setups work without a file.
    pub fn load() -> Result<Self> {
        let mut config = match load_config_file()? {
            Some(c) => c,
            None => ProviderConfig {
                api_url: String::new(),
                api_token: String::new(),
                account_id: String::new(),
                base_domain: String::new(),
                poll: PollSchedule::default(),
                deadline_secs: default_deadline_secs(),
            },
        };

        if let Ok(url) = std::env::var("STOREKIT_API_URL") {
            config.api_url = url;
        }
        if let Ok(token) = std::env::var("STOREKIT_API_TOKEN") {
            config.api_token = token;
        }
        if let Ok(account) = std::env::var("STOREKIT_ACCOUNT_ID") {
            config.account_id = account;
        }
        if let Ok(domain) = std::env::var("STOREKIT_BASE_DOMAIN") {
            config.base_domain = domain;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::Config("provider api_url is not set".into()));
        }
        if self.api_token.is_empty() {
            return Err(Error::Config("provider api_token is not set".into()));
        }
        if self.base_domain.is_empty() {
            return Err(Error::Config("base_domain is not set".into()));
        }
        if self.poll.max_attempts == 0 {
            return Err(Error::Config("poll.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Get path to the global config file.
fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| Error::Config("could not determine home directory".into()))?;
    let config_dir = PathBuf::from(home).join(".storekit");
    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.toml"))
}

fn load_config_file() -> Result<Option<ProviderConfig>> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    let config: ProviderConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Save global config. Returns the path written.
pub fn save_config(config: &ProviderConfig) -> Result<PathBuf> {
    let path = config_path()?;
    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProviderConfig {
        ProviderConfig {
            api_url: "https://api.host.test/v1".into(),
            api_token: "tok".into(),
            account_id: "acct".into(),
            base_domain: "sites.test".into(),
            poll: PollSchedule::default(),
            deadline_secs: 600,
        }
    }

    #[test]
    fn test_stable_alias() {
        assert_eq!(sample().stable_alias("my-store"), "my-store.sites.test");
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let mut c = sample();
        c.api_token.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let c = sample();
        let s = toml::to_string_pretty(&c).unwrap();
        let back: ProviderConfig = toml::from_str(&s).unwrap();
        assert_eq!(back.api_url, c.api_url);
        assert_eq!(back.poll.max_attempts, c.poll.max_attempts);
    }

    #[test]
    fn test_poll_schedule_defaults_when_absent() {
        let s = r#"
api_url = "https://api.host.test"
api_token = "t"
account_id = "a"
base_domain = "sites.test"
"#;
        let c: ProviderConfig = toml::from_str(s).unwrap();
        assert_eq!(c.poll.max_attempts, PollSchedule::default().max_attempts);
        assert_eq!(c.deadline_secs, 600);
    }
}
