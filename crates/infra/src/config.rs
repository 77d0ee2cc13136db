//! Configuration loading from environment variables.

use std::time::Duration;

use thiserror::Error;

use crate::coordinator::CoordinatorConfig;
use crate::jobs::SchedulerConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the Mistral chat-completions client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistralConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MISTRAL_MODEL.to_string(),
            base_url: DEFAULT_MISTRAL_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl MistralConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing { var: "MISTRAL_API_KEY" })
    }
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct RetoneConfig {
    pub bind_addr: String,
    /// In-memory store when unset.
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub mistral: MistralConfig,
    pub coordinator: CoordinatorConfig,
}

impl Default for RetoneConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            redis_url: None,
            cache_ttl: crate::store::DEFAULT_TTL,
            mistral: MistralConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl RetoneConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset or blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let workers = parse_positive(&get, "RETONE_WORKERS", defaults.coordinator.scheduler.workers as u64)?;
        let max_queue_depth = parse_positive(
            &get,
            "RETONE_MAX_QUEUE_DEPTH",
            defaults.coordinator.scheduler.max_queue_depth as u64,
        )?;
        let dispatch_timeout = parse_positive(
            &get,
            "RETONE_DISPATCH_TIMEOUT_SECS",
            defaults.coordinator.dispatch_timeout.as_secs(),
        )?;
        let drain_timeout = parse_positive(
            &get,
            "RETONE_DRAIN_TIMEOUT_SECS",
            defaults.coordinator.drain_timeout.as_secs(),
        )?;
        let cache_ttl = parse_positive(&get, "RETONE_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;

        let base_url = get("MISTRAL_BASE_URL").unwrap_or(defaults.mistral.base_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "MISTRAL_BASE_URL",
                value: base_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }

        Ok(Self {
            bind_addr: get("RETONE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: get("REDIS_URL"),
            cache_ttl: Duration::from_secs(cache_ttl),
            mistral: MistralConfig {
                api_key: get("MISTRAL_API_KEY"),
                model: get("MISTRAL_MODEL_NAME").unwrap_or(defaults.mistral.model),
                base_url: base_url.trim_end_matches('/').to_string(),
                request_timeout: defaults.mistral.request_timeout,
            },
            coordinator: CoordinatorConfig {
                dispatch_timeout: Duration::from_secs(dispatch_timeout),
                drain_timeout: Duration::from_secs(drain_timeout),
                scheduler: SchedulerConfig::default()
                    .with_workers(workers as usize)
                    .with_max_queue_depth(max_queue_depth as usize),
                ..defaults.coordinator
            },
        })
    }
}

fn parse_positive<G>(get: &G, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
