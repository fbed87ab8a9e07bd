//! Agent and pipeline configuration.
//!
//! Configuration is loaded once per process start (or explicit reload) and
//! is immutable for the duration of a run. Retry and timeout parameters
//! are clamped to sane upper bounds so a misconfigured agent cannot make
//! worst-case stage latency unbounded.

use crate::errors::MarketpulseError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Upper bound on per-agent retry count.
pub const MAX_RETRIES_CAP: u32 = 10;

/// Upper bound on per-execution timeout, in seconds.
pub const MAX_TIMEOUT_SECS: f64 = 300.0;

/// Upper bound on the retry backoff ceiling, in milliseconds.
pub const MAX_BACKOFF_CEILING_MS: u64 = 60_000;

/// Configuration for a single agent.
///
/// Immutable once loaded; changing configuration requires a fresh load,
/// never in-place mutation during an active run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent name, also used as its persisted-state key.
    pub name: String,
    /// Whether the agent participates in pipeline runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum retry count after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-execution timeout in seconds, enforced by the coordinator.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    /// Circuit-breaker dependency key, shared by agents calling the same
    /// downstream service. Agents without one bypass breaker admission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Open-ended adapter-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_seconds() -> f64 {
    30.0
}

impl AgentConfig {
    /// Creates a config with defaults for the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout_seconds(),
            depends_on: None,
            params: HashMap::new(),
        }
    }

    /// Disables the agent.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Sets the retry limit.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-execution timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the circuit-breaker dependency key.
    #[must_use]
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on = Some(dependency.into());
        self
    }

    /// Sets an adapter parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// The per-execution timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }

    /// Clamps retry count and timeout to their caps, warning when a value
    /// was out of range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        if self.max_retries > MAX_RETRIES_CAP {
            warn!(
                agent = %self.name,
                max_retries = self.max_retries,
                cap = MAX_RETRIES_CAP,
                "Clamping max_retries"
            );
            self.max_retries = MAX_RETRIES_CAP;
        }
        if self.timeout_seconds > MAX_TIMEOUT_SECS {
            warn!(
                agent = %self.name,
                timeout_seconds = self.timeout_seconds,
                cap = MAX_TIMEOUT_SECS,
                "Clamping timeout_seconds"
            );
            self.timeout_seconds = MAX_TIMEOUT_SECS;
        }
        self
    }
}

/// Body of one agent entry in the configuration document. The agent name
/// comes from the enclosing map key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentConfigBody {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: f64,
    #[serde(default)]
    depends_on: Option<String>,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    agents: HashMap<String, AgentConfigBody>,
}

/// Loads agent configurations from a JSON document of the form
/// `{"agents": {"<name>": {"enabled": ..., "max_retries": ..., ...}}}`.
///
/// Unknown options are rejected. Returned configs are clamped and sorted
/// by name for deterministic registration order.
pub fn load_agent_configs(document: &str) -> Result<Vec<AgentConfig>, MarketpulseError> {
    let doc: ConfigDocument = serde_json::from_str(document)
        .map_err(|e| MarketpulseError::Config(format!("invalid configuration document: {e}")))?;

    let mut configs: Vec<AgentConfig> = doc
        .agents
        .into_iter()
        .map(|(name, body)| {
            AgentConfig {
                name,
                enabled: body.enabled,
                max_retries: body.max_retries,
                timeout_seconds: body.timeout_seconds,
                depends_on: body.depends_on,
                params: body.params,
            }
            .clamped()
        })
        .collect();
    configs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(configs)
}

/// Coordinator-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum agents executing concurrently within a stage.
    pub max_concurrency: usize,
    /// Base retry delay in milliseconds; doubles each attempt.
    pub base_delay_ms: u64,
    /// Retry delay ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Whether to apply full jitter to retry delays.
    pub retry_jitter: bool,
    /// Maximum ledger entries retained in memory.
    pub ledger_cap: usize,
    /// Maximum ledger entry age in seconds.
    pub ledger_max_age_secs: u64,
    /// Consecutive failures before a circuit opens.
    pub breaker_failure_threshold: u32,
    /// Seconds a circuit stays open before a half-open trial.
    pub breaker_cooldown_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            retry_jitter: true,
            ledger_cap: 1000,
            ledger_max_age_secs: 24 * 60 * 60,
            breaker_failure_threshold: 5,
            breaker_cooldown_secs: 60,
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stage concurrency bound. A zero value is raised to one.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Sets the retry backoff base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the retry backoff ceiling.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Enables or disables retry jitter.
    #[must_use]
    pub fn with_retry_jitter(mut self, jitter: bool) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Sets the ledger retention cap.
    #[must_use]
    pub fn with_ledger_cap(mut self, cap: usize) -> Self {
        self.ledger_cap = cap;
        self
    }

    /// Sets the ledger maximum entry age.
    #[must_use]
    pub fn with_ledger_max_age_secs(mut self, secs: u64) -> Self {
        self.ledger_max_age_secs = secs;
        self
    }

    /// Sets the breaker failure threshold.
    #[must_use]
    pub fn with_breaker_threshold(mut self, threshold: u32) -> Self {
        self.breaker_failure_threshold = threshold.max(1);
        self
    }

    /// Sets the breaker cool-down.
    #[must_use]
    pub fn with_breaker_cooldown_secs(mut self, secs: u64) -> Self {
        self.breaker_cooldown_secs = secs;
        self
    }

    /// Clamps the backoff ceiling to its cap.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        if self.max_delay_ms > MAX_BACKOFF_CEILING_MS {
            warn!(
                max_delay_ms = self.max_delay_ms,
                cap = MAX_BACKOFF_CEILING_MS,
                "Clamping retry delay ceiling"
            );
            self.max_delay_ms = MAX_BACKOFF_CEILING_MS;
        }
        if self.max_concurrency == 0 {
            self.max_concurrency = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::new("news_collector");
        assert!(config.enabled);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.depends_on.is_none());
    }

    #[test]
    fn test_agent_config_clamping() {
        let config = AgentConfig::new("greedy")
            .with_max_retries(99)
            .with_timeout_seconds(10_000.0)
            .clamped();
        assert_eq!(config.max_retries, MAX_RETRIES_CAP);
        assert!((config.timeout_seconds - MAX_TIMEOUT_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_agent_configs() {
        let doc = r#"{
            "agents": {
                "news_collector": {
                    "enabled": true,
                    "max_retries": 2,
                    "timeout_seconds": 15,
                    "depends_on": "news_api",
                    "params": {"feed_url": "https://example.com/rss"}
                },
                "social_publisher": {
                    "enabled": false
                }
            }
        }"#;

        let configs = load_agent_configs(doc).unwrap();
        assert_eq!(configs.len(), 2);
        // Sorted by name.
        assert_eq!(configs[0].name, "news_collector");
        assert_eq!(configs[0].max_retries, 2);
        assert_eq!(configs[0].depends_on.as_deref(), Some("news_api"));
        assert_eq!(configs[1].name, "social_publisher");
        assert!(!configs[1].enabled);
        assert_eq!(configs[1].max_retries, 3);
    }

    #[test]
    fn test_load_rejects_unknown_options() {
        let doc = r#"{"agents": {"x": {"enabled": true, "bogus_option": 1}}}"#;
        let result = load_agent_configs(doc);
        assert!(matches!(result, Err(MarketpulseError::Config(_))));
    }

    #[test]
    fn test_pipeline_config_clamping() {
        let config = PipelineConfig::new()
            .with_max_delay_ms(1_000_000)
            .clamped();
        assert_eq!(config.max_delay_ms, MAX_BACKOFF_CEILING_MS);
    }

    #[test]
    fn test_pipeline_config_zero_concurrency_raised() {
        let config = PipelineConfig::new().with_max_concurrency(0);
        assert_eq!(config.max_concurrency, 1);
    }
}
