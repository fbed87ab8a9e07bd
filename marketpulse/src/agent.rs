//! The agent contract: one uniform shape for every collection,
//! processing, and publishing step.
//!
//! Agents return plain `Result`s; the coordinator owns timeout
//! enforcement, retries, breaker admission, and the conversion of any
//! fault (including panics) into a failed execution result.

use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::result::Stage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

/// Input handed to an agent for one invocation.
///
/// Cloneable so retries re-invoke with identical input.
#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    /// The stage this invocation belongs to.
    pub stage: Option<Stage>,
    /// Successful payloads from the previous stage, ordered by agent name.
    pub upstream: Vec<serde_json::Value>,
    /// The agent's own configured parameters.
    pub params: HashMap<String, serde_json::Value>,
}

impl AgentInput {
    /// Creates an input for a stage with upstream payloads and params.
    #[must_use]
    pub fn new(
        stage: Stage,
        upstream: Vec<serde_json::Value>,
        params: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            stage: Some(stage),
            upstream,
            params,
        }
    }

    /// Fetches a parameter by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Fetches a required string parameter, erroring if absent.
    pub fn required_str_param(&self, key: &str) -> Result<&str, AgentError> {
        self.params
            .get(key)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AgentError::MissingParam(key.to_string()))
    }
}

/// Trait implemented by every pipeline agent.
///
/// Registered under a stable name that doubles as the persisted-state key;
/// the breaker dependency key comes from configuration, not from here.
#[async_trait]
pub trait Agent: Send + Sync + Debug {
    /// The agent's stable, unique name.
    fn name(&self) -> &str;

    /// Checks the agent's configuration before its first invocation.
    ///
    /// An agent failing validation is marked disabled and excluded from
    /// every pipeline run until configuration changes.
    fn validate(&self, config: &AgentConfig) -> bool {
        let _ = config;
        true
    }

    /// Performs one unit of work.
    ///
    /// The configured timeout is enforced by the caller; implementations
    /// should simply do their work and return.
    async fn execute(&self, input: AgentInput) -> Result<serde_json::Value, AgentError>;
}
