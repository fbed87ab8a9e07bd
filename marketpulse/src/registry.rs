//! Explicit agent registry.
//!
//! Agents are a closed set selected by name at configuration-load time.
//! Registration runs the agent's one-time validation check; an agent that
//! fails it stays registered but is excluded from every run.

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::errors::MarketpulseError;
use crate::result::Stage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct RegisteredAgent {
    agent: Arc<dyn Agent>,
    config: AgentConfig,
    stage: Stage,
    valid: bool,
}

/// Registry mapping stable agent names to instances and their configs.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    entries: BTreeMap<String, RegisteredAgent>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent for a stage with its configuration.
    ///
    /// The configuration's name must match the agent's own name, and
    /// names must be unique across all stages. Validation runs here,
    /// once; the outcome is remembered for the registry's lifetime.
    pub fn register(
        &mut self,
        stage: Stage,
        agent: Arc<dyn Agent>,
        config: AgentConfig,
    ) -> Result<(), MarketpulseError> {
        if agent.name() != config.name {
            return Err(MarketpulseError::Config(format!(
                "agent name '{}' does not match configuration name '{}'",
                agent.name(),
                config.name
            )));
        }
        if self.entries.contains_key(&config.name) {
            return Err(MarketpulseError::Config(format!(
                "duplicate agent name '{}'",
                config.name
            )));
        }

        let config = config.clamped();
        let valid = agent.validate(&config);
        if valid {
            info!(agent = %config.name, %stage, enabled = config.enabled, "Registered agent");
        } else {
            warn!(agent = %config.name, %stage, "Agent failed validation, marked disabled");
        }

        self.entries.insert(
            config.name.clone(),
            RegisteredAgent {
                agent,
                config,
                stage,
                valid,
            },
        );
        Ok(())
    }

    /// Agents eligible to run in a stage: enabled and validated, in name
    /// order.
    #[must_use]
    pub fn runnable_for(&self, stage: Stage) -> Vec<(Arc<dyn Agent>, AgentConfig)> {
        self.entries
            .values()
            .filter(|e| e.stage == stage && e.config.enabled && e.valid)
            .map(|e| (Arc::clone(&e.agent), e.config.clone()))
            .collect()
    }

    /// Names of agents in a stage excluded because they are disabled or
    /// failed validation.
    #[must_use]
    pub fn skipped_for(&self, stage: Stage) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.stage == stage && !(e.config.enabled && e.valid))
            .map(|e| e.config.name.clone())
            .collect()
    }

    /// The stage an agent is registered under, if any.
    #[must_use]
    pub fn stage_of(&self, name: &str) -> Option<Stage> {
        self.entries.get(name).map(|e| e.stage)
    }

    /// The configuration an agent was registered with, if any.
    #[must_use]
    pub fn config_of(&self, name: &str) -> Option<&AgentConfig> {
        self.entries.get(name).map(|e| &e.config)
    }

    /// Whether an agent is currently eligible to run.
    #[must_use]
    pub fn is_runnable(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map_or(false, |e| e.config.enabled && e.valid)
    }

    /// All registered agent names, in name order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no agents are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingAgent, InvalidConfigAgent, SuccessAgent};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_register_and_list_runnable() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                Stage::Collection,
                Arc::new(SuccessAgent::new("news", json!({"items": []}))),
                AgentConfig::new("news"),
            )
            .unwrap();
        registry
            .register(
                Stage::Collection,
                Arc::new(FailingAgent::new("flaky_feed")),
                AgentConfig::new("flaky_feed").disabled(),
            )
            .unwrap();

        let runnable = registry.runnable_for(Stage::Collection);
        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].1.name, "news");
        assert_eq!(registry.skipped_for(Stage::Collection), vec!["flaky_feed"]);
        assert!(registry.runnable_for(Stage::Publishing).is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                Stage::Collection,
                Arc::new(SuccessAgent::new("dup", json!(1))),
                AgentConfig::new("dup"),
            )
            .unwrap();
        let result = registry.register(
            Stage::Processing,
            Arc::new(SuccessAgent::new("dup", json!(2))),
            AgentConfig::new("dup"),
        );
        assert!(matches!(result, Err(MarketpulseError::Config(_))));
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let mut registry = AgentRegistry::new();
        let result = registry.register(
            Stage::Collection,
            Arc::new(SuccessAgent::new("actual", json!(1))),
            AgentConfig::new("configured"),
        );
        assert!(matches!(result, Err(MarketpulseError::Config(_))));
    }

    #[test]
    fn test_failed_validation_excludes_agent() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                Stage::Processing,
                Arc::new(InvalidConfigAgent::new("broken")),
                AgentConfig::new("broken"),
            )
            .unwrap();

        assert!(registry.runnable_for(Stage::Processing).is_empty());
        assert_eq!(registry.skipped_for(Stage::Processing), vec!["broken"]);
        assert!(!registry.is_runnable("broken"));
    }
}
