//! Health summary types for the observability surface.
//!
//! The coordinator assembles these from persisted state and breaker
//! snapshots; rendering is left entirely to an external dashboard or
//! monitoring layer.

use crate::breaker::BreakerSnapshot;
use crate::result::Stage;
use crate::state::AgentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known health of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    /// Agent name.
    pub name: String,
    /// The stage the agent is registered under; `None` for persisted
    /// state whose agent is no longer registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Whether the agent is currently eligible to run.
    pub enabled: bool,
    /// Last completed outcome, if the agent has ever run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<AgentStatus>,
    /// When the agent last succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    /// Whether an invocation is currently outstanding.
    pub in_flight: bool,
}

/// Point-in-time health of the whole system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    /// When the summary was assembled.
    pub generated_at: DateTime<Utc>,
    /// Per-agent health, ordered by name.
    pub agents: Vec<AgentHealth>,
    /// Per-dependency breaker state, ordered by dependency key.
    pub breakers: Vec<BreakerSnapshot>,
}

impl HealthSummary {
    /// Agents whose last outcome was a failure or interruption.
    #[must_use]
    pub fn unhealthy_agents(&self) -> Vec<&AgentHealth> {
        self.agents
            .iter()
            .filter(|a| {
                matches!(
                    a.last_status,
                    Some(AgentStatus::Failed | AgentStatus::Interrupted)
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(name: &str, status: Option<AgentStatus>) -> AgentHealth {
        AgentHealth {
            name: name.to_string(),
            stage: Some(Stage::Collection),
            enabled: true,
            last_status: status,
            last_success_at: None,
            in_flight: false,
        }
    }

    #[test]
    fn test_unhealthy_agents() {
        let summary = HealthSummary {
            generated_at: Utc::now(),
            agents: vec![
                health("ok", Some(AgentStatus::Success)),
                health("bad", Some(AgentStatus::Failed)),
                health("crashed", Some(AgentStatus::Interrupted)),
                health("new", None),
            ],
            breakers: vec![],
        };

        let unhealthy: Vec<&str> = summary
            .unhealthy_agents()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(unhealthy, vec!["bad", "crashed"]);
    }
}
