//! Persisted per-agent state.
//!
//! One record per agent, created on first invocation, updated on every
//! invocation, never deleted. The in-flight flag is set immediately
//! before an invocation and cleared immediately after; a flag still set
//! at startup means the process crashed mid-execution and drives
//! recovery reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The last known outcome for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Last invocation succeeded.
    Success,
    /// Last invocation failed after exhausting retries.
    Failed,
    /// Last invocation was interrupted by a crash and reconciled at
    /// startup.
    Interrupted,
}

/// Durable last-known state for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The last completed outcome.
    pub last_status: AgentStatus,
    /// When the agent last succeeded, if ever.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Set while an invocation is outstanding.
    pub in_flight: bool,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    /// State written immediately before an invocation starts.
    #[must_use]
    pub fn started(previous: Option<Self>) -> Self {
        let previous_success = previous.as_ref().and_then(|p| p.last_success_at);
        Self {
            last_status: previous.map_or(AgentStatus::Failed, |p| p.last_status),
            last_success_at: previous_success,
            in_flight: true,
            updated_at: Utc::now(),
        }
    }

    /// State written after the final (post-retry) outcome.
    #[must_use]
    pub fn settled(self, success: bool) -> Self {
        let now = Utc::now();
        Self {
            last_status: if success {
                AgentStatus::Success
            } else {
                AgentStatus::Failed
            },
            last_success_at: if success {
                Some(now)
            } else {
                self.last_success_at
            },
            in_flight: false,
            updated_at: now,
        }
    }

    /// State written during startup recovery for an interrupted agent.
    #[must_use]
    pub fn reconciled(self) -> Self {
        Self {
            last_status: AgentStatus::Interrupted,
            last_success_at: self.last_success_at,
            in_flight: false,
            updated_at: Utc::now(),
        }
    }
}
