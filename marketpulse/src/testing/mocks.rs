//! Mock agents for exercising the coordinator.

use crate::agent::{Agent, AgentInput};
use crate::config::AgentConfig;
use crate::errors::AgentError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// An agent that always succeeds with a fixed payload.
#[derive(Debug)]
pub struct SuccessAgent {
    name: String,
    payload: serde_json::Value,
    calls: AtomicU32,
}

impl SuccessAgent {
    /// Creates a success agent with the given payload.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of times the agent was invoked.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for SuccessAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// An agent that always fails with an error.
#[derive(Debug)]
pub struct FailingAgent {
    name: String,
    calls: AtomicU32,
}

impl FailingAgent {
    /// Creates an always-failing agent.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of times the agent was invoked.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AgentError::Upstream("simulated failure".to_string()))
    }
}

/// An agent that fails a fixed number of times, then succeeds.
#[derive(Debug)]
pub struct FlakyAgent {
    name: String,
    failures_before_success: u32,
    payload: serde_json::Value,
    calls: AtomicU32,
}

impl FlakyAgent {
    /// Creates an agent that fails `failures_before_success` times first.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        failures_before_success: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            failures_before_success,
            payload,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of times the agent was invoked.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for FlakyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            Err(AgentError::Upstream(format!("flaky failure {call}")))
        } else {
            Ok(self.payload.clone())
        }
    }
}

/// An agent whose execute panics, for fault-capture tests.
#[derive(Debug)]
pub struct PanickingAgent {
    name: String,
}

impl PanickingAgent {
    /// Creates a panicking agent.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for PanickingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        panic!("intentional panic from {}", self.name);
    }
}

/// An agent that sleeps before succeeding, for timeout tests.
#[derive(Debug)]
pub struct SlowAgent {
    name: String,
    delay: Duration,
}

impl SlowAgent {
    /// Creates an agent that sleeps for `delay` before returning.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Agent for SlowAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        tokio::time::sleep(self.delay).await;
        Ok(serde_json::json!({"slow": true}))
    }
}

/// An agent that rejects any configuration, for validation tests.
#[derive(Debug)]
pub struct InvalidConfigAgent {
    name: String,
}

impl InvalidConfigAgent {
    /// Creates an agent that fails validation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for InvalidConfigAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, _config: &AgentConfig) -> bool {
        false
    }

    async fn execute(&self, _input: AgentInput) -> Result<serde_json::Value, AgentError> {
        Err(AgentError::Message("should never run".to_string()))
    }
}
