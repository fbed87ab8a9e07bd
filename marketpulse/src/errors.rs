//! Error types for the marketpulse orchestration layer.
//!
//! Agent-local faults are never surfaced as process-level errors; the
//! coordinator converts them into failed execution results. The variants
//! here cover everything else: configuration problems, fail-fast breaker
//! rejections, and persistence failures (the only class that is fatal to
//! a pipeline run).

use std::time::Duration;
use thiserror::Error;

/// The main error type for marketpulse operations.
#[derive(Debug, Error)]
pub enum MarketpulseError {
    /// Configuration could not be loaded or is structurally invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An agent failed its load-time validation check.
    #[error("Agent '{agent}' failed validation: {reason}")]
    Validation {
        /// Name of the agent that failed validation.
        agent: String,
        /// Why validation failed.
        reason: String,
    },

    /// An execution exceeded its configured timeout.
    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    /// A call was rejected because the dependency's circuit is open.
    #[error("Circuit breaker for dependency '{dependency}' is open")]
    CircuitOpen {
        /// The dependency key whose breaker rejected the call.
        dependency: String,
    },

    /// All retry attempts were consumed without a success.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total attempts made (initial plus retries).
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },

    /// A cooperative shutdown was requested.
    #[error("Shutdown requested: {0}")]
    ShuttingDown(String),

    /// The state store failed. Fatal to the current pipeline run.
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by [`StateStore`](crate::store::StateStore) backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not read or write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// An error produced inside an agent's `execute` implementation.
///
/// These never escape the coordinator; they are captured and folded into
/// a failed [`ExecutionResult`](crate::result::ExecutionResult).
#[derive(Debug, Error)]
pub enum AgentError {
    /// A free-form failure message.
    #[error("{0}")]
    Message(String),

    /// A required adapter parameter was missing from the configuration.
    #[error("Missing parameter '{0}'")]
    MissingParam(String),

    /// A call to an upstream service failed.
    #[error("Upstream call failed: {0}")]
    Upstream(String),
}

impl From<String> for AgentError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for AgentError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}
