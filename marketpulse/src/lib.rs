//! # Marketpulse
//!
//! A staged agent pipeline for collecting content about tracked
//! companies, running analytical transforms over it, and distributing
//! the resulting artifacts to publishing channels.
//!
//! The crate is the orchestration layer: concrete collectors, analyzers,
//! and publishers are thin adapters implementing the [`agent::Agent`]
//! contract. The coordinator provides:
//!
//! - **Staged execution**: collection → processing → publishing, agents
//!   within a stage running concurrently under a bounded worker limit
//! - **Fault isolation**: per-dependency circuit breakers shared by every
//!   agent calling the same downstream service
//! - **Retry with backoff**: coordinator-driven exponential backoff with
//!   per-agent retry budgets and coordinator-enforced timeouts
//! - **Crash recovery**: persisted per-agent state with in-flight markers
//!   reconciled at startup
//! - **Bounded history**: an append-only execution ledger evicted by cap
//!   and age after every run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketpulse::prelude::*;
//! use std::sync::Arc;
//!
//! let mut registry = AgentRegistry::new();
//! registry.register(Stage::Collection, Arc::new(my_collector), config)?;
//!
//! let coordinator = Coordinator::new(
//!     PipelineConfig::default(),
//!     registry,
//!     Arc::new(JsonFileStore::open("data/")?),
//! );
//! coordinator.recover().await?;
//! let report = coordinator.run_pipeline().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]

pub mod agent;
pub mod breaker;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod health;
pub mod ledger;
pub mod observability;
pub mod registry;
pub mod result;
pub mod retry;
pub mod scheduler;
pub mod shutdown;
pub mod state;
pub mod store;
pub mod testing;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::{Agent, AgentInput};
    pub use crate::breaker::{
        BreakerConfig, BreakerRegistry, BreakerSnapshot, CircuitBreaker, CircuitState,
    };
    pub use crate::config::{load_agent_configs, AgentConfig, PipelineConfig};
    pub use crate::coordinator::Coordinator;
    pub use crate::errors::{AgentError, MarketpulseError, StoreError};
    pub use crate::health::{AgentHealth, HealthSummary};
    pub use crate::ledger::{ExecutionLedger, LedgerEntry, LedgerEntryKind};
    pub use crate::registry::AgentRegistry;
    pub use crate::result::{
        ExecutionResult, PipelineReport, RunSummary, Stage, StageReport,
    };
    pub use crate::retry::RetryPolicy;
    pub use crate::scheduler::Scheduler;
    pub use crate::shutdown::ShutdownSignal;
    pub use crate::state::{AgentState, AgentStatus};
    pub use crate::store::{JsonFileStore, MemoryStore, StateStore};
}
