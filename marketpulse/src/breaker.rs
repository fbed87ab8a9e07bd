//! Per-dependency circuit breaker.
//!
//! Breakers are keyed by dependency name rather than by agent, so every
//! agent calling the same downstream service shares fault state. An open
//! circuit converts slow failures (multi-second network timeouts) into
//! near-instant rejections until the dependency recovers.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The operating mode of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    Closed,
    /// Calls are rejected fail-fast until the cool-down elapses.
    Open,
    /// Exactly one trial call is allowed through.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration for a circuit breaker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the circuit open.
    pub failure_threshold: u32,
    /// How long an open circuit waits before allowing a trial call.
    pub cool_down: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    /// Creates a config with the given threshold and cool-down.
    #[must_use]
    pub fn new(failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cool_down,
        }
    }
}

/// Point-in-time view of one breaker, for the observability surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    /// Dependency key this breaker protects.
    pub dependency: String,
    /// Current mode.
    pub state: CircuitState,
    /// Consecutive failure count.
    pub consecutive_failures: u32,
    /// Wall-clock time of the most recent failure.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Configured failure threshold.
    pub failure_threshold: u32,
    /// Configured cool-down in seconds.
    pub cool_down_secs: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    /// Set while a half-open trial call is outstanding.
    trial_in_flight: bool,
}

/// Fault-isolation state machine for one named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    dependency: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for the given dependency key.
    #[must_use]
    pub fn new(dependency: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            dependency: dependency.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                last_failure_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// The dependency key this breaker protects.
    #[must_use]
    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    /// Asks the breaker whether a call may proceed.
    ///
    /// Returns `true` to admit the call. An open circuit past its
    /// cool-down transitions to half-open and admits exactly one trial;
    /// further callers are rejected until that trial settles.
    pub fn admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.cool_down);
                if cooled {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    info!(dependency = %self.dependency, "Circuit half-open, admitting trial call");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records a successful call outcome.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_in_flight = false;
                info!(dependency = %self.dependency, "Circuit closed after successful trial");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call outcome.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure_at = Some(Utc::now());
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                warn!(dependency = %self.dependency, "Trial call failed, circuit reopened");
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        dependency = %self.dependency,
                        failures = inner.consecutive_failures,
                        "Failure threshold reached, circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// The current mode.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Produces a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            dependency: self.dependency.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
            failure_threshold: self.config.failure_threshold,
            cool_down_secs: self.config.cool_down.as_secs(),
        }
    }

    /// Manually resets the breaker to closed.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.last_failure_at = None;
        inner.trial_in_flight = false;
        info!(dependency = %self.dependency, "Circuit manually reset");
    }
}

/// Registry of breakers keyed by dependency name.
///
/// Agents naming the same dependency share a breaker instance.
#[derive(Debug)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Creates a registry whose breakers use the given config.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Returns the breaker for a dependency, creating it on first use.
    #[must_use]
    pub fn handle(&self, dependency: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(dependency.to_string(), self.config))
            })
            .clone()
    }

    /// Snapshots of every breaker, sorted by dependency key.
    #[must_use]
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> = self
            .breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.dependency.cmp(&b.dependency));
        snapshots
    }

    /// Resets every breaker to closed.
    pub fn reset_all(&self) {
        for entry in &self.breakers {
            entry.value().reset();
        }
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
