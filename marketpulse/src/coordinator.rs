//! The pipeline coordinator.
//!
//! Runs the three-stage pipeline (collection, processing, publishing),
//! executing every enabled agent within a stage concurrently under a
//! bounded worker limit. The coordinator owns all writes to the ledger
//! and the state store: agents only return results, and every agent
//! fault — errors, panics, timeouts, breaker rejections — is folded into
//! a failed execution result rather than propagating. Only a state-store
//! failure aborts a run.

use crate::agent::{Agent, AgentInput};
use crate::breaker::{BreakerConfig, BreakerRegistry, BreakerSnapshot, CircuitBreaker};
use crate::config::{AgentConfig, PipelineConfig};
use crate::errors::MarketpulseError;
use crate::health::{AgentHealth, HealthSummary};
use crate::ledger::{ExecutionLedger, LedgerEntry};
use crate::registry::AgentRegistry;
use crate::result::{ExecutionResult, PipelineReport, Stage, StageReport};
use crate::retry::RetryPolicy;
use crate::shutdown::ShutdownSignal;
use crate::state::AgentState;
use crate::store::StateStore;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one raced invocation attempt, before retry bookkeeping.
enum AttemptOutcome {
    Success(serde_json::Value),
    Failure(String),
}

/// Orchestrates staged agent execution and owns the ledger and state
/// store on the agents' behalf.
#[derive(Debug)]
pub struct Coordinator {
    config: PipelineConfig,
    registry: AgentRegistry,
    store: Arc<dyn StateStore>,
    ledger: Mutex<ExecutionLedger>,
    breakers: BreakerRegistry,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    shutdown: ShutdownSignal,
}

impl Coordinator {
    /// Creates a coordinator over a populated registry and a store.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        registry: AgentRegistry,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let config = config.clamped();
        let retry = RetryPolicy::from_config(&config);
        let breakers = BreakerRegistry::new(BreakerConfig::new(
            config.breaker_failure_threshold,
            Duration::from_secs(config.breaker_cooldown_secs),
        ));
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

        Self {
            config,
            registry,
            store,
            ledger: Mutex::new(ExecutionLedger::new()),
            breakers,
            retry,
            semaphore,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// A handle for requesting cooperative shutdown between stages.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// The breaker registry, for manual resets.
    #[must_use]
    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Reconciles executions interrupted by a crash.
    ///
    /// Scans persisted state for in-flight markers left set by a previous
    /// process; each is cleared and one synthetic interrupted ledger
    /// entry is recorded. Recovery never re-invokes an agent, and running
    /// it twice without an intervening pipeline run reconciles nothing
    /// the second time. Returns the number of agents reconciled.
    pub async fn recover(&self) -> Result<usize, MarketpulseError> {
        let states = self.store.load_all().await?;
        let mut interrupted: Vec<(String, AgentState)> = states
            .into_iter()
            .filter(|(_, state)| state.in_flight)
            .collect();
        interrupted.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, state) in &interrupted {
            warn!(agent = %name, "In-flight marker found at startup, reconciling interrupted execution");
            self.store
                .put_state(name, &state.clone().reconciled())
                .await?;
            let result = ExecutionResult::failure(
                name.clone(),
                "interrupted by process restart",
                Utc::now(),
                Duration::ZERO,
            );
            self.record_entry(LedgerEntry::interrupted(
                self.registry.stage_of(name),
                result,
            ))
            .await?;
        }

        if interrupted.is_empty() {
            debug!("No interrupted executions found at startup");
        } else {
            info!(count = interrupted.len(), "Startup recovery complete");
        }
        Ok(interrupted.len())
    }

    /// Runs the full collection → processing → publishing pipeline.
    ///
    /// Each stage's successful payloads feed the next; a stage with zero
    /// successes degrades the run but never blocks downstream stages. A
    /// report is always returned — only a state-store failure errors.
    pub async fn run_pipeline(&self) -> Result<PipelineReport, MarketpulseError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(%run_id, "Starting pipeline run");

        let mut halted = false;
        let collection = self
            .stage_unless_halted(Stage::Collection, Vec::new(), &mut halted)
            .await?;
        let processing = self
            .stage_unless_halted(Stage::Processing, collection.successful_payloads(), &mut halted)
            .await?;
        let publishing = self
            .stage_unless_halted(Stage::Publishing, processing.successful_payloads(), &mut halted)
            .await?;

        let removed = self.ledger.lock().evict(
            self.config.ledger_cap,
            ChronoDuration::seconds(self.config.ledger_max_age_secs as i64),
        );
        if removed > 0 {
            debug!(removed, "Evicted ledger entries");
        }

        let summary = PipelineReport::summarize(&collection, &processing, &publishing);
        let report = PipelineReport {
            run_id,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            collection,
            processing,
            publishing,
            summary,
        };

        info!(
            %run_id,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped_disabled = summary.skipped_disabled,
            duration_ms = report.duration_ms,
            "Pipeline run complete"
        );
        if !report.is_success() {
            warn!(%run_id, "Every collection agent failed, nothing was collected");
        }
        for stage in report.degraded_stages() {
            warn!(%run_id, %stage, "Stage ran degraded with zero successes");
        }

        Ok(report)
    }

    /// Runs one stage: every runnable agent concurrently, bounded by the
    /// worker limit. Returns when all have settled; sibling failures do
    /// not abort the stage.
    pub async fn run_stage(
        &self,
        stage: Stage,
        upstream: Vec<serde_json::Value>,
    ) -> Result<StageReport, MarketpulseError> {
        let runnable = self.registry.runnable_for(stage);
        let skipped = self.registry.skipped_for(stage);
        if runnable.is_empty() {
            debug!(%stage, "No runnable agents for stage");
            return Ok(StageReport {
                stage,
                results: Vec::new(),
                skipped,
            });
        }

        info!(%stage, agents = runnable.len(), "Running stage");
        let tasks = runnable.into_iter().map(|(agent, config)| {
            let input = AgentInput::new(stage, upstream.clone(), config.params.clone());
            let semaphore = Arc::clone(&self.semaphore);
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| MarketpulseError::Internal("worker pool closed".to_string()))?;
                self.invoke_agent(stage, agent, &config, input).await
            }
        });

        let settled = futures::future::join_all(tasks).await;
        let mut results = Vec::with_capacity(settled.len());
        for outcome in settled {
            results.push(outcome?);
        }
        results.sort_by(|a, b| a.agent.cmp(&b.agent));

        let report = StageReport {
            stage,
            results,
            skipped,
        };
        info!(
            %stage,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            skipped = report.skipped.len(),
            "Stage settled"
        );
        Ok(report)
    }

    /// One agent invocation: in-flight marking, breaker admission,
    /// timeout-raced attempts with backoff, and final state persistence.
    async fn invoke_agent(
        &self,
        stage: Stage,
        agent: Arc<dyn Agent>,
        config: &AgentConfig,
        input: AgentInput,
    ) -> Result<ExecutionResult, MarketpulseError> {
        let name = config.name.clone();
        let breaker: Option<Arc<CircuitBreaker>> = config
            .depends_on
            .as_deref()
            .map(|dependency| self.breakers.handle(dependency));

        let prior = self.store.get_state(&name).await?;
        let in_flight = AgentState::started(prior);
        self.store.put_state(&name, &in_flight).await?;

        let max_attempts = config.max_retries + 1;
        let mut last_result: Option<ExecutionResult> = None;

        for attempt in 0..max_attempts {
            // Fail-fast on an open circuit without consuming retry budget.
            if let Some(b) = &breaker {
                if !b.admit() {
                    let rejection = MarketpulseError::CircuitOpen {
                        dependency: b.dependency().to_string(),
                    };
                    debug!(agent = %name, attempt, %rejection, "Call rejected by circuit breaker");
                    let result = ExecutionResult::failure(
                        name.clone(),
                        rejection.to_string(),
                        Utc::now(),
                        Duration::ZERO,
                    );
                    self.record_entry(LedgerEntry::attempt(stage, attempt, result.clone()))
                        .await?;
                    last_result = Some(result);
                    break;
                }
            }

            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome = Self::race_attempt(Arc::clone(&agent), input.clone(), config.timeout()).await;
            let elapsed = clock.elapsed();

            let result = match outcome {
                AttemptOutcome::Success(payload) => {
                    if let Some(b) = &breaker {
                        b.record_success();
                    }
                    ExecutionResult::success(name.clone(), payload, started_at, elapsed)
                }
                AttemptOutcome::Failure(error) => {
                    if let Some(b) = &breaker {
                        b.record_failure();
                    }
                    ExecutionResult::failure(name.clone(), error, started_at, elapsed)
                }
            };

            self.record_entry(LedgerEntry::attempt(stage, attempt, result.clone()))
                .await?;
            let succeeded = result.success;
            last_result = Some(result);
            if succeeded {
                break;
            }

            if attempt + 1 < max_attempts {
                let delay = self.retry.delay_for(attempt);
                debug!(
                    agent = %name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }

        // The loop always records at least one attempt.
        let final_result = last_result.unwrap_or_else(|| {
            ExecutionResult::failure(
                name.clone(),
                "no attempts were made",
                Utc::now(),
                Duration::ZERO,
            )
        });

        self.store
            .put_state(&name, &in_flight.settled(final_result.success))
            .await?;

        if final_result.success {
            info!(agent = %name, %stage, duration_ms = final_result.duration_ms, "Agent succeeded");
        } else {
            warn!(
                agent = %name,
                %stage,
                error = final_result.error.as_deref().unwrap_or("unknown"),
                "Agent failed for this run"
            );
        }
        Ok(final_result)
    }

    /// Races one execute call against the configured deadline on its own
    /// task, so panics are captured and a hung agent cannot stall the
    /// stage.
    async fn race_attempt(
        agent: Arc<dyn Agent>,
        input: AgentInput,
        timeout: Duration,
    ) -> AttemptOutcome {
        let mut handle = tokio::spawn(async move { agent.execute(input).await });

        tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(payload)) => AttemptOutcome::Success(payload),
                Ok(Err(error)) => AttemptOutcome::Failure(error.to_string()),
                Err(join_error) => {
                    AttemptOutcome::Failure(format!("agent panicked: {join_error}"))
                }
            },
            () = tokio::time::sleep(timeout) => {
                handle.abort();
                AttemptOutcome::Failure(
                    MarketpulseError::Timeout(timeout).to_string(),
                )
            }
        }
    }

    async fn stage_unless_halted(
        &self,
        stage: Stage,
        upstream: Vec<serde_json::Value>,
        halted: &mut bool,
    ) -> Result<StageReport, MarketpulseError> {
        if !*halted && self.shutdown.is_requested() {
            *halted = true;
            info!(
                %stage,
                reason = self.shutdown.reason().as_deref().unwrap_or("unspecified"),
                "Stopping before stage, shutdown requested"
            );
        }
        if *halted {
            return Ok(StageReport::empty(stage));
        }
        self.run_stage(stage, upstream).await
    }

    async fn record_entry(&self, entry: LedgerEntry) -> Result<(), MarketpulseError> {
        {
            self.ledger.lock().push(entry.clone());
        }
        self.store.append_entry(&entry).await?;
        Ok(())
    }

    /// Snapshots of every circuit breaker, for the observability surface.
    #[must_use]
    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.snapshots()
    }

    /// A page of ledger entries, newest first.
    #[must_use]
    pub fn ledger_page(&self, offset: usize, limit: usize) -> Vec<LedgerEntry> {
        self.ledger.lock().page(offset, limit)
    }

    /// Number of ledger entries currently retained.
    #[must_use]
    pub fn ledger_len(&self) -> usize {
        self.ledger.lock().len()
    }

    /// All retained ledger entries for one agent, in invocation order.
    #[must_use]
    pub fn ledger_entries_for(&self, agent: &str) -> Vec<LedgerEntry> {
        self.ledger.lock().entries_for(agent)
    }

    /// Per-agent health plus breaker state, for an external dashboard.
    pub async fn health_summary(&self) -> Result<HealthSummary, MarketpulseError> {
        let mut states = self.store.load_all().await?;

        let mut agents: Vec<AgentHealth> = self
            .registry
            .names()
            .into_iter()
            .map(|name| {
                let state = states.remove(&name);
                AgentHealth {
                    stage: self.registry.stage_of(&name),
                    enabled: self.registry.is_runnable(&name),
                    last_status: state.as_ref().map(|s| s.last_status),
                    last_success_at: state.as_ref().and_then(|s| s.last_success_at),
                    in_flight: state.as_ref().map_or(false, |s| s.in_flight),
                    name,
                }
            })
            .collect();

        // Persisted state can outlive registration; keep those visible.
        let mut stale: Vec<(String, AgentState)> = states.into_iter().collect();
        stale.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, state) in stale {
            agents.push(AgentHealth {
                name,
                stage: None,
                enabled: false,
                last_status: Some(state.last_status),
                last_success_at: state.last_success_at,
                in_flight: state.in_flight,
            });
        }
        agents.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(HealthSummary {
            generated_at: Utc::now(),
            agents,
            breakers: self.breakers.snapshots(),
        })
    }
}
