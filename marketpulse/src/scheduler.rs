//! Fixed-interval pipeline trigger.
//!
//! Scheduled and on-demand runs enter through the same
//! [`Coordinator::run_pipeline`] entry point; the scheduler only decides
//! when the next run starts. The shutdown signal is honored between
//! runs, never mid-run.

use crate::coordinator::Coordinator;
use crate::errors::MarketpulseError;
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

/// Drives a coordinator on a fixed interval.
#[derive(Debug)]
pub struct Scheduler {
    coordinator: Arc<Coordinator>,
    interval: Duration,
    shutdown: ShutdownSignal,
}

impl Scheduler {
    /// Creates a scheduler over a coordinator.
    ///
    /// The scheduler shares the coordinator's shutdown signal so one
    /// request stops both.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>, interval: Duration) -> Self {
        let shutdown = coordinator.shutdown_handle();
        Self {
            coordinator,
            interval,
            shutdown,
        }
    }

    /// Runs the pipeline repeatedly until shutdown is requested.
    ///
    /// Returns the number of completed runs. Errors only on a fatal
    /// (state-store) failure, like the coordinator itself.
    pub async fn run(&self) -> Result<usize, MarketpulseError> {
        let mut runs = 0;
        loop {
            if self.shutdown.is_requested() {
                break;
            }

            let report = self.coordinator.run_pipeline().await?;
            runs += 1;
            info!(
                run_id = %report.run_id,
                runs,
                success = report.is_success(),
                "Scheduled run finished"
            );

            let mut waited = Duration::ZERO;
            while waited < self.interval && !self.shutdown.is_requested() {
                tokio::time::sleep(SHUTDOWN_POLL.min(self.interval - waited)).await;
                waited += SHUTDOWN_POLL;
            }
        }

        info!(
            runs,
            reason = self.shutdown.reason().as_deref().unwrap_or("unspecified"),
            "Scheduler stopped"
        );
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, PipelineConfig};
    use crate::registry::AgentRegistry;
    use crate::result::Stage;
    use crate::store::MemoryStore;
    use crate::testing::SuccessAgent;
    use serde_json::json;

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                Stage::Collection,
                Arc::new(SuccessAgent::new("tick", json!(1))),
                AgentConfig::new("tick"),
            )
            .unwrap();
        let coordinator = Arc::new(Coordinator::new(
            PipelineConfig::new().with_retry_jitter(false),
            registry,
            Arc::new(MemoryStore::new()),
        ));

        let scheduler = Scheduler::new(Arc::clone(&coordinator), Duration::from_secs(3600));
        let shutdown = coordinator.shutdown_handle();

        // Stop after the first run; the interval wait polls the signal.
        let runner = tokio::spawn(async move { scheduler.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.request("test complete");

        let runs = runner.await.unwrap().unwrap();
        assert_eq!(runs, 1);
    }

    #[tokio::test]
    async fn test_scheduler_skips_run_when_already_shut_down() {
        let coordinator = Arc::new(Coordinator::new(
            PipelineConfig::new(),
            AgentRegistry::new(),
            Arc::new(MemoryStore::new()),
        ));
        coordinator.shutdown_handle().request("stopped before start");

        let scheduler = Scheduler::new(coordinator, Duration::from_millis(10));
        let runs = scheduler.run().await.unwrap();
        assert_eq!(runs, 0);
    }
}
