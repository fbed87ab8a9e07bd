//! Execution results and per-run reports.
//!
//! An [`ExecutionResult`] is produced exactly once per agent invocation.
//! Stage and pipeline reports aggregate them; the payload is opaque to the
//! coordinator and only interpreted by downstream agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// The three ordered phases of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Gather content from external sources.
    Collection,
    /// Run analytical transforms over collected content.
    Processing,
    /// Distribute resulting artifacts to external channels.
    Publishing,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ORDERED: [Self; 3] = [Self::Collection, Self::Processing, Self::Publishing];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Processing => write!(f, "processing"),
            Self::Publishing => write!(f, "publishing"),
        }
    }
}

/// The outcome of a single agent invocation.
///
/// Constructors uphold the result invariant: a failure always carries an
/// error and never a payload; a success never carries an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Name of the agent that produced this result.
    pub agent: String,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Opaque payload (successful invocations only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error description (failed invocations only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// How long the invocation took, in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Creates a successful result with a payload.
    #[must_use]
    pub fn success(
        agent: impl Into<String>,
        payload: serde_json::Value,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            agent: agent.into(),
            success: true,
            payload: Some(payload),
            error: None,
            started_at,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Creates a failed result with an error description.
    #[must_use]
    pub fn failure(
        agent: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            agent: agent.into(),
            success: false,
            payload: None,
            error: Some(error.into()),
            started_at,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Aggregate outcome of one stage within a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Which stage this report covers.
    pub stage: Stage,
    /// Final (post-retry) result for every agent that was attempted.
    pub results: Vec<ExecutionResult>,
    /// Agents skipped because they were disabled or failed validation.
    pub skipped: Vec<String>,
}

impl StageReport {
    /// Creates an empty report for a stage that attempted no agents.
    #[must_use]
    pub fn empty(stage: Stage) -> Self {
        Self {
            stage,
            results: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Number of agents attempted in this stage.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// Number of agents that succeeded.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of agents that failed after exhausting retries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Successful payloads ordered by agent name.
    ///
    /// This is the stage's aggregate output, fed to the next stage.
    #[must_use]
    pub fn successful_payloads(&self) -> Vec<serde_json::Value> {
        let mut successes: Vec<&ExecutionResult> =
            self.results.iter().filter(|r| r.success).collect();
        successes.sort_by(|a, b| a.agent.cmp(&b.agent));
        successes
            .into_iter()
            .filter_map(|r| r.payload.clone())
            .collect()
    }

    /// Results for agents that failed, for reporting.
    #[must_use]
    pub fn failures(&self) -> Vec<&ExecutionResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    /// True when agents were attempted but none succeeded.
    ///
    /// A degraded stage still lets downstream stages run; degradation is
    /// surfaced in the pipeline report instead of aborting the run.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.results.is_empty() && self.success_count() == 0
    }
}

/// Per-run totals across all three stages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total agent invocations attempted (post-retry outcomes).
    pub attempted: usize,
    /// Invocations that succeeded.
    pub succeeded: usize,
    /// Invocations that failed after exhausting retries.
    pub failed: usize,
    /// Agents skipped because they were disabled.
    pub skipped_disabled: usize,
}

/// The complete outcome of one pipeline run.
///
/// A report is always produced, regardless of partial failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique identifier for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Collection stage outcome.
    pub collection: StageReport,
    /// Processing stage outcome.
    pub processing: StageReport,
    /// Publishing stage outcome.
    pub publishing: StageReport,
    /// Totals across all stages.
    pub summary: RunSummary,
}

impl PipelineReport {
    /// Computes the run summary from the three stage reports.
    #[must_use]
    pub fn summarize(
        collection: &StageReport,
        processing: &StageReport,
        publishing: &StageReport,
    ) -> RunSummary {
        let stages = [collection, processing, publishing];
        RunSummary {
            attempted: stages.iter().map(|s| s.attempted()).sum(),
            succeeded: stages.iter().map(|s| s.success_count()).sum(),
            failed: stages.iter().map(|s| s.failure_count()).sum(),
            skipped_disabled: stages.iter().map(|s| s.skipped.len()).sum(),
        }
    }

    /// Whether the run produced anything to work with.
    ///
    /// Only a collection stage where every attempted agent failed counts
    /// as total failure; any partial success proceeds.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.collection.is_degraded()
    }

    /// Stages that attempted agents but produced zero successes.
    #[must_use]
    pub fn degraded_stages(&self) -> Vec<Stage> {
        [&self.collection, &self.processing, &self.publishing]
            .into_iter()
            .filter(|s| s.is_degraded())
            .map(|s| s.stage)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn success(agent: &str, value: serde_json::Value) -> ExecutionResult {
        ExecutionResult::success(agent, value, Utc::now(), Duration::from_millis(5))
    }

    fn failure(agent: &str) -> ExecutionResult {
        ExecutionResult::failure(agent, "boom", Utc::now(), Duration::from_millis(5))
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Collection.to_string(), "collection");
        assert_eq!(Stage::Publishing.to_string(), "publishing");
    }

    #[test]
    fn test_result_invariants() {
        let ok = success("a", json!(1));
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert!(ok.payload.is_some());

        let bad = failure("b");
        assert!(!bad.success);
        assert!(bad.payload.is_none());
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_successful_payloads_ordered_by_name() {
        let report = StageReport {
            stage: Stage::Collection,
            results: vec![
                success("zeta", json!("z")),
                failure("mid"),
                success("alpha", json!("a")),
            ],
            skipped: vec![],
        };

        assert_eq!(report.successful_payloads(), vec![json!("a"), json!("z")]);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_degraded_stage() {
        let report = StageReport {
            stage: Stage::Processing,
            results: vec![failure("x"), failure("y")],
            skipped: vec![],
        };
        assert!(report.is_degraded());

        // A stage with nothing attempted is not degraded.
        assert!(!StageReport::empty(Stage::Processing).is_degraded());
    }

    #[test]
    fn test_summary_and_overall_success() {
        let collection = StageReport {
            stage: Stage::Collection,
            results: vec![success("a", json!(1)), failure("b")],
            skipped: vec!["c".to_string()],
        };
        let processing = StageReport {
            stage: Stage::Processing,
            results: vec![failure("p")],
            skipped: vec![],
        };
        let publishing = StageReport::empty(Stage::Publishing);

        let summary = PipelineReport::summarize(&collection, &processing, &publishing);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped_disabled, 1);

        let report = PipelineReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 10,
            collection,
            processing,
            publishing,
            summary,
        };
        assert!(report.is_success());
        assert_eq!(report.degraded_stages(), vec![Stage::Processing]);
    }

    #[test]
    fn test_total_failure_when_all_collectors_fail() {
        let collection = StageReport {
            stage: Stage::Collection,
            results: vec![failure("a"), failure("b")],
            skipped: vec![],
        };
        let processing = StageReport::empty(Stage::Processing);
        let publishing = StageReport::empty(Stage::Publishing);
        let summary = PipelineReport::summarize(&collection, &processing, &publishing);

        let report = PipelineReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 10,
            collection,
            processing,
            publishing,
            summary,
        };
        assert!(!report.is_success());
    }
}
