//! Bounded, append-only execution history.
//!
//! Every invocation attempt leaves one entry; eviction (cap plus age) is
//! the only deletion path and runs after every pipeline run, so the
//! ledger cannot grow unbounded over long-lived operation. Entries are
//! never mutated after insertion.

use crate::result::{ExecutionResult, Stage};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What kind of record a ledger entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// The outcome of one real invocation attempt.
    Attempt,
    /// Synthetic record written during startup recovery for an agent
    /// that was interrupted mid-execution by a crash.
    Interrupted,
}

/// One record in the execution ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The stage the invocation belonged to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Attempt record or recovery reconciliation.
    pub kind: LedgerEntryKind,
    /// Zero-indexed attempt number within the invocation's retry loop.
    pub attempt: u32,
    /// The execution result this entry mirrors.
    pub result: ExecutionResult,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates an attempt entry.
    #[must_use]
    pub fn attempt(stage: Stage, attempt: u32, result: ExecutionResult) -> Self {
        Self {
            stage: Some(stage),
            kind: LedgerEntryKind::Attempt,
            attempt,
            result,
            recorded_at: Utc::now(),
        }
    }

    /// Creates a synthetic interrupted entry for startup recovery.
    #[must_use]
    pub fn interrupted(stage: Option<Stage>, result: ExecutionResult) -> Self {
        Self {
            stage,
            kind: LedgerEntryKind::Interrupted,
            attempt: 0,
            result,
            recorded_at: Utc::now(),
        }
    }
}

/// In-memory bounded execution history.
///
/// Single-writer: the coordinator serializes all appends and eviction.
#[derive(Debug, Default)]
pub struct ExecutionLedger {
    entries: VecDeque<LedgerEntry>,
}

impl ExecutionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Per-agent entries arrive in invocation order.
    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push_back(entry);
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts entries beyond the cap or older than the maximum age.
    ///
    /// Returns the number of entries removed. This is the only deletion
    /// path.
    pub fn evict(&mut self, cap: usize, max_age: ChronoDuration) -> usize {
        let before = self.entries.len();
        let cutoff = Utc::now() - max_age;

        self.entries.retain(|entry| entry.recorded_at >= cutoff);
        while self.entries.len() > cap {
            self.entries.pop_front();
        }

        before - self.entries.len()
    }

    /// A page of entries, newest first.
    #[must_use]
    pub fn page(&self, offset: usize, limit: usize) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// All entries for one agent, in insertion (invocation) order.
    #[must_use]
    pub fn entries_for(&self, agent: &str) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.result.agent == agent)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn entry(agent: &str) -> LedgerEntry {
        LedgerEntry::attempt(
            Stage::Collection,
            0,
            ExecutionResult::success(agent, json!(null), Utc::now(), Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_push_and_order() {
        let mut ledger = ExecutionLedger::new();
        ledger.push(entry("a"));
        ledger.push(entry("b"));
        ledger.push(entry("a"));

        assert_eq!(ledger.len(), 3);
        let for_a = ledger.entries_for("a");
        assert_eq!(for_a.len(), 2);
        assert!(for_a[0].recorded_at <= for_a[1].recorded_at);
    }

    #[test]
    fn test_evict_by_cap_drops_oldest() {
        let mut ledger = ExecutionLedger::new();
        for i in 0..10 {
            ledger.push(entry(&format!("agent_{i}")));
        }

        let removed = ledger.evict(4, ChronoDuration::hours(24));
        assert_eq!(removed, 6);
        assert_eq!(ledger.len(), 4);
        // Oldest entries went first.
        assert!(ledger.entries_for("agent_0").is_empty());
        assert_eq!(ledger.entries_for("agent_9").len(), 1);
    }

    #[test]
    fn test_evict_by_age() {
        let mut ledger = ExecutionLedger::new();
        let mut old = entry("stale");
        old.recorded_at = Utc::now() - ChronoDuration::hours(30);
        ledger.push(old);
        ledger.push(entry("fresh"));

        let removed = ledger.evict(100, ChronoDuration::hours(24));
        assert_eq!(removed, 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries_for("fresh").len(), 1);
    }

    #[test]
    fn test_page_newest_first() {
        let mut ledger = ExecutionLedger::new();
        for i in 0..5 {
            ledger.push(entry(&format!("agent_{i}")));
        }

        let page = ledger.page(0, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].result.agent, "agent_4");
        assert_eq!(page[1].result.agent, "agent_3");

        let next = ledger.page(2, 2);
        assert_eq!(next[0].result.agent, "agent_2");

        assert!(ledger.page(10, 2).is_empty());
    }
}
