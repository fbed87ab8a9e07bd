//! Persistence boundary for agent state and the durable ledger stream.
//!
//! The coordinator writes through this interface and assumes nothing
//! about the backing engine. A store failure is fatal to the current
//! pipeline run: without persistence, recovery and observability both
//! break down.

use crate::errors::StoreError;
use crate::ledger::LedgerEntry;
use crate::state::AgentState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key/value-plus-append storage interface for coordinator state.
#[async_trait]
pub trait StateStore: Send + Sync + Debug {
    /// Reads one agent's persisted state.
    async fn get_state(&self, agent: &str) -> Result<Option<AgentState>, StoreError>;

    /// Writes one agent's persisted state (last-write-wins).
    async fn put_state(&self, agent: &str, state: &AgentState) -> Result<(), StoreError>;

    /// Reads every agent's persisted state, for startup recovery and the
    /// health summary.
    async fn load_all(&self) -> Result<HashMap<String, AgentState>, StoreError>;

    /// Appends one ledger entry to the durable audit stream.
    async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError>;
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<String, AgentState>>,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All durably appended entries, in append order.
    #[must_use]
    pub fn appended_entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, agent: &str) -> Result<Option<AgentState>, StoreError> {
        Ok(self.states.lock().get(agent).cloned())
    }

    async fn put_state(&self, agent: &str, state: &AgentState) -> Result<(), StoreError> {
        self.states.lock().insert(agent.to_string(), state.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<String, AgentState>, StoreError> {
        Ok(self.states.lock().clone())
    }

    async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

/// File-backed store: one JSON document for agent states, one JSON-lines
/// file for the ledger stream.
///
/// State writes go through a temp file and rename so a crash mid-write
/// never leaves a torn document.
#[derive(Debug)]
pub struct JsonFileStore {
    states_path: PathBuf,
    ledger_path: PathBuf,
    // Serializes read-modify-write cycles on the states document.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (or initializes) a store rooted at the given directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            states_path: dir.join("agent_states.json"),
            ledger_path: dir.join("ledger.jsonl"),
            write_lock: Mutex::new(()),
        })
    }

    fn read_states(&self) -> Result<HashMap<String, AgentState>, StoreError> {
        if !self.states_path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.states_path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_states(&self, states: &HashMap<String, AgentState>) -> Result<(), StoreError> {
        let tmp = self.states_path.with_extension("json.tmp");
        let encoded = serde_json::to_vec_pretty(states)?;
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.states_path)?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get_state(&self, agent: &str) -> Result<Option<AgentState>, StoreError> {
        let _guard = self.write_lock.lock();
        Ok(self.read_states()?.remove(agent))
    }

    async fn put_state(&self, agent: &str, state: &AgentState) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut states = self.read_states()?;
        states.insert(agent.to_string(), state.clone());
        self.write_states(&states)
    }

    async fn load_all(&self) -> Result<HashMap<String, AgentState>, StoreError> {
        let _guard = self.write_lock.lock();
        self.read_states()
    }

    async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
