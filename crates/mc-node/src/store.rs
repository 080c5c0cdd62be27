use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use mc_blockchain::Blockchain;
use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};

use crate::NodeError;

/// Everything a node persists, written and read as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub chain: Blockchain,
    pub open_transactions: Vec<Transaction>,
    pub peers: BTreeSet<String>,
}

/// Where a ledger keeps its snapshot between runs.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<NodeSnapshot>, NodeError>;

    fn save(&self, snapshot: &NodeSnapshot) -> Result<(), NodeError>;
}

/// JSON snapshot in a single file.  Saves go through a sibling temporary
/// file and a rename, so a crash mid-write leaves the previous snapshot.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<NodeSnapshot>, NodeError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, snapshot: &NodeSnapshot) -> Result<(), NodeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store for ephemeral nodes and tests.  Clones share state, so a
/// test can keep a handle after giving one to a ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<Mutex<Option<NodeSnapshot>>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous run had saved `snapshot`.
    pub fn with_snapshot(snapshot: NodeSnapshot) -> Self {
        let store = Self::default();
        *store.lock() = Some(snapshot);
        store
    }

    /// Latest saved snapshot, if any.
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        self.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<NodeSnapshot>> {
        self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<NodeSnapshot>, NodeError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &NodeSnapshot) -> Result<(), NodeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("memory store set to fail").into());
        }
        *self.lock() = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeSnapshot {
        NodeSnapshot {
            chain: Blockchain::new(),
            open_transactions: vec![Transaction::new("a", "b", "s", 2.0)],
            peers: ["localhost:5001".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("ledger-1.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("ledger-1.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger-1.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(FileStore::new(path).load().is_err());
    }

    #[test]
    fn file_store_rejects_chain_without_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger-1.json");
        fs::write(&path, r#"{"chain":[],"open_transactions":[],"peers":[]}"#).unwrap();
        assert!(FileStore::new(path).load().is_err());
    }

    #[test]
    fn memory_store_counts_saves_and_can_fail() {
        let store = MemoryStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.save_count(), 1);

        store.set_failing(true);
        assert!(store.save(&NodeSnapshot::default()).is_err());
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.snapshot(), Some(sample()));
    }
}
