use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::info;
use wbl_types::{Clock, SystemClock};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryStateStore;
use crate::selector::Selector;
use crate::traits::StateStore;
use crate::types::{HistoryIter, QueryMetadata, StateIter};
use crate::wal::{WalConfig, WalEntry, WriteAheadLog};

/// State store persisted through a write-ahead log.
///
/// Every mutation is logged before it is applied to the in-memory state, and
/// opening the store replays the log, so both current values and per-key
/// history survive restarts. A torn tail left by a crash is cut off at open.
/// Reads are served from memory.
pub struct DurableStateStore {
    memory: InMemoryStateStore,
    wal: WriteAheadLog,
    write_lock: Mutex<()>,
}

impl DurableStateStore {
    /// Open the store backed by the WAL file at `path`.
    pub fn open(path: &Path, config: WalConfig) -> StoreResult<Self> {
        Self::open_with_clock(path, config, Arc::new(SystemClock))
    }

    /// Open the store, stamping new history entries with `clock`.
    pub fn open_with_clock(
        path: &Path,
        config: WalConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let wal = WriteAheadLog::open(path, config)?;
        let memory = InMemoryStateStore::with_clock(clock);

        let entries = wal.recover_and_truncate()?;
        let replayed = entries.len();
        for entry in entries {
            memory.apply(entry.mutation)?;
        }
        info!(path = %path.display(), replayed, keys = memory.len(), "state store opened");

        Ok(Self {
            memory,
            wal,
            write_lock: Mutex::new(()),
        })
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn wal(&self) -> &WriteAheadLog {
        &self.wal
    }

    fn write(&self, key: &str, value: Option<Vec<u8>>) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        if value.is_none() && !self.memory.has_state(key)? {
            return Ok(());
        }
        let mutation = self.memory.mutation(key, value);
        self.wal.append(&WalEntry {
            mutation: mutation.clone(),
        })?;
        self.memory.apply(mutation)?;
        Ok(())
    }
}

impl StateStore for DurableStateStore {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.memory.get_state(key)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(StoreError::EmptyValue(key.to_string()));
        }
        self.write(key, Some(value.to_vec()))
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.write(key, None)
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<StateIter> {
        self.memory.get_state_by_range(start, end)
    }

    fn get_state_by_range_with_pagination(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)> {
        self.memory
            .get_state_by_range_with_pagination(start, end, page_size, bookmark)
    }

    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> StoreResult<StateIter> {
        self.memory
            .get_state_by_partial_composite_key(object_type, attributes)
    }

    fn get_query_result(&self, selector: &Selector) -> StoreResult<StateIter> {
        self.memory.get_query_result(selector)
    }

    fn get_query_result_with_pagination(
        &self,
        selector: &Selector,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)> {
        self.memory
            .get_query_result_with_pagination(selector, page_size, bookmark)
    }

    fn get_history_for_key(&self, key: &str) -> StoreResult<HistoryIter> {
        self.memory.get_history_for_key(key)
    }
}

impl std::fmt::Debug for DurableStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStateStore")
            .field("wal", &self.wal)
            .field("key_count", &self.memory.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::create_composite_key;

    #[test]
    fn state_and_history_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.wal");
        let index = create_composite_key("broker~createDate", &["Brk1", "t0", "O1"]).unwrap();
        {
            let store = DurableStateStore::open(&path, WalConfig::default()).unwrap();
            store.put_state("O1", br#"{"v":1}"#).unwrap();
            store.put_state("O1", br#"{"v":2}"#).unwrap();
            store.put_state("O2", br#"{"v":1}"#).unwrap();
            store.delete_state("O2").unwrap();
            store.put_state(&index, b"O1").unwrap();
        }

        let store = DurableStateStore::open(&path, WalConfig::default()).unwrap();
        assert_eq!(store.get_state("O1").unwrap().unwrap(), br#"{"v":2}"#);
        assert!(store.get_state("O2").unwrap().is_none());
        assert_eq!(store.len(), 2);

        let history: Vec<_> = store.get_history_for_key("O2").unwrap().map(Result::unwrap).collect();
        assert_eq!(history.len(), 2);
        assert!(history[1].is_delete);

        let indexed = store
            .get_state_by_partial_composite_key("broker~createDate", &["Brk1"])
            .unwrap()
            .count();
        assert_eq!(indexed, 1);
    }

    #[test]
    fn writes_after_a_torn_tail_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.wal");
        {
            let store = DurableStateStore::open(&path, WalConfig::default()).unwrap();
            store.put_state("A", br#"{"v":"a"}"#).unwrap();
            store.put_state("B", br#"{"v":"b"}"#).unwrap();
        }
        let len = std::fs::metadata(&path).unwrap().len();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 4)
            .unwrap();

        {
            let store = DurableStateStore::open(&path, WalConfig::default()).unwrap();
            assert!(store.has_state("A").unwrap());
            assert!(!store.has_state("B").unwrap());
            store.put_state("C", br#"{"v":"c"}"#).unwrap();
        }

        let store = DurableStateStore::open(&path, WalConfig::default()).unwrap();
        assert!(store.has_state("A").unwrap());
        assert_eq!(store.get_state("C").unwrap().unwrap(), br#"{"v":"c"}"#);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn deleting_absent_key_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStateStore::open(&dir.path().join("ledger.wal"), WalConfig::default()).unwrap();
        store.delete_state("ghost").unwrap();
        assert_eq!(store.wal().offset(), 0);
    }

    #[test]
    fn rejected_writes_are_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStateStore::open(&dir.path().join("ledger.wal"), WalConfig::default()).unwrap();
        assert!(store.put_state("O1", b"").is_err());
        assert!(store.put_state("", b"x").is_err());
        assert_eq!(store.wal().offset(), 0);
        assert!(store.is_empty());
    }
}
