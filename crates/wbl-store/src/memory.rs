use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use chrono::DateTime;
use uuid::Uuid;
use wbl_types::{Clock, SystemClock};

use crate::composite::{create_composite_key, is_composite_key};
use crate::error::{StoreError, StoreResult};
use crate::selector::Selector;
use crate::traits::StateStore;
use crate::types::{HistoryIter, KeyModification, KeyValue, QueryMetadata, StateIter, StateMutation};

#[derive(Default)]
struct StoreState {
    state: BTreeMap<String, Vec<u8>>,
    history: HashMap<String, Vec<KeyModification>>,
}

/// In-memory, `BTreeMap`-based state store.
///
/// Intended for tests and embedding, and used as the read side of
/// [`DurableStateStore`](crate::DurableStateStore). Current values and
/// per-key history are held behind a single `RwLock`; every result is
/// cloned out before the lock is released.
pub struct InMemoryStateStore {
    inner: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStateStore {
    /// Create an empty store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that stamps history entries with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
            clock,
        }
    }

    /// Number of live keys, composite keys included.
    ///
    /// Diagnostic only: a poisoned lock still reports the last written
    /// state, while every `StateStore` call fails with `LockPoisoned`.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.state.len(),
            Err(poisoned) => poisoned.into_inner().state.len(),
        }
    }

    /// Returns `true` if no key is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stamp a write or delete with a fresh transaction id and the clock.
    pub(crate) fn mutation(&self, key: &str, value: Option<Vec<u8>>) -> StateMutation {
        StateMutation {
            tx_id: Uuid::now_v7().to_string(),
            key: key.to_string(),
            value,
            timestamp_ms: self.clock.now().timestamp_millis(),
        }
    }

    /// Apply a stamped mutation to state and history.
    ///
    /// Returns `false` for a delete of an absent key, which changes nothing.
    pub(crate) fn apply(&self, mutation: StateMutation) -> StoreResult<bool> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let StateMutation {
            tx_id,
            key,
            value,
            timestamp_ms,
        } = mutation;

        match &value {
            Some(bytes) => {
                inner.state.insert(key.clone(), bytes.clone());
            }
            None => {
                if inner.state.remove(&key).is_none() {
                    return Ok(false);
                }
            }
        }

        let is_delete = value.is_none();
        inner.history.entry(key).or_default().push(KeyModification {
            tx_id,
            value,
            timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
            is_delete,
        });
        Ok(true)
    }

    /// Validate arguments shared by every paginated call.
    pub(crate) fn check_page(page_size: u32, bookmark: &str) -> StoreResult<Option<String>> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }
        decode_bookmark(bookmark)
    }

    fn simple_range(&self, start: &str, end: &str, after: Option<&str>) -> StoreResult<Vec<KeyValue>> {
        if !start.is_empty() && !end.is_empty() && start > end {
            return Err(StoreError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let lower = match after {
            Some(resume) if resume >= start => Bound::Excluded(resume.to_string()),
            _ => Bound::Included(start.to_string()),
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end.to_string())
        };
        if let (Bound::Excluded(lo), Bound::Excluded(hi)) = (&lower, &upper) {
            if lo >= hi {
                return Ok(Vec::new());
            }
        }

        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .state
            .range::<String, _>((lower, upper))
            .filter(|(key, _)| !is_composite_key(key))
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect())
    }

    fn select(&self, selector: &Selector, after: Option<&str>) -> StoreResult<Vec<KeyValue>> {
        selector.validate()?;
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let lower = match after {
            Some(resume) => Bound::Excluded(resume.to_string()),
            None => Bound::Unbounded,
        };
        Ok(inner
            .state
            .range::<String, _>((lower, Bound::Unbounded))
            .filter(|(key, _)| !is_composite_key(key))
            .filter(|(_, value)| {
                serde_json::from_slice::<serde_json::Value>(value)
                    .is_ok_and(|document| selector.matches(&document))
            })
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect())
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.state.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(StoreError::EmptyValue(key.to_string()));
        }
        self.apply(self.mutation(key, Some(value.to_vec())))?;
        Ok(())
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.apply(self.mutation(key, None))?;
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<StateIter> {
        Ok(owned(self.simple_range(start, end, None)?))
    }

    fn get_state_by_range_with_pagination(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)> {
        let resume = Self::check_page(page_size, bookmark)?;
        let matches = self.simple_range(start, end, resume.as_deref())?;
        let (page, metadata) = paginate(matches, page_size);
        Ok((owned(page), metadata))
    }

    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> StoreResult<StateIter> {
        let prefix = create_composite_key(object_type, attributes)?;
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let rows: Vec<KeyValue> = inner
            .state
            .range::<String, _>((Bound::Included(prefix.clone()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect();
        Ok(owned(rows))
    }

    fn get_query_result(&self, selector: &Selector) -> StoreResult<StateIter> {
        Ok(owned(self.select(selector, None)?))
    }

    fn get_query_result_with_pagination(
        &self,
        selector: &Selector,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)> {
        let resume = Self::check_page(page_size, bookmark)?;
        let matches = self.select(selector, resume.as_deref())?;
        let (page, metadata) = paginate(matches, page_size);
        Ok((owned(page), metadata))
    }

    fn get_history_for_key(&self, key: &str) -> StoreResult<HistoryIter> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let versions = inner.history.get(key).cloned().unwrap_or_default();
        Ok(Box::new(versions.into_iter().map(Ok)))
    }
}

impl std::fmt::Debug for InMemoryStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStateStore")
            .field("key_count", &self.len())
            .finish()
    }
}

fn owned(rows: Vec<KeyValue>) -> StateIter {
    Box::new(rows.into_iter().map(Ok))
}

/// Cut the first page from `rows`; the bookmark points at its last key
/// when more rows follow.
fn paginate(mut rows: Vec<KeyValue>, page_size: u32) -> (Vec<KeyValue>, QueryMetadata) {
    let limit = page_size as usize;
    let more = rows.len() > limit;
    rows.truncate(limit);
    let bookmark = match rows.last() {
        Some(last) if more => hex::encode(last.key.as_bytes()),
        _ => String::new(),
    };
    let metadata = QueryMetadata {
        fetched_records_count: rows.len(),
        bookmark,
    };
    (rows, metadata)
}

fn decode_bookmark(bookmark: &str) -> StoreResult<Option<String>> {
    if bookmark.is_empty() {
        return Ok(None);
    }
    hex::decode(bookmark)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|key| !key.is_empty())
        .map(Some)
        .ok_or_else(|| StoreError::InvalidBookmark(bookmark.to_string()))
}
