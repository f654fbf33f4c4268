use crate::error::StoreResult;
use crate::selector::Selector;
use crate::types::{HistoryIter, QueryMetadata, StateIter};

/// Versioned world-state store consumed by the ledger core.
///
/// All implementations must satisfy these invariants:
/// - `put_state` and `delete_state` are whole-value operations on one key;
///   each is recorded as a new version in that key's history.
/// - Range scans return simple keys in ascending byte order with an
///   inclusive start and an exclusive end. An empty bound is unbounded.
///   Composite keys are never returned by range scans or selector queries.
/// - Paginated variants return at most `page_size` records and a bookmark
///   that resumes strictly after the last returned key. The bookmark is
///   empty when no further records match.
/// - Returned iterators own their data; dropping them releases everything.
pub trait StateStore: Send + Sync {
    /// Read the current value of a key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Create or overwrite a key.
    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete_state(&self, key: &str) -> StoreResult<()>;

    /// Scan simple keys in `[start, end)`.
    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<StateIter>;

    /// Scan one page of simple keys in `[start, end)`.
    fn get_state_by_range_with_pagination(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)>;

    /// Scan all composite keys of `object_type` whose leading attributes equal `attributes`.
    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> StoreResult<StateIter>;

    /// Evaluate a selector against every JSON document in state.
    fn get_query_result(&self, selector: &Selector) -> StoreResult<StateIter>;

    /// Evaluate a selector, one page at a time.
    fn get_query_result_with_pagination(
        &self,
        selector: &Selector,
        page_size: u32,
        bookmark: &str,
    ) -> StoreResult<(StateIter, QueryMetadata)>;

    /// Every recorded version of a key, oldest first, including deletions.
    fn get_history_for_key(&self, key: &str) -> StoreResult<HistoryIter>;

    /// Check whether a key currently exists.
    fn has_state(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_state(key)?.is_some())
    }
}
