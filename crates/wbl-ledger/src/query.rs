//! Queries and multi-record views.
//!
//! Results are assembled as typed values and encoded once by the caller.
//! Range and index scans are ordered by key; selector queries are evaluated
//! against current state and carry no stability guarantee between calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use wbl_index::IndexMaintainer;
use wbl_store::{KeyValue, QueryMetadata, Selector, StateIter, StateStore};
use wbl_types::{
    DocType, FileHashProof, Order, PositionRecord, Record, StringHashProof, User,
};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{decode, decode_rows, RecordStore};

/// `statusMessage` of a successfully assembled detail view.
pub const STATUS_SUCCESS: &str = "Success";

/// One `{Key, Record}` row of a query result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: Value,
}

/// Pagination state reported next to a page of records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(rename = "RecordsCount")]
    pub records_count: usize,
    /// Resume token for the next page; empty once the results are exhausted.
    #[serde(rename = "Bookmark")]
    pub bookmark: String,
}

impl From<QueryMetadata> for ResponseMetadata {
    fn from(meta: QueryMetadata) -> Self {
        Self {
            records_count: meta.fetched_records_count,
            bookmark: meta.bookmark,
        }
    }
}

/// One page of records plus its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult {
    pub records: Vec<QueryRecord>,
    pub metadata: ResponseMetadata,
}

/// An order joined with everything recorded against it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub status_message: String,
    pub order: Order,
    pub string: Vec<StringHashProof>,
    pub file: Vec<FileHashProof>,
    pub position: Vec<PositionRecord>,
}

/// A user joined with their user-scoped files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub status_message: String,
    pub user: User,
    pub file: Vec<FileHashProof>,
}

/// Read-side entry point over a [`StateStore`].
pub struct QueryEngine {
    records: RecordStore,
    index: IndexMaintainer,
    max_page_size: u32,
}

impl QueryEngine {
    pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            records: RecordStore::new(store.clone()),
            index: IndexMaintainer::broker_create_date(store),
            max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Cap page sizes requested by callers at `max_page_size`.
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// The stored document of an order, byte for byte.
    pub fn read_order(&self, order_id: &str) -> LedgerResult<Vec<u8>> {
        self.records
            .raw_record::<Order>(order_id)?
            .ok_or_else(|| LedgerError::not_found(Order::KIND, order_id))
    }

    /// Records with keys in `[start, end)`; an empty bound is open.
    pub fn orders_by_range(&self, start: &str, end: &str) -> LedgerResult<Vec<QueryRecord>> {
        let rows = collect(self.state().get_state_by_range(start, end)?)?;
        to_query_records(rows)
    }

    pub fn orders_by_range_with_pagination(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &str,
    ) -> LedgerResult<PaginatedResult> {
        let page_size = self.page_size(page_size)?;
        let (iter, meta) =
            self.state()
                .get_state_by_range_with_pagination(start, end, page_size, bookmark)?;
        paginated(collect(iter)?, meta)
    }

    /// A broker's orders in creation order, via the `broker~createDate` index.
    pub fn orders_by_broker(&self, broker_id: &str) -> LedgerResult<Vec<QueryRecord>> {
        let mut out = Vec::new();
        for entry in self.index.scan(&[broker_id])? {
            match self.records.raw_record::<Order>(&entry.order_id)? {
                Some(bytes) => out.push(QueryRecord {
                    record: decode(Order::KIND, &entry.order_id, &bytes)?,
                    key: entry.order_id,
                }),
                None => warn!(index_key = ?entry.key, order_id = %entry.order_id, "index entry without order; skipping"),
            }
        }
        Ok(out)
    }

    /// Evaluate a caller-supplied `{"selector": ...}` document.
    pub fn query_assets(&self, query: &str) -> LedgerResult<Vec<QueryRecord>> {
        let selector = parse_selector(query)?;
        to_query_records(self.select(&selector)?)
    }

    /// Orders whose `brokerId` is `broker_id`, via a selector query.
    pub fn query_orders_by_broker(&self, broker_id: &str) -> LedgerResult<Vec<QueryRecord>> {
        let selector = Selector::new()
            .eq("docType", DocType::Order.as_str())
            .eq("brokerId", broker_id);
        to_query_records(self.select(&selector)?)
    }

    pub fn query_with_pagination(
        &self,
        query: &str,
        page_size: u32,
        bookmark: &str,
    ) -> LedgerResult<PaginatedResult> {
        let selector = parse_selector(query)?;
        let page_size = self.page_size(page_size)?;
        let (iter, meta) = self
            .state()
            .get_query_result_with_pagination(&selector, page_size, bookmark)?;
        paginated(collect(iter)?, meta)
    }

    /// The order with its string digests, order-scoped files and positions.
    pub fn order_detail(&self, order_id: &str) -> LedgerResult<OrderDetail> {
        let order: Order = self.records.require(order_id)?;
        let string = decode_rows(
            StringHashProof::KIND,
            self.select(&owned_by(DocType::StringHash, order_id))?,
        )?;
        let file = decode_rows(
            FileHashProof::KIND,
            self.select(&owned_by(DocType::FileHashForOrder, order_id))?,
        )?;
        let position = decode_rows(
            PositionRecord::KIND,
            self.select(&owned_by(DocType::Position, order_id))?,
        )?;

        Ok(OrderDetail {
            status_message: STATUS_SUCCESS.into(),
            order,
            string,
            file,
            position,
        })
    }

    /// The user with their user-scoped files.
    pub fn user_detail(&self, user_id: &str) -> LedgerResult<UserDetail> {
        let user: User = self.records.require(user_id)?;
        let file = decode_rows(
            FileHashProof::KIND,
            self.select(&owned_by(DocType::FileHashForUser, user_id))?,
        )?;
        Ok(UserDetail {
            status_message: STATUS_SUCCESS.into(),
            user,
            file,
        })
    }

    fn state(&self) -> &Arc<dyn StateStore> {
        self.records.state()
    }

    fn select(&self, selector: &Selector) -> LedgerResult<Vec<KeyValue>> {
        debug!(%selector, "selector query");
        collect(self.state().get_query_result(selector)?)
    }

    fn page_size(&self, requested: u32) -> LedgerResult<u32> {
        if requested == 0 {
            return Err(LedgerError::InvalidArgument(
                "page size must be greater than zero".into(),
            ));
        }
        Ok(requested.min(self.max_page_size))
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

/// Records of `doc_type` whose `orderId` field is `owner_id`.
fn owned_by(doc_type: DocType, owner_id: &str) -> Selector {
    Selector::new()
        .eq("docType", doc_type.as_str())
        .eq("orderId", owner_id)
}

fn parse_selector(query: &str) -> LedgerResult<Selector> {
    Selector::parse_query(query).map_err(|e| LedgerError::InvalidArgument(e.to_string()))
}

fn collect(iter: StateIter) -> LedgerResult<Vec<KeyValue>> {
    Ok(iter.collect::<Result<Vec<_>, _>>()?)
}

fn to_query_records(rows: Vec<KeyValue>) -> LedgerResult<Vec<QueryRecord>> {
    rows.into_iter()
        .map(|row| -> LedgerResult<QueryRecord> {
            Ok(QueryRecord {
                record: decode("record", &row.key, &row.value)?,
                key: row.key,
            })
        })
        .collect()
}

fn paginated(rows: Vec<KeyValue>, meta: QueryMetadata) -> LedgerResult<PaginatedResult> {
    Ok(PaginatedResult {
        records: to_query_records(rows)?,
        metadata: meta.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use wbl_store::InMemoryStateStore;
    use wbl_types::{FileScope, ManualClock, NewOrder, UserProfile};

    use crate::engine::LedgerEngine;

    fn new_order(id: &str, broker: &str) -> NewOrder {
        NewOrder {
            order_id: id.into(),
            from_address: "A".into(),
            to_address: "B".into(),
            content: "coal".into(),
            weight_ton: 20.0,
            trans_fee: 4000.0,
            order_state: "WAIT_DRIVER_ACCEPT".into(),
            goods_owner_id: "Own1".into(),
            broker_id: broker.into(),
            driver_id: "Drv1".into(),
        }
    }

    fn setup() -> (LedgerEngine, QueryEngine) {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let engine = LedgerEngine::new(store.clone(), Arc::new(ManualClock::default()));
        (engine, QueryEngine::new(store))
    }

    fn keys(records: &[QueryRecord]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn read_order_returns_stored_document() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        let doc: Value = serde_json::from_slice(&query.read_order("O1").unwrap()).unwrap();
        assert_eq!(doc["orderState"], "WAIT_DRIVER_ACCEPT");
        assert_eq!(doc["weightTon"], 20.0);
        assert_eq!(doc["transFee"], 4000.0);
        assert_eq!(doc["open"], true);

        assert!(matches!(
            query.read_order("O2"),
            Err(LedgerError::NotFound { kind: "order", .. })
        ));
    }

    #[test]
    fn lookups_by_id_respect_record_kind() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        engine
            .init_user(
                "U1",
                UserProfile {
                    user_name: "Li".into(),
                    role: "driver".into(),
                    telephone: "555".into(),
                    valid: true,
                },
            )
            .unwrap();

        assert!(matches!(
            query.read_order("U1"),
            Err(LedgerError::NotFound { kind: "order", .. })
        ));
        assert!(matches!(
            query.order_detail("U1"),
            Err(LedgerError::NotFound { kind: "order", .. })
        ));
        assert!(matches!(
            query.user_detail("O1"),
            Err(LedgerError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn range_query_uses_key_order() {
        let (engine, query) = setup();
        for id in ["O3", "O1", "O2"] {
            engine.init_order(new_order(id, "Brk1")).unwrap();
        }
        let all = query.orders_by_range("", "").unwrap();
        assert_eq!(keys(&all), ["O1", "O2", "O3"]);
        assert_eq!(all[0].record["orderId"], "O1");
        assert_eq!(keys(&query.orders_by_range("O1", "O3").unwrap()), ["O1", "O2"]);
    }

    #[test]
    fn broker_scan_lists_creation_order_and_drops_deleted() {
        let (engine, query) = setup();
        engine.init_order(new_order("O9", "Brk1")).unwrap();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        engine.init_order(new_order("O5", "Brk2")).unwrap();
        engine.init_order(new_order("O3", "Brk1")).unwrap();

        assert_eq!(keys(&query.orders_by_broker("Brk1").unwrap()), ["O9", "O1", "O3"]);

        engine.delete_order("O1").unwrap();
        let remaining = query.orders_by_broker("Brk1").unwrap();
        assert_eq!(keys(&remaining), ["O9", "O3"]);
        assert_eq!(remaining[1].record["brokerId"], "Brk1");
    }

    #[test]
    fn selector_queries() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        engine.init_order(new_order("O2", "Brk2")).unwrap();
        engine.init_user("U1", UserProfile {
            user_name: "Li".into(),
            role: "broker".into(),
            telephone: "1".into(),
            valid: true,
        })
        .unwrap();

        assert_eq!(keys(&query.query_orders_by_broker("Brk2").unwrap()), ["O2"]);
        let users = query.query_assets(r#"{"selector":{"docType":"user"}}"#).unwrap();
        assert_eq!(keys(&users), ["U1"]);
        assert_eq!(users[0].record["userName"], "Li");
    }

    #[test]
    fn template_query_does_not_interpolate() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        let hostile = r#"Brk1","docType":{"$ne":"x"#;
        assert!(query.query_orders_by_broker(hostile).unwrap().is_empty());
    }

    #[test]
    fn malformed_selector_is_rejected() {
        let (_, query) = setup();
        for bad in ["", "{}", r#"{"selector":{"a":{"$where":"1"}}}"#] {
            assert!(matches!(
                query.query_assets(bad),
                Err(LedgerError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn paginated_range_envelope() {
        let (engine, query) = setup();
        for id in ["O1", "O2", "O3"] {
            engine.init_order(new_order(id, "Brk1")).unwrap();
        }
        let first = query.orders_by_range_with_pagination("", "", 2, "").unwrap();
        assert_eq!(keys(&first.records), ["O1", "O2"]);
        assert_eq!(first.metadata.records_count, 2);
        assert!(!first.metadata.bookmark.is_empty());

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["metadata"]["RecordsCount"], 2);
        assert_eq!(json["records"][0]["Key"], "O1");

        let second = query
            .orders_by_range_with_pagination("", "", 2, &first.metadata.bookmark)
            .unwrap();
        assert_eq!(keys(&second.records), ["O3"]);
        assert!(second.metadata.bookmark.is_empty());
    }

    #[test]
    fn page_size_is_validated_and_capped() {
        let (engine, query) = setup();
        let query = query.with_max_page_size(2);
        for id in ["O1", "O2", "O3"] {
            engine.init_order(new_order(id, "Brk1")).unwrap();
        }
        assert!(matches!(
            query.orders_by_range_with_pagination("", "", 0, ""),
            Err(LedgerError::InvalidArgument(_))
        ));
        let page = query
            .query_with_pagination(r#"{"selector":{"docType":"order"}}"#, 50, "")
            .unwrap();
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn order_detail_joins_dependents() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        engine.init_order(new_order("O2", "Brk1")).unwrap();
        engine
            .init_string_hash(StringHashProof::new("S1", "O1", "u", "h", "c"))
            .unwrap();
        engine
            .init_string_hash(StringHashProof::new("S2", "O2", "u", "h", "c"))
            .unwrap();
        engine
            .init_file_hash(FileHashProof::new(FileScope::Order, "F1", "O1", "u", "h", "c"))
            .unwrap();
        engine
            .update_position_order(PositionRecord::new("P1", "O1", "1", "t1", "Shanghai"))
            .unwrap();
        engine
            .update_position_order(PositionRecord::new("P2", "O1", "2", "t2", "Hangzhou"))
            .unwrap();

        let detail = query.order_detail("O1").unwrap();
        assert_eq!(detail.status_message, "Success");
        assert_eq!(detail.order.order_id, "O1");
        assert_eq!(detail.string.len(), 1);
        assert_eq!(detail.string[0].data_id, "S1");
        assert_eq!(detail.file.len(), 1);
        assert_eq!(detail.position.len(), 2);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["statusMessage"], "Success");
        assert_eq!(json["position"][1]["positionString"], "Hangzhou");

        let bare = query.order_detail("O2").unwrap();
        assert!(bare.file.is_empty() && bare.position.is_empty());
        assert_eq!(bare.string.len(), 1);
    }

    #[test]
    fn missing_order_or_user_detail_is_not_found() {
        let (_, query) = setup();
        assert!(matches!(
            query.order_detail("O1"),
            Err(LedgerError::NotFound { kind: "order", .. })
        ));
        assert!(matches!(
            query.user_detail("U1"),
            Err(LedgerError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn user_detail_lists_user_files_only() {
        let (engine, query) = setup();
        engine.init_order(new_order("O1", "Brk1")).unwrap();
        engine
            .init_file_hash(FileHashProof::new(FileScope::Order, "F0", "O1", "u", "h", "bill"))
            .unwrap();
        engine
            .init_user("U1", UserProfile {
                user_name: "Li".into(),
                role: "driver".into(),
                telephone: "1".into(),
                valid: true,
            })
            .unwrap();
        engine
            .init_file_hash(FileHashProof::new(FileScope::User, "F1", "U1", "u", "h", "licence"))
            .unwrap();

        let detail = query.user_detail("U1").unwrap();
        assert_eq!(detail.user.user_name, "Li");
        assert_eq!(detail.file.len(), 1);
        assert_eq!(detail.file[0].comment, "licence");
        assert_eq!(
            serde_json::to_value(&detail).unwrap()["file"][0]["docType"],
            json!("fileHashForUser")
        );
    }

    proptest! {
        #[test]
        fn chained_bookmarks_enumerate_each_order_once(count in 1usize..25, page_size in 1u32..8) {
            let (engine, query) = setup();
            let mut expected: Vec<String> = (0..count).map(|i| format!("O{i:02}")).collect();
            for id in &expected {
                engine.init_order(new_order(id, "Brk1")).unwrap();
            }
            expected.sort();

            let mut seen = Vec::new();
            let mut bookmark = String::new();
            loop {
                let page = query
                    .query_with_pagination(r#"{"selector":{"docType":"order"}}"#, page_size, &bookmark)
                    .unwrap();
                prop_assert!(page.records.len() <= page_size as usize);
                seen.extend(page.records.into_iter().map(|r| r.key));
                if page.metadata.bookmark.is_empty() {
                    break;
                }
                bookmark = page.metadata.bookmark;
            }
            prop_assert_eq!(seen, expected);
        }
    }
}
