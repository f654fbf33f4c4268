use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use wbl_ledger::{history_for_key, LedgerEngine, LedgerError, QueryEngine};
use wbl_store::{DurableStateStore, StateStore, WalConfig};
use wbl_types::{
    parse_decimal, parse_flag, Clock, FileHashProof, FileScope, NewOrder, PositionRecord,
    StringHashProof, SystemClock, UserProfile,
};

use crate::config::LedgerConfig;
use crate::error::{SdkError, SdkResult};
use crate::operation::Operation;
use crate::response::Response;

/// The Waybill Ledger behind a function-name + string-arguments surface.
///
/// ```ignore
/// let contract = Contract::open(&LedgerConfig::default())?;
/// let response = contract.invoke("readOrder", &["O1".to_string()]);
/// ```
pub struct Contract {
    engine: LedgerEngine,
    query: QueryEngine,
    store: Arc<dyn StateStore>,
    pretty: bool,
}

impl Contract {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: LedgerEngine::new(store.clone(), clock),
            query: QueryEngine::new(store.clone()),
            store,
            pretty: false,
        }
    }

    /// Apply the query and output settings of `config`.
    pub fn with_config(mut self, config: &LedgerConfig) -> Self {
        self.query = QueryEngine::new(self.store.clone()).with_max_page_size(config.max_page_size);
        self.pretty = config.pretty_json;
        self
    }

    /// Open the durable store described by `config`, replaying its WAL.
    pub fn open(config: &LedgerConfig) -> SdkResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &LedgerConfig, clock: Arc<dyn Clock>) -> SdkResult<Self> {
        config.validate()?;
        let wal_config = WalConfig {
            sync_mode: config.sync_mode,
        };
        let store = DurableStateStore::open_with_clock(&config.wal_path(), wal_config, clock.clone())?;
        Ok(Self::new(Arc::new(store), clock).with_config(config))
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Resolve `function` and run it; failures become [`Response::Error`].
    pub fn invoke(&self, function: &str, args: &[String]) -> Response {
        let result = function
            .parse::<Operation>()
            .and_then(|op| self.execute(op, args));
        match result {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                warn!(function, error = %err, "invocation rejected");
                Response::error(err.to_string())
            }
        }
    }

    /// Run a resolved operation. Argument shape is checked before any store
    /// access.
    pub fn execute(&self, op: Operation, args: &[String]) -> SdkResult<Vec<u8>> {
        check_arguments(op, args)?;
        debug!(function = %op, args = args.len(), "dispatching");

        match op {
            Operation::InitOrder => {
                let input = NewOrder {
                    order_id: args[0].clone(),
                    from_address: args[1].clone(),
                    to_address: args[2].clone(),
                    content: args[3].clone(),
                    weight_ton: parse_decimal("weightTon", &args[4]).map_err(LedgerError::from)?,
                    trans_fee: parse_decimal("transFee", &args[5]).map_err(LedgerError::from)?,
                    order_state: args[6].clone(),
                    goods_owner_id: args[7].clone(),
                    broker_id: args[8].clone(),
                    driver_id: args[9].clone(),
                };
                self.engine.init_order(input)?;
                Ok(Vec::new())
            }
            Operation::InitStringHash => {
                let proof = StringHashProof::new(&args[0], &args[1], &args[2], &args[3], &args[4]);
                self.engine.init_string_hash(proof)?;
                Ok(Vec::new())
            }
            Operation::InitFileHash => {
                let is_order = parse_flag("isOrder", &args[5]).map_err(LedgerError::from)?;
                let proof = FileHashProof::new(
                    FileScope::from_flag(is_order),
                    &args[0],
                    &args[1],
                    &args[2],
                    &args[3],
                    &args[4],
                );
                self.engine.init_file_hash(proof)?;
                Ok(Vec::new())
            }
            Operation::InitUser => {
                self.engine.init_user(&args[0], user_profile(args)?)?;
                Ok(Vec::new())
            }
            Operation::UpdateUser => {
                self.engine.update_user(&args[0], user_profile(args)?)?;
                Ok(Vec::new())
            }
            Operation::ReadUser => self.encode(&self.query.user_detail(&args[0])?),
            Operation::DeleteUser => {
                self.engine.delete_user(&args[0])?;
                Ok(Vec::new())
            }
            Operation::Delete => {
                self.engine.delete_order(&args[0])?;
                Ok(Vec::new())
            }
            Operation::ChangeStateOrder => {
                self.engine.change_state_order(&args[0], &args[1])?;
                Ok(Vec::new())
            }
            Operation::ReadOrder => Ok(self.query.read_order(&args[0])?),
            Operation::QueryOrdersByBroker => {
                self.encode(&self.query.query_orders_by_broker(&args[0])?)
            }
            Operation::QueryAssets => self.encode(&self.query.query_assets(&args[0])?),
            Operation::UpdatePositionOrder => {
                let position =
                    PositionRecord::new(&args[0], &args[1], &args[2], &args[3], &args[4]);
                self.engine.update_position_order(position)?;
                Ok(Vec::new())
            }
            Operation::GetHistoryForOrder => {
                self.encode(&history_for_key(self.store.as_ref(), &args[0])?)
            }
            Operation::GetOrdersByRange => {
                self.encode(&self.query.orders_by_range(&args[0], &args[1])?)
            }
            Operation::GetOrdersByRangeWithPagination => {
                let page_size = parse_page_size(&args[2])?;
                self.encode(&self.query.orders_by_range_with_pagination(
                    &args[0], &args[1], page_size, &args[3],
                )?)
            }
            Operation::QueryOrderDetail => self.encode(&self.query.order_detail(&args[0])?),
            Operation::QueryOrdersWithPagination => {
                let page_size = parse_page_size(&args[1])?;
                self.encode(&self.query.query_with_pagination(&args[0], page_size, &args[2])?)
            }
            Operation::GetOrdersByBroker => self.encode(&self.query.orders_by_broker(&args[0])?),
        }
    }

    fn encode<T: Serialize>(&self, value: &T) -> SdkResult<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| SdkError::Serialization(e.to_string()))
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("max_page_size", &self.query.max_page_size())
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

fn check_arguments(op: Operation, args: &[String]) -> SdkResult<()> {
    let expected = op.arity();
    if !expected.accepts(args.len()) {
        return Err(SdkError::ArgumentCount {
            function: op.name(),
            expected,
            got: args.len(),
        });
    }
    if let Some(&position) = op.required().iter().find(|&&i| args[i].is_empty()) {
        return Err(SdkError::EmptyArgument {
            ordinal: ordinal(position + 1),
        });
    }
    Ok(())
}

fn user_profile(args: &[String]) -> SdkResult<UserProfile> {
    Ok(UserProfile {
        user_name: args[1].clone(),
        role: args[2].clone(),
        telephone: args[3].clone(),
        valid: parse_flag("valid", &args[4]).map_err(LedgerError::from)?,
    })
}

fn parse_page_size(raw: &str) -> SdkResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SdkError::InvalidArgument(format!("page size must be a non-negative integer, got {raw:?}")))
}

/// `1st`, `2nd`, `3rd`, `4th`, ..., `11th`, `12th`, `13th`, `21st`.
fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wbl_store::InMemoryStateStore;
    use wbl_types::ManualClock;

    fn contract() -> (Contract, Arc<InMemoryStateStore>) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let store = Arc::new(InMemoryStateStore::with_clock(clock.clone()));
        (Contract::new(store.clone(), clock), store)
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn ok(contract: &Contract, function: &str, values: &[&str]) -> Vec<u8> {
        match contract.invoke(function, &args(values)) {
            Response::Success(payload) => payload,
            Response::Error(message) => panic!("{function} failed: {message}"),
        }
    }

    fn json(contract: &Contract, function: &str, values: &[&str]) -> Value {
        serde_json::from_slice(&ok(contract, function, values)).unwrap()
    }

    fn err(contract: &Contract, function: &str, values: &[&str]) -> String {
        contract
            .invoke(function, &args(values))
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| panic!("{function} unexpectedly succeeded"))
    }

    fn seed_order(contract: &Contract, id: &str, broker: &str) {
        ok(
            contract,
            "initOrder",
            &[id, "A", "B", "coal", "20", "4000", "WAIT_DRIVER_ACCEPT", "Own1", broker, "Drv1"],
        );
    }

    #[test]
    fn init_then_read_order() {
        let (c, _) = contract();
        let payload = ok(
            &c,
            "initOrder",
            &["O1", "A", "B", "coal", "20", "4000", "WAIT_DRIVER_ACCEPT", "Own1", "Brk1", "Drv1"],
        );
        assert!(payload.is_empty());

        let order = json(&c, "readOrder", &["O1"]);
        assert_eq!(order["orderState"], "WAIT_DRIVER_ACCEPT");
        assert_eq!(order["weightTon"].as_f64(), Some(20.0));
        assert_eq!(order["transFee"].as_f64(), Some(4000.0));
        assert_eq!(order["open"], true);
    }

    #[test]
    fn change_state_lowercases_and_audits() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        ok(&c, "changeStateOrder", &["O1", "DRIVER_ACCEPT_WAIT_ROAD"]);

        let order = json(&c, "readOrder", &["O1"]);
        assert_eq!(order["orderState"], "driver_accept_wait_road");
        let trail = order["changeStateHistory"].as_array().unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0]["label"], "createOrder");
        assert_eq!(trail[1]["label"], "driver_accept_wait_road");
    }

    #[test]
    fn signing_closes_the_order() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        ok(&c, "changeStateOrder", &["O1", "SIGNED"]);
        assert_eq!(json(&c, "readOrder", &["O1"])["open"], false);

        let message = err(&c, "changeStateOrder", &["O1", "DRIVER_ON_ROAD"]);
        assert!(message.contains("policy violation"), "{message}");
    }

    #[test]
    fn duplicate_order_conflicts() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        let message = err(
            &c,
            "initOrder",
            &["O1", "A", "B", "coal", "1", "1", "SIGNED", "Own1", "Brk1", "Drv1"],
        );
        assert_eq!(message, "order already exists: O1");
    }

    #[test]
    fn bad_decimal_is_a_value_error() {
        let (c, store) = contract();
        let message = err(
            &c,
            "initOrder",
            &["O1", "A", "B", "coal", "heavy", "4000", "WAIT_DRIVER_ACCEPT", "Own1", "Brk1", "Drv1"],
        );
        assert!(message.starts_with("invalid value"), "{message}");
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_function_is_rejected() {
        let (c, store) = contract();
        assert_eq!(
            err(&c, "transferOrder", &["O1"]),
            "Received unknown function invocation"
        );
        assert!(store.is_empty());
    }

    #[test]
    fn wrong_arity_touches_nothing() {
        let (c, store) = contract();
        let message = err(&c, "initOrder", &["O1", "A", "B"]);
        assert_eq!(
            message,
            "Incorrect number of arguments for initOrder. Expecting 10, got 3"
        );
        let message = err(&c, "changeStateOrder", &["O1"]);
        assert!(message.contains("Expecting at least 2"), "{message}");
        assert!(store.is_empty());
    }

    #[test]
    fn empty_required_argument_names_its_position() {
        let (c, store) = contract();
        assert_eq!(
            err(&c, "initOrder", &["O1", "A", "", "coal", "20", "4000", "S", "Own1", "Brk1", "Drv1"]),
            "3rd argument must be a non-empty string"
        );
        assert_eq!(
            err(&c, "readOrder", &[""]),
            "1st argument must be a non-empty string"
        );
        assert!(store.is_empty());
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(10), "10th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn proofs_positions_and_detail() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        ok(&c, "initStringHash", &["S1", "O1", "", "abc123", "bill of lading"]);
        ok(&c, "initFileHash", &["F1", "O1", "http://files/1", "def456", "photo", "true"]);
        ok(&c, "updatePositionOrder", &["P1", "O1", "1", "2024-01-01T08:00:00Z", "31.2,121.4"]);

        let detail = json(&c, "queryOrderDetail", &["O1"]);
        assert_eq!(detail["statusMessage"], "Success");
        assert_eq!(detail["order"]["orderId"], "O1");
        assert_eq!(detail["string"].as_array().unwrap().len(), 1);
        assert_eq!(detail["file"][0]["fileId"], "F1");
        assert_eq!(detail["position"][0]["positionString"], "31.2,121.4");

        let message = err(&c, "initStringHash", &["S1", "O1", "", "abc123", "again"]);
        assert!(message.contains("already exists"), "{message}");
        let message = err(&c, "updatePositionOrder", &["P2", "O404", "1", "t", "x"]);
        assert_eq!(message, "order does not exist: O404");
    }

    #[test]
    fn user_lifecycle() {
        let (c, _) = contract();
        ok(&c, "initUser", &["U1", "Li Lei", "driver", "13800000000", "true"]);
        ok(&c, "initFileHash", &["F9", "U1", "http://files/9", "aaa", "licence", "false"]);
        ok(&c, "updateUser", &["U1", "Li Lei", "broker", "13800000001", "F"]);

        let detail = json(&c, "readUser", &["U1"]);
        assert_eq!(detail["statusMessage"], "Success");
        assert_eq!(detail["user"]["role"], "broker");
        assert_eq!(detail["user"]["valid"], false);
        assert_eq!(detail["file"][0]["fileId"], "F9");

        let message = err(&c, "initUser", &["U2", "Han Meimei", "owner", "139", "maybe"]);
        assert!(message.starts_with("invalid value"), "{message}");

        ok(&c, "deleteUser", &["U1"]);
        assert_eq!(err(&c, "readUser", &["U1"]), "user does not exist: U1");
    }

    #[test]
    fn broker_listings() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        seed_order(&c, "O2", "Brk2");
        seed_order(&c, "O3", "Brk1");
        ok(&c, "delete", &["O3"]);

        let by_index = json(&c, "getOrdersByBroker", &["Brk1"]);
        let keys: Vec<_> = by_index.as_array().unwrap().iter().map(|r| r["Key"].clone()).collect();
        assert_eq!(keys, vec![Value::from("O1")]);

        let by_query = json(&c, "queryOrdersByBroker", &["Brk2"]);
        assert_eq!(by_query[0]["Record"]["orderId"], "O2");
    }

    #[test]
    fn range_and_selector_pagination() {
        let (c, _) = contract();
        for id in ["O1", "O2", "O3"] {
            seed_order(&c, id, "Brk1");
        }

        let all = json(&c, "getOrdersByRange", &["", ""]);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let page = json(&c, "getOrdersByRangeWithPagination", &["O1", "O9", "2", ""]);
        assert_eq!(page["records"].as_array().unwrap().len(), 2);
        assert_eq!(page["metadata"]["RecordsCount"], 2);
        let bookmark = page["metadata"]["Bookmark"].as_str().unwrap().to_string();
        assert!(!bookmark.is_empty());

        let rest = json(&c, "getOrdersByRangeWithPagination", &["O1", "O9", "2", &bookmark]);
        assert_eq!(rest["records"][0]["Key"], "O3");

        let query = r#"{"selector":{"docType":"order","brokerId":"Brk1"}}"#;
        let page = json(&c, "queryOrdersWithPagination", &[query, "10", ""]);
        assert_eq!(page["metadata"]["RecordsCount"], 3);

        let message = err(&c, "queryOrdersWithPagination", &[query, "ten", ""]);
        assert!(message.starts_with("invalid argument"), "{message}");
        let message = err(&c, "queryAssets", &["{not json"]);
        assert!(message.starts_with("invalid argument"), "{message}");
    }

    #[test]
    fn history_reports_every_version() {
        let (c, _) = contract();
        seed_order(&c, "O1", "Brk1");
        ok(&c, "changeStateOrder", &["O1", "DRIVER_ON_ROAD"]);
        ok(&c, "delete", &["O1"]);

        let history = json(&c, "getHistoryForOrder", &["O1"]);
        let rows = history.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["IsDelete"], true);
        assert_eq!(rows[2]["Value"], Value::Null);
    }

    #[test]
    fn durable_contract_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            data_dir: dir.path().join("ledger"),
            ..LedgerConfig::default()
        };

        {
            let c = Contract::open(&config).unwrap();
            seed_order(&c, "O1", "Brk1");
            ok(&c, "changeStateOrder", &["O1", "SIGNED"]);
        }

        let c = Contract::open(&config).unwrap();
        let order = json(&c, "readOrder", &["O1"]);
        assert_eq!(order["orderState"], "signed");
        assert_eq!(order["open"], false);
        assert_eq!(json(&c, "getOrdersByBroker", &["Brk1"])[0]["Key"], "O1");
    }

    #[test]
    fn pretty_output_follows_config() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let store = Arc::new(InMemoryStateStore::with_clock(clock.clone()));
        let config = LedgerConfig {
            pretty_json: true,
            ..LedgerConfig::default()
        };
        let c = Contract::new(store, clock).with_config(&config);
        seed_order(&c, "O1", "Brk1");
        let payload = ok(&c, "getOrdersByRange", &["", ""]);
        assert!(String::from_utf8(payload).unwrap().contains('\n'));
    }
}
