//! Typed selector queries.
//!
//! A [`Selector`] is a conjunction of [`Condition`]s over document fields.
//! It can be assembled with the builder methods, or parsed from the JSON
//! query document format (`{"selector": {...}}`) that rich-query state
//! databases accept. Either way the selector is validated before it reaches
//! a store, and its JSON form is produced by serialization rather than string
//! interpolation.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::{StoreError, StoreResult};

/// Comparison operator of a field condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Exists,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Nin => "$nin",
            Self::Exists => "$exists",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "$eq" => Self::Eq,
            "$ne" => Self::Ne,
            "$gt" => Self::Gt,
            "$gte" => Self::Gte,
            "$lt" => Self::Lt,
            "$lte" => Self::Lte,
            "$in" => Self::In,
            "$nin" => Self::Nin,
            "$exists" => Self::Exists,
            _ => return None,
        })
    }

    fn check_operand(self, path: &str, operand: &Value) -> StoreResult<()> {
        let ok = match self {
            Self::Eq | Self::Ne => true,
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                operand.is_number() || operand.is_string()
            }
            Self::In | Self::Nin => operand.is_array(),
            Self::Exists => operand.is_boolean(),
        };
        if ok {
            Ok(())
        } else {
            Err(StoreError::InvalidSelector(format!(
                "bad operand for {} on {path:?}: {operand}",
                self.as_str()
            )))
        }
    }
}

/// One clause of a selector.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `path <op> value`, where `path` may address nested fields with dots.
    Field {
        path: String,
        op: Operator,
        value: Value,
    },
    /// Every nested selector must match.
    And(Vec<Selector>),
    /// At least one nested selector must match.
    Or(Vec<Selector>),
}

/// A conjunction of conditions. The empty selector matches every document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    conditions: Vec<Condition>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Builder
    // ---------------------------------------------------------------

    /// Add a field condition, validating the operand against the operator.
    pub fn condition(
        mut self,
        path: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> StoreResult<Self> {
        let path = path.into();
        validate_path(&path)?;
        let value = value.into();
        op.check_operand(&path, &value)?;
        self.conditions.push(Condition::Field { path, op, value });
        Ok(self)
    }

    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Eq, value.into())
    }

    pub fn ne(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Ne, value.into())
    }

    pub fn gt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Gt, value.into())
    }

    pub fn gte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Gte, value.into())
    }

    pub fn lt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Lt, value.into())
    }

    pub fn lte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(path, Operator::Lte, value.into())
    }

    pub fn one_of(self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.push_field(path, Operator::In, Value::Array(values))
    }

    pub fn none_of(self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.push_field(path, Operator::Nin, Value::Array(values))
    }

    pub fn exists(self, path: impl Into<String>, present: bool) -> Self {
        self.push_field(path, Operator::Exists, Value::Bool(present))
    }

    pub fn and(mut self, selectors: Vec<Selector>) -> Self {
        self.conditions.push(Condition::And(selectors));
        self
    }

    pub fn or(mut self, selectors: Vec<Selector>) -> Self {
        self.conditions.push(Condition::Or(selectors));
        self
    }

    fn push_field(mut self, path: impl Into<String>, op: Operator, value: Value) -> Self {
        self.conditions.push(Condition::Field {
            path: path.into(),
            op,
            value,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    // ---------------------------------------------------------------
    // Parsing
    // ---------------------------------------------------------------

    /// Parse a query document such as `{"selector":{"docType":"order"}}`.
    ///
    /// `use_index` hints are accepted and ignored; any other top-level field
    /// is rejected.
    pub fn parse_query(query: &str) -> StoreResult<Self> {
        let document: Value = serde_json::from_str(query)
            .map_err(|e| StoreError::InvalidSelector(format!("query is not JSON: {e}")))?;
        let Value::Object(fields) = document else {
            return Err(StoreError::InvalidSelector(
                "query must be a JSON object".into(),
            ));
        };

        let mut selector = None;
        for (name, value) in fields {
            match name.as_str() {
                "selector" => selector = Some(Self::from_json(&value)?),
                "use_index" => {}
                other => {
                    return Err(StoreError::InvalidSelector(format!(
                        "unsupported query field {other:?}"
                    )))
                }
            }
        }
        selector.ok_or_else(|| StoreError::InvalidSelector("missing \"selector\"".into()))
    }

    /// Parse the body of a `selector` field.
    pub fn from_json(value: &Value) -> StoreResult<Self> {
        let Value::Object(fields) = value else {
            return Err(StoreError::InvalidSelector(
                "selector must be a JSON object".into(),
            ));
        };
        let mut selector = Self::new();
        for (name, body) in fields {
            selector.parse_entry(name, body, "")?;
        }
        Ok(selector)
    }

    fn parse_entry(&mut self, name: &str, body: &Value, parent: &str) -> StoreResult<()> {
        match name {
            "$and" | "$or" if parent.is_empty() => {
                let Value::Array(items) = body else {
                    return Err(StoreError::InvalidSelector(format!(
                        "{name} requires an array"
                    )));
                };
                if items.is_empty() {
                    return Err(StoreError::InvalidSelector(format!(
                        "{name} requires at least one selector"
                    )));
                }
                let nested = items
                    .iter()
                    .map(Self::from_json)
                    .collect::<StoreResult<Vec<_>>>()?;
                self.conditions.push(if name == "$and" {
                    Condition::And(nested)
                } else {
                    Condition::Or(nested)
                });
                Ok(())
            }
            _ if name.starts_with('$') => Err(StoreError::InvalidSelector(format!(
                "unsupported operator {name:?}"
            ))),
            _ => {
                let path = if parent.is_empty() {
                    name.to_string()
                } else {
                    format!("{parent}.{name}")
                };
                validate_path(&path)?;
                self.parse_field(path, body)
            }
        }
    }

    fn parse_field(&mut self, path: String, body: &Value) -> StoreResult<()> {
        let Value::Object(ops) = body else {
            self.conditions.push(Condition::Field {
                path,
                op: Operator::Eq,
                value: body.clone(),
            });
            return Ok(());
        };
        if ops.is_empty() {
            return Err(StoreError::InvalidSelector(format!(
                "empty condition on {path:?}"
            )));
        }

        let operator_keys = ops.keys().filter(|k| k.starts_with('$')).count();
        if operator_keys == 0 {
            // Nested sub-document: {"a": {"b": 1}} addresses a.b.
            for (name, nested) in ops {
                self.parse_entry(name, nested, &path)?;
            }
            return Ok(());
        }
        if operator_keys != ops.len() {
            return Err(StoreError::InvalidSelector(format!(
                "condition on {path:?} mixes operators and fields"
            )));
        }

        for (name, operand) in ops {
            let op = Operator::parse(name).ok_or_else(|| {
                StoreError::InvalidSelector(format!("unsupported operator {name:?}"))
            })?;
            op.check_operand(&path, operand)?;
            self.conditions.push(Condition::Field {
                path: path.clone(),
                op,
                value: operand.clone(),
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------

    /// The selector body as JSON.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        let mut clash = false;

        for condition in &self.conditions {
            match condition {
                Condition::Field { path, op, value } => {
                    let entry = body
                        .entry(path.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    match entry {
                        Value::Object(ops) => {
                            clash |= ops.insert(op.as_str().to_string(), value.clone()).is_some();
                        }
                        _ => clash = true,
                    }
                }
                Condition::And(nested) => {
                    clash |= body.insert("$and".into(), nested_json(nested)).is_some();
                }
                Condition::Or(nested) => {
                    clash |= body.insert("$or".into(), nested_json(nested)).is_some();
                }
            }
        }

        if clash {
            // Two clauses want the same slot; spell each out under $and.
            let each: Vec<Value> = self
                .conditions
                .iter()
                .map(|c| {
                    Self {
                        conditions: vec![c.clone()],
                    }
                    .to_json()
                })
                .collect();
            return json!({ "$and": each });
        }
        Value::Object(body)
    }

    /// The full query document, `{"selector": ...}`.
    pub fn to_query_string(&self) -> String {
        json!({ "selector": self.to_json() }).to_string()
    }

    // ---------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------

    /// Evaluate the selector against a JSON document.
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }

    /// Check every field clause, including nested ones. The unchecked
    /// builders defer to this; stores call it before scanning.
    pub fn validate(&self) -> StoreResult<()> {
        self.conditions.iter().try_for_each(|condition| match condition {
            Condition::Field { path, op, value } => {
                validate_path(path)?;
                op.check_operand(path, value)
            }
            Condition::And(nested) | Condition::Or(nested) => {
                nested.iter().try_for_each(Selector::validate)
            }
        })
    }
}

impl Condition {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Self::And(nested) => nested.iter().all(|s| s.matches(document)),
            Self::Or(nested) => nested.iter().any(|s| s.matches(document)),
            Self::Field { path, op, value } => {
                let found = lookup(document, path);
                match (op, found) {
                    (Operator::Exists, found) => value.as_bool() == Some(found.is_some()),
                    (_, None) => false,
                    (Operator::Eq, Some(v)) => compare(v, value) == Some(Ordering::Equal),
                    (Operator::Ne, Some(v)) => compare(v, value) != Some(Ordering::Equal),
                    (Operator::Gt, Some(v)) => compare(v, value) == Some(Ordering::Greater),
                    (Operator::Gte, Some(v)) => matches!(
                        compare(v, value),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    (Operator::Lt, Some(v)) => compare(v, value) == Some(Ordering::Less),
                    (Operator::Lte, Some(v)) => {
                        matches!(compare(v, value), Some(Ordering::Less | Ordering::Equal))
                    }
                    (Operator::In, Some(v)) => contains(value, v),
                    (Operator::Nin, Some(v)) => !contains(value, v),
                }
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn nested_json(selectors: &[Selector]) -> Value {
    Value::Array(selectors.iter().map(Selector::to_json).collect())
}

fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidSelector(format!(
            "invalid field path {path:?}"
        )));
    }
    Ok(())
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn contains(candidates: &Value, needle: &Value) -> bool {
    candidates
        .as_array()
        .is_some_and(|items| items.iter().any(|c| compare(needle, c) == Some(Ordering::Equal)))
}

/// Order two JSON values of the same kind; `None` when they are not comparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}
