//! Record trait - the contract a persisted type must satisfy

use std::collections::HashMap;

/// A value that can be indexed and filtered on in SQLite.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    Null,
}

impl IndexValue {
    fn sql_literal(&self) -> String {
        match self {
            IndexValue::Text(s) => s.clone(),
            IndexValue::Int(i) => i.to_string(),
            IndexValue::Real(r) => r.to_string(),
            IndexValue::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
            IndexValue::Null => String::new(),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::Text(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        IndexValue::Text(s)
    }
}

impl From<i64> for IndexValue {
    fn from(i: i64) -> Self {
        IndexValue::Int(i)
    }
}

impl From<f64> for IndexValue {
    fn from(f: f64) -> Self {
        IndexValue::Real(f)
    }
}

impl From<bool> for IndexValue {
    fn from(b: bool) -> Self {
        IndexValue::Bool(b)
    }
}

impl<T: Into<IndexValue>> From<Option<T>> for IndexValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(IndexValue::Null)
    }
}

pub(crate) fn index_value_column(v: &IndexValue) -> String {
    v.sql_literal()
}

/// A persisted type. `id` and `collection` identify the record; `indexed_fields`
/// declares which of its fields the store should maintain a secondary index
/// over for `Store::list` filtering.
pub trait Record: serde::Serialize + serde::de::DeserializeOwned + Send + Sync {
    /// Collection name - one SQLite table and one JSONL log per collection.
    fn collection() -> &'static str;

    /// Unique id within the collection.
    fn id(&self) -> String;

    /// Last-modified timestamp in epoch milliseconds.
    fn updated_at(&self) -> i64;

    /// Fields to maintain a filterable secondary index over.
    fn indexed_fields(&self) -> HashMap<String, IndexValue>;
}
