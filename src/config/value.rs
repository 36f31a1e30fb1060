//! The backing structure shared by every node of a configuration tree.
//!
//! A [`Table`] is a handle to reference-counted storage: cloning it (or a
//! [`Value::Table`] holding it) yields another handle to the *same* entries,
//! so a mutation made through one node is visible through all of them.
//! Use [`Table::deep_copy`] when an independent tree is wanted.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

use crate::template::Schema;

/// Ordered entries of one table, in insertion order.
pub type Entries = IndexMap<String, Value>;

/// A JSON-compatible configuration value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Table(Table),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Copies the value, giving every nested table fresh storage.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Table(table) => Value::Table(table.deep_copy()),
            Value::Array(items) => Value::Array(items.iter().map(Value::deep_copy).collect()),
            other => other.clone(),
        }
    }

    /// Converts to an owned `serde_json::Value` snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Table(table) => table.to_json(),
        }
    }

    /// Returns true if `table` is reachable from this value.
    pub(crate) fn references(&self, table: &Table) -> bool {
        match self {
            Value::Table(inner) => {
                inner.ptr_eq(table)
                    || inner
                        .inner
                        .borrow()
                        .entries
                        .values()
                        .any(|value| value.references(table))
            }
            Value::Array(items) => items.iter().any(|value| value.references(table)),
            _ => false,
        }
    }
}

/// A shared, mutable, ordered mapping from string keys to values.
#[derive(Clone, Default)]
pub struct Table {
    inner: Rc<RefCell<TableData>>,
}

#[derive(Default)]
struct TableData {
    entries: Entries,
    schema: Option<&'static Schema>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`. Nested tables share storage.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().entries.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.into(), value.into())
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Snapshot of the entries; nested tables in it still share storage.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns true if both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copies the table into fresh storage, recursively. Schema bindings are kept.
    pub fn deep_copy(&self) -> Table {
        let data = self.inner.borrow();
        let entries = data
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_copy()))
            .collect();
        Table {
            inner: Rc::new(RefCell::new(TableData {
                entries,
                schema: data.schema,
            })),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.inner
                .borrow()
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub(crate) fn schema(&self) -> Option<&'static Schema> {
        self.inner.borrow().schema
    }

    pub(crate) fn bind_schema(&self, schema: &'static Schema) {
        self.inner.borrow_mut().schema = Some(schema);
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.borrow().entries == other.inner.borrow().entries
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.borrow().entries.iter())
            .finish()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl From<Entries> for Table {
    fn from(entries: Entries) -> Self {
        Table {
            inner: Rc::new(RefCell::new(TableData {
                entries,
                schema: None,
            })),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Table::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<Entries>(),
        )
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.inner.borrow();
        let mut map = serializer.serialize_map(Some(data.entries.len()))?;
        for (key, value) in &data.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Table(table) => table.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Table(map.into_iter().collect()),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from(json.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::Table(table)
    }
}
