//! Mapping nodes: views over one table of a configuration tree.

use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Serialize, Serializer};
use tracing::{error, info};

use super::file::{write_config_file, DEFAULT_MODE};
use super::source::ConfigSource;
use super::value::{Table, Value};
use super::ConfigError;
use crate::template::{self, Schema};

/// Settings shared by every node of one tree. Only the root acts on the paths.
#[derive(Debug)]
pub(crate) struct Tree {
    pub(crate) name: String,
    pub(crate) autosave: bool,
    pub(crate) custom_path: Option<PathBuf>,
    pub(crate) sources: Vec<ConfigSource>,
    pub(crate) save_on_exit: Cell<bool>,
    pub(crate) closed: Cell<bool>,
}

/// A node of a configuration tree.
///
/// Every node is a view over a [`Table`] of the tree's backing structure;
/// nothing is copied when a sub-table is wrapped with [`section`](Self::section),
/// so writes through any node are visible through all of them and in the next
/// save. Cloning a `Config` yields another handle to the same node.
///
/// If the table is bound to a [`Schema`] (see [`ConfigBuilder::with_schema`](super::ConfigBuilder::with_schema)),
/// reads of unset keys fall back to declared defaults and writes are validated.
///
/// The root saves itself when dropped unless `save_on_exit` was disabled or
/// the tree was [closed](Self::close).
#[derive(Clone)]
pub struct Config {
    node: Rc<Node>,
}

struct Node {
    data: Table,
    parent: Option<Config>,
    tree: Rc<Tree>,
}

impl Node {
    fn write(&self, mode: u32) -> Result<(), ConfigError> {
        let Some(target) = self.tree.sources.last() else {
            return Ok(());
        };
        write_config_file(&target.path, &self.data, mode)?;
        info!("Configuration saved to {}", target.path.display());
        Ok(())
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if self.parent.is_some() || self.tree.closed.get() || !self.tree.save_on_exit.get() {
            return;
        }
        if let Err(e) = self.write(DEFAULT_MODE) {
            error!("Failed to save configuration '{}' on exit: {e}", self.tree.name);
        }
    }
}

impl Config {
    pub(crate) fn from_tree(tree: Tree, data: Table) -> Self {
        Self {
            node: Rc::new(Node {
                data,
                parent: None,
                tree: Rc::new(tree),
            }),
        }
    }

    fn child(&self, data: Table) -> Self {
        Self {
            node: Rc::new(Node {
                data,
                parent: Some(self.clone()),
                tree: Rc::clone(&self.node.tree),
            }),
        }
    }

    /// The namespace name used to locate config files.
    pub fn name(&self) -> &str {
        &self.node.tree.name
    }

    pub fn parent(&self) -> Option<&Config> {
        self.node.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// Follows the parent chain to the root node.
    pub fn root(&self) -> &Config {
        let mut node = self;
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    pub fn autosave(&self) -> bool {
        self.node.tree.autosave
    }

    pub fn custom_path(&self) -> Option<&Path> {
        self.node.tree.custom_path.as_deref()
    }

    /// Candidate sources, lowest precedence first.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.node.tree.sources
    }

    /// Candidate file paths, lowest precedence first. The last one is the save target.
    pub fn config_files(&self) -> Vec<PathBuf> {
        self.sources().iter().map(|s| s.path.clone()).collect()
    }

    /// Handle to this node's storage in the backing structure.
    pub fn table(&self) -> &Table {
        &self.node.data
    }

    pub fn schema(&self) -> Option<&'static Schema> {
        self.node.data.schema()
    }

    /// Returns the value under `key`.
    ///
    /// Tables come back as handles to the live storage. An unset key that the
    /// node's schema declares yields the declared default.
    pub fn get(&self, key: &str) -> Result<Value, ConfigError> {
        if let Some(value) = self.node.data.get(key) {
            return Ok(value);
        }
        self.schema()
            .and_then(|schema| schema.default_value(key))
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Wraps the table under `key` in a child node whose parent is `self`.
    ///
    /// An unset key whose schema default is an object gets that default
    /// stored first, so the child always writes into the tree.
    pub fn section(&self, key: &str) -> Result<Config, ConfigError> {
        let installed = match self.schema() {
            Some(schema) if !self.node.data.contains_key(key) => {
                template::install_default(&self.node.data, schema, key)
            }
            _ => None,
        };
        if let Some(table) = installed {
            return Ok(self.child(table));
        }
        match self.get(key)? {
            Value::Table(table) => Ok(self.child(table)),
            _ => Err(ConfigError::NotATable(key.to_string())),
        }
    }

    /// Stores `value` under `key`, saving the whole tree if autosave is on.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let (key, value) = (key.into(), value.into());
        match self.schema() {
            Some(schema) => template::write(self, schema, key, value),
            None => self.store(key, value),
        }
    }

    /// Plain replacing write, without schema handling.
    pub(crate) fn store(&self, key: String, value: Value) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let mut lineage = std::iter::successors(Some(self), |node| node.parent());
        if lineage.any(|node| value.references(&node.node.data)) {
            return Err(ConfigError::CyclicValue(key));
        }
        self.node.data.insert(key, value);
        self.autosave_now()
    }

    /// Removes `key` and returns its value.
    pub fn delete(&self, key: &str) -> Result<Value, ConfigError> {
        self.ensure_open()?;
        let removed = self
            .node
            .data
            .remove(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        self.autosave_now()?;
        Ok(removed)
    }

    /// Sets every entry in turn, stopping at the first failure.
    pub fn update<I, K, V>(&self, entries: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// True if `key` is stored; schema defaults don't count.
    pub fn contains_key(&self, key: &str) -> bool {
        self.node.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.node.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.data.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.node.data.keys()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.node.data.entries()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.node.data.to_json()
    }

    /// Saves the whole tree with [`DEFAULT_MODE`] permissions.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_with_mode(DEFAULT_MODE)
    }

    /// Saves the whole tree. Any node may be used; the root does the writing.
    pub fn save_with_mode(&self, mode: u32) -> Result<(), ConfigError> {
        self.ensure_open()?;
        self.root().node.write(mode)
    }

    /// Saves the tree and closes it.
    ///
    /// Returns `Ok(false)` without saving if the tree was already closed. A
    /// closed tree rejects writes and saves and is not saved again on drop.
    pub fn close(&self) -> Result<bool, ConfigError> {
        let root = self.root();
        let tree = &root.node.tree;
        if tree.closed.get() {
            return Ok(false);
        }
        root.node.write(DEFAULT_MODE)?;
        tree.closed.set(true);
        tree.save_on_exit.set(false);
        Ok(true)
    }

    pub fn is_closed(&self) -> bool {
        self.node.tree.closed.get()
    }

    fn ensure_open(&self) -> Result<(), ConfigError> {
        if self.is_closed() {
            return Err(ConfigError::Closed);
        }
        Ok(())
    }

    fn autosave_now(&self) -> Result<(), ConfigError> {
        if self.autosave() {
            self.save()
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name())
            .field("root", &self.is_root())
            .field("data", &self.node.data)
            .finish()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.node.data, f)
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.data.serialize(serializer)
    }
}

impl From<&Config> for Value {
    fn from(config: &Config) -> Self {
        Value::Table(config.table().clone())
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::from(&config)
    }
}
