//! Declarative schemas for configuration tables.
//!
//! A table bound to a [`Schema`] turns its node into a schema node: reading
//! an unset declared key returns the option's default, writing a declared
//! key runs the option's validator first, and options whose default is an
//! object are materialized as schema-bound sub-tables up front so they can
//! be navigated and edited before anything was written.

mod option;
mod schema;

pub use option::{ConfigOption, Validator};
pub use schema::{Schema, Template};

use crate::config::{Config, ConfigError, Table, Value};

/// Binds `table` to `schema` and installs the object defaults it declares.
///
/// An object already stored under such an option is kept and only gains the
/// default keys it lacks; anything else stored there is replaced by the
/// default. Sub-tables are bound to the option's nested schema, or to
/// [`Schema::empty`].
pub(crate) fn adopt(table: &Table, schema: &'static Schema) {
    table.bind_schema(schema);
    for option in schema.options() {
        let Some(defaults) = option.default_table() else {
            continue;
        };
        let nested = option.nested_schema().unwrap_or(Schema::empty());
        match table.get(option.name()) {
            Some(Value::Table(existing)) => {
                for (key, value) in defaults.entries() {
                    if !existing.contains_key(&key) {
                        existing.insert(key, value);
                    }
                }
                adopt(&existing, nested);
            }
            _ => {
                adopt(&defaults, nested);
                table.insert(option.name(), Value::Table(defaults));
            }
        }
    }
}

/// Schema-aware write of `value` under `key` of `node`.
///
/// A declared option validates the value first. An object written over a
/// schema-bound sub-table is merged into it key by key, so sibling keys
/// survive and the sub-table's own validators run. Otherwise the value
/// replaces what was stored.
pub(crate) fn write(
    node: &Config,
    schema: &'static Schema,
    key: String,
    value: Value,
) -> Result<(), ConfigError> {
    let option = schema.option(&key);
    let value = match option {
        Some(option) => option.validate(value)?,
        None => value,
    };

    if let Value::Table(incoming) = &value {
        if let Some(Value::Table(existing)) = node.table().get(&key) {
            if existing.schema().is_some() && !existing.ptr_eq(incoming) {
                check_merge(&existing, incoming)?;
                let child = node.section(&key)?;
                for (sub_key, sub_value) in incoming.entries() {
                    child.set(sub_key, sub_value)?;
                }
                return Ok(());
            }
        }
        if let Some(option) = option.filter(|o| o.is_table()) {
            adopt(incoming, option.nested_schema().unwrap_or(Schema::empty()));
        }
    }

    node.store(key, value)
}

/// Runs every validator a merge of `incoming` into `existing` would hit,
/// without writing anything.
fn check_merge(existing: &Table, incoming: &Table) -> Result<(), ConfigError> {
    let schema = existing.schema().unwrap_or(Schema::empty());
    for (key, value) in incoming.entries() {
        if let Some(option) = schema.option(&key) {
            option.validate(value.clone())?;
        }
        if let (Value::Table(sub_incoming), Some(Value::Table(sub_existing))) =
            (&value, existing.get(&key))
        {
            if sub_existing.schema().is_some() && !sub_existing.ptr_eq(sub_incoming) {
                check_merge(&sub_existing, sub_incoming)?;
            }
        }
    }
    Ok(())
}

/// Installs the default sub-table declared for `key` into `table`, bound the
/// way construction binds it. Returns `None` if `key` has no object default.
pub(crate) fn install_default(table: &Table, schema: &'static Schema, key: &str) -> Option<Table> {
    let option = schema.option(key).filter(|o| o.is_table())?;
    let defaults = option.default_table()?;
    adopt(&defaults, option.nested_schema().unwrap_or(Schema::empty()));
    table.insert(key, Value::Table(defaults.clone()));
    Some(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::sync::LazyLock;
    use tempfile::TempDir;

    static RETRY: LazyLock<Schema> = LazyLock::new(|| {
        Schema::new().with_option(
            ConfigOption::new("retries", 3).with_validator(|v| v.as_i64().is_some_and(|n| n >= 0)),
        )
    });

    static SERVICE: LazyLock<Schema> = LazyLock::new(|| {
        Schema::new()
            .with_option(
                ConfigOption::new("timeout", 30)
                    .with_description("Request timeout in seconds")
                    .with_validator(|v| v.as_i64().is_some_and(|n| n > 0)),
            )
            .with_option(
                ConfigOption::new("retry", json!({"retries": 3, "backoff": 2})).with_schema(&RETRY),
            )
            .with_option(ConfigOption::new("labels", json!({})))
    });

    fn load(dir: &TempDir) -> Config {
        Config::builder("svc")
            .with_site_config_home(dir.path().join("etc"))
            .with_user_config_home(dir.path().join("home"))
            .save_on_exit(false)
            .with_schema(&SERVICE)
            .load()
    }

    fn user_file(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("home").join("svc").join("config.json")
    }

    #[test]
    fn test_unset_option_reads_default_without_storing() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        assert_eq!(config.get("timeout").unwrap(), Value::from(30));
        assert!(!config.contains_key("timeout"));

        config.set("timeout", 45).unwrap();
        assert_eq!(config.get("timeout").unwrap(), Value::from(45));
    }

    #[test]
    fn test_undeclared_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        assert!(matches!(config.get("nope"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_object_defaults_are_materialized() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        let retry = config.section("retry").unwrap();
        assert_eq!(retry.get("retries").unwrap(), Value::from(3));
        assert!(std::ptr::eq(retry.schema().unwrap(), &*RETRY));
        assert!(config.section("labels").unwrap().schema().is_some());

        retry.set("retries", 7).unwrap();
        assert_eq!(config.to_json()["retry"], json!({"retries": 7, "backoff": 2}));
    }

    #[test]
    fn test_rejected_value_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        config.set("timeout", 10).unwrap();

        let result = config.set("timeout", -1);

        assert!(matches!(result, Err(ConfigError::Validation { option, .. }) if option == "timeout"));
        assert_eq!(config.get("timeout").unwrap(), Value::from(10));
    }

    #[test]
    fn test_object_write_merges_into_sub_tree() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        let retry = config.section("retry").unwrap();

        config.set("retry", json!({"retries": 5})).unwrap();

        assert_eq!(retry.get("retries").unwrap(), Value::from(5));
        assert_eq!(retry.get("backoff").unwrap(), Value::from(2));
        assert!(config.get("retry").unwrap().as_table().unwrap().ptr_eq(retry.table()));
    }

    #[test]
    fn test_merge_runs_nested_validators() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        let result = config.set("retry", json!({"retries": -4}));

        assert!(matches!(result, Err(ConfigError::Validation { option, .. }) if option == "retries"));
        assert_eq!(config.section("retry").unwrap().get("retries").unwrap(), Value::from(3));
    }

    #[test]
    fn test_rejected_merge_leaves_sub_tree_unchanged() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder("svc")
            .with_site_config_home(dir.path().join("etc"))
            .with_user_config_home(dir.path().join("home"))
            .save_on_exit(false)
            .autosave(true)
            .with_schema(&SERVICE)
            .load();

        let result = config.set("retry", json!({"backoff": 9, "retries": -4}));

        assert!(matches!(result, Err(ConfigError::Validation { option, .. }) if option == "retries"));
        assert_eq!(config.to_json()["retry"], json!({"retries": 3, "backoff": 2}));
        assert!(!user_file(&dir).exists());
    }

    #[test]
    fn test_section_after_delete_is_attached() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        config.delete("retry").unwrap();

        let retry = config.section("retry").unwrap();
        retry.set("retries", 9).unwrap();
        config.save().unwrap();

        assert!(retry.table().ptr_eq(config.get("retry").unwrap().as_table().unwrap()));
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(user_file(&dir)).unwrap()).unwrap();
        assert_eq!(written["retry"], json!({"retries": 9, "backoff": 2}));
    }

    #[test]
    fn test_section_of_scalar_default_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        assert!(matches!(config.section("timeout"), Err(ConfigError::NotATable(_))));
        assert!(!config.contains_key("timeout"));
    }

    #[test]
    fn test_object_written_after_delete_is_bound() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        config.delete("retry").unwrap();

        config.set("retry", json!({"backoff": 9})).unwrap();

        let retry = config.section("retry").unwrap();
        assert!(retry.schema().is_some());
        assert_eq!(retry.get("retries").unwrap(), Value::from(3));
        assert!(!retry.contains_key("retries"));
    }

    #[test]
    fn test_loaded_sub_tree_keeps_values_and_gains_defaults() {
        let dir = TempDir::new().unwrap();
        let path = user_file(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, json!({"retry": {"retries": 8}, "extra": [1]}).to_string()).unwrap();

        let config = load(&dir);

        assert_eq!(
            config.to_json(),
            json!({"retry": {"retries": 8, "backoff": 2}, "extra": [1], "labels": {}})
        );
    }

    #[test]
    fn test_default_absent_from_file_until_written() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.save().unwrap();
        assert!(!fs::read_to_string(user_file(&dir)).unwrap().contains("timeout"));

        config.set("timeout", 30).unwrap();
        config.save().unwrap();
        assert!(fs::read_to_string(user_file(&dir)).unwrap().contains("\"timeout\": 30"));
    }

    #[test]
    fn test_undeclared_key_writes_through() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set("free", json!({"a": 1})).unwrap();
        config.set("free", json!({"b": 2})).unwrap();

        assert_eq!(config.get("free").unwrap().to_json(), json!({"b": 2}));
    }
}
