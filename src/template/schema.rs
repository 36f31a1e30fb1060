use crate::config::Value;

use super::ConfigOption;

static EMPTY: Schema = Schema {
    options: Vec::new(),
};

/// The options declared for one kind of configuration table.
///
/// Schemas are declared once, usually in a `static`, and shared by every
/// table bound to them:
///
/// ```
/// use std::sync::LazyLock;
/// use tweakcake::{ConfigOption, Schema};
///
/// static NETWORK: LazyLock<Schema> = LazyLock::new(|| {
///     Schema::new()
///         .with_option(ConfigOption::new("timeout", 30))
///         .with_option(ConfigOption::new("retry", serde_json::json!({"retries": 3})))
/// });
///
/// assert_eq!(NETWORK.default_value("timeout"), Some(30.into()));
/// ```
#[derive(Debug, Default)]
pub struct Schema {
    options: Vec<ConfigOption>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema with no options. Sub-trees without their own schema are bound to it.
    pub fn empty() -> &'static Schema {
        &EMPTY
    }

    /// Declares `option`, replacing any earlier option of the same name.
    pub fn with_option(mut self, option: ConfigOption) -> Self {
        match self.options.iter_mut().find(|o| o.name() == option.name()) {
            Some(existing) => *existing = option,
            None => self.options.push(option),
        }
        self
    }

    pub fn option(&self, name: &str) -> Option<&ConfigOption> {
        self.options.iter().find(|o| o.name() == name)
    }

    /// Options in declaration order.
    pub fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    pub fn default_value(&self, name: &str) -> Option<Value> {
        self.option(name).map(ConfigOption::default_value)
    }
}

/// A type that declares a configuration schema.
///
/// ```
/// use std::sync::LazyLock;
/// use tweakcake::{Config, ConfigOption, Schema, Template};
///
/// struct Server;
///
/// impl Template for Server {
///     fn schema() -> &'static Schema {
///         static SCHEMA: LazyLock<Schema> =
///             LazyLock::new(|| Schema::new().with_option(ConfigOption::new("port", 8080)));
///         &SCHEMA
///     }
/// }
///
/// let config = Config::builder("server")
///     .with_user_config_home(std::env::temp_dir())
///     .with_site_config_home(std::env::temp_dir())
///     .save_on_exit(false)
///     .with_template::<Server>()
///     .load();
/// assert_eq!(config.get("port").unwrap().as_i64(), Some(8080));
/// ```
pub trait Template {
    fn schema() -> &'static Schema;
}
