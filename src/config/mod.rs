//! Layered configuration trees backed by JSON files.

mod builder;
mod error;
mod file;
mod node;
mod source;
mod value;

pub use builder::{user_config_home, ConfigBuilder, SITE_CONFIG_HOME, USER_CONFIG_HOME_VAR};
pub use error::ConfigError;
pub use file::{backup_path, DEFAULT_MODE};
pub use node::Config;
pub use source::{ConfigSource, SourceKind};
pub use value::{Entries, Table, Value};
