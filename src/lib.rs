//! Layered JSON configuration trees with declarative schemas.
//!
//! Values are JSON-compatible: null, booleans, numbers, strings, arrays and
//! tables. JSON has no NaN or infinity, so converting a non-finite `f64` into
//! a [`Value`] yields [`Value::Null`]; check `is_finite` before storing floats
//! that may not be.

pub mod config;
pub mod template;

pub use config::{Config, ConfigBuilder, ConfigError, Table, Value};
pub use template::{ConfigOption, Schema, Template};
