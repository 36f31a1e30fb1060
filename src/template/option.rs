use std::fmt;

use crate::config::{ConfigError, Table, Value};

use super::Schema;

/// Predicate a candidate value must satisfy.
pub type Validator = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Declaration of one named configuration option.
///
/// ```
/// use tweakcake::ConfigOption;
///
/// let timeout = ConfigOption::new("timeout", 30)
///     .with_description("Request timeout in seconds")
///     .with_validator(|v| v.as_i64().is_some_and(|n| n > 0));
///
/// assert!(timeout.validate(45.into()).is_ok());
/// assert!(timeout.validate((-1).into()).is_err());
/// ```
pub struct ConfigOption {
    name: String,
    default: serde_json::Value,
    description: Option<String>,
    validator: Option<Validator>,
    schema: Option<&'static Schema>,
}

impl ConfigOption {
    pub fn new(name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            description: None,
            validator: None,
            schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Schema for the sub-tree when the default is an object.
    pub fn with_schema(mut self, schema: &'static Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn nested_schema(&self) -> Option<&'static Schema> {
        self.schema
    }

    /// A fresh copy of the default value.
    pub fn default_value(&self) -> Value {
        Value::from(&self.default)
    }

    /// True if the default is an object, i.e. the option describes a sub-tree.
    pub fn is_table(&self) -> bool {
        self.default.is_object()
    }

    pub(crate) fn default_table(&self) -> Option<Table> {
        match self.default_value() {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns `value` unchanged if it passes the validator, if any.
    pub fn validate(&self, value: Value) -> Result<Value, ConfigError> {
        match &self.validator {
            Some(validator) if !validator(&value) => Err(ConfigError::Validation {
                option: self.name.clone(),
                value: value.to_string(),
            }),
            _ => Ok(value),
        }
    }
}

impl fmt::Debug for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("description", &self.description)
            .field("validator", &self.validator.is_some())
            .field("nested", &self.schema.is_some())
            .finish()
    }
}
