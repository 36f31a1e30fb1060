use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("value at '{0}' is not a table")]
    NotATable(String),

    #[error("validation failed for {option}: {value}")]
    Validation { option: String, value: String },

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("config file '{0}' does not contain a JSON object")]
    NotAnObject(PathBuf),

    #[error("failed to create config directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write temporary config file in '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to back up config file to '{path}': {source}")]
    BackupError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move config file into place at '{path}': {source}")]
    PersistError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set permissions on '{path}': {source}")]
    PermissionError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("configuration has been closed")]
    Closed,

    #[error("storing '{0}' would make the configuration tree cyclic")]
    CyclicValue(String),
}
