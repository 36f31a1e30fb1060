//! Reading candidate config files and writing the save target atomically.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use super::value::{Table, Value};
use super::ConfigError;

/// Owner read/write only.
pub const DEFAULT_MODE: u32 = 0o600;

/// Loads and parses a JSON config file.
///
/// Returns `Ok(None)` if the file doesn't exist. The top level must be an object.
pub fn load_config_file(path: &Path) -> Result<Option<Table>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let value: Value =
                serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            match value {
                Value::Table(table) => Ok(Some(table)),
                _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Path of the single backup kept next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Writes `table` to `path` without ever exposing a partial file.
///
/// The JSON goes to a temporary file in the target directory. Any existing
/// target is copied to `<path>.bak`, then the temporary file is renamed over
/// the target and given `mode`. If a step before the rename fails, the
/// temporary file is removed and the target is left as it was.
pub fn write_config_file(path: &Path, table: &Table, mode: u32) -> Result<(), ConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let write_error = |e| ConfigError::WriteError {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b" "));
        table.serialize(&mut serializer)?;
        writer.flush().map_err(write_error)?;
    }
    temp.as_file().sync_all().map_err(write_error)?;

    if path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|e| ConfigError::BackupError {
            path: backup,
            source: e,
        })?;
    }

    temp.persist(path).map_err(|e| ConfigError::PersistError {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        ConfigError::PermissionError {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ConfigError> {
    Ok(())
}
