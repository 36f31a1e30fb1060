use std::cell::Cell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use super::file::load_config_file;
use super::node::{Config, Tree};
use super::source::{candidate_sources, merge_shallow};
use super::value::Table;
use crate::template::{self, Schema, Template};

/// Root of the site-wide config files.
pub const SITE_CONFIG_HOME: &str = "/etc";

/// Environment variable overriding the per-user config root.
pub const USER_CONFIG_HOME_VAR: &str = "XDG_CONFIG_HOME";

/// Builder for loading a configuration tree.
///
/// Candidate files are read in precedence order, each one's top-level keys
/// replacing the same keys from earlier files:
///
/// 1. `{site}/{name}/config.json` (site defaults to `/etc`)
/// 2. `{user}/{name}/config.json` (user defaults to `$XDG_CONFIG_HOME`, then
///    the platform config directory)
/// 3. `{custom}/{name}.json`, if a custom path is given
///
/// The last candidate is where the tree is saved. Nested objects are not
/// merged across files: a later file's object replaces an earlier one whole.
///
/// ## Example
///
/// ```no_run
/// use tweakcake::Config;
///
/// let config = Config::builder("myapp")
///     .with_custom_path("/srv/myapp")
///     .autosave(true)
///     .load();
///
/// config.set("port", 8080)?;
/// # Ok::<(), tweakcake::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .load() is called"]
pub struct ConfigBuilder {
    name: String,
    autosave: bool,
    save_on_exit: bool,
    custom_path: Option<PathBuf>,
    site_root: PathBuf,
    user_root: Option<PathBuf>,
    schema: Option<&'static Schema>,
}

impl Default for ConfigBuilder {
    /// A builder named after the running executable.
    fn default() -> Self {
        Self {
            name: program_name(),
            autosave: false,
            save_on_exit: true,
            custom_path: None,
            site_root: PathBuf::from(SITE_CONFIG_HOME),
            user_root: None,
            schema: None,
        }
    }
}

impl Config {
    /// Creates a builder for the configuration namespace `name`.
    pub fn builder(name: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            name: name.into(),
            ..ConfigBuilder::default()
        }
    }
}

impl ConfigBuilder {
    /// Save the whole tree after every write.
    pub fn autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Save the tree when its root is dropped, unless it was closed first.
    /// On by default.
    pub fn save_on_exit(mut self, save_on_exit: bool) -> Self {
        self.save_on_exit = save_on_exit;
        self
    }

    /// Adds `{path}/{name}.json` as the highest-precedence source and save target.
    pub fn with_custom_path(mut self, path: impl AsRef<Path>) -> Self {
        self.custom_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_site_config_home(mut self, path: impl AsRef<Path>) -> Self {
        self.site_root = path.as_ref().to_path_buf();
        self
    }

    /// Overrides the per-user root that would otherwise come from the environment.
    pub fn with_user_config_home(mut self, path: impl AsRef<Path>) -> Self {
        self.user_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Binds the root table to `schema`.
    pub fn with_schema(mut self, schema: &'static Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Binds the root table to the schema declared by `T`.
    pub fn with_template<T: Template>(self) -> Self {
        self.with_schema(T::schema())
    }

    /// Loads every candidate file and returns the root node.
    ///
    /// Loading never fails. Missing files are skipped quietly; unreadable or
    /// malformed ones are logged and skipped.
    pub fn load(self) -> Config {
        let user_root = self
            .user_root
            .unwrap_or_else(|| user_config_home(std::env::var_os(USER_CONFIG_HOME_VAR)));
        let sources = candidate_sources(
            &self.name,
            &self.site_root,
            &user_root,
            self.custom_path.as_deref(),
        );

        let data = Table::new();
        for source in &sources {
            match load_config_file(&source.path) {
                Ok(Some(table)) => {
                    merge_shallow(&data, table);
                    debug!("Loaded {} config from {:?}", source.kind, source.path);
                }
                Ok(None) => debug!("No {} config found at {:?}", source.kind, source.path),
                Err(e) => error!("Error loading configuration from {:?}: {e}", source.path),
            }
        }

        if let Some(schema) = self.schema {
            template::adopt(&data, schema);
        }

        Config::from_tree(
            Tree {
                name: self.name,
                autosave: self.autosave,
                custom_path: self.custom_path,
                sources,
                save_on_exit: Cell::new(self.save_on_exit),
                closed: Cell::new(false),
            },
            data,
        )
    }
}

/// Resolves the per-user config root from an `XDG_CONFIG_HOME`-style override.
///
/// An unset or empty override falls back to the platform config directory.
pub fn user_config_home(env_override: Option<OsString>) -> PathBuf {
    env_override
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from(".config"))
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "config".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, SourceKind, Value};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct Layout {
        dir: TempDir,
    }

    impl Layout {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn site(&self) -> PathBuf {
            self.dir.path().join("etc")
        }

        fn user(&self) -> PathBuf {
            self.dir.path().join("home")
        }

        fn custom(&self) -> PathBuf {
            self.dir.path().join("custom")
        }

        fn write(&self, path: PathBuf, json: serde_json::Value) {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, json.to_string()).unwrap();
        }

        fn builder(&self) -> ConfigBuilder {
            Config::builder("app")
                .with_site_config_home(self.site())
                .with_user_config_home(self.user())
                .save_on_exit(false)
        }
    }

    #[test]
    fn test_load_with_no_files_is_empty() {
        let layout = Layout::new();
        let config = layout.builder().load();

        assert!(config.is_empty());
        assert_eq!(config.name(), "app");
        assert!(config.is_root());
    }

    #[test]
    fn test_later_sources_override_earlier() {
        let layout = Layout::new();
        layout.write(layout.site().join("app/config.json"), json!({"a": "site", "b": "site"}));
        layout.write(layout.user().join("app/config.json"), json!({"a": "user"}));

        let config = layout.builder().load();

        assert_eq!(config.get("a").unwrap(), Value::from("user"));
        assert_eq!(config.get("b").unwrap(), Value::from("site"));
    }

    #[test]
    fn test_custom_path_has_highest_precedence_and_is_save_target() {
        let layout = Layout::new();
        layout.write(layout.user().join("app/config.json"), json!({"a": "user"}));
        layout.write(layout.custom().join("app.json"), json!({"a": "custom"}));

        let config = layout.builder().with_custom_path(layout.custom()).load();

        assert_eq!(config.get("a").unwrap(), Value::from("custom"));
        assert_eq!(config.sources().last().unwrap().kind, SourceKind::Custom);
        assert_eq!(config.config_files().last().unwrap(), &layout.custom().join("app.json"));
        assert_eq!(config.custom_path(), Some(layout.custom().as_path()));
    }

    #[test]
    fn test_malformed_source_is_skipped() {
        let layout = Layout::new();
        layout.write(layout.site().join("app/config.json"), json!({"a": 1}));
        fs::create_dir_all(layout.user().join("app")).unwrap();
        fs::write(layout.user().join("app/config.json"), "{ broken").unwrap();

        let config = layout.builder().load();

        assert_eq!(config.get("a").unwrap(), Value::from(1));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_nested_objects_replace_on_load() {
        let layout = Layout::new();
        layout.write(
            layout.site().join("app/config.json"),
            json!({"db": {"host": "h", "port": 1}}),
        );
        layout.write(layout.user().join("app/config.json"), json!({"db": {"port": 2}}));

        let config = layout.builder().load();

        assert_eq!(config.to_json(), json!({"db": {"port": 2}}));
        assert!(matches!(
            config.section("db").unwrap().get("host"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_user_config_home_prefers_override() {
        assert_eq!(
            user_config_home(Some(OsString::from("/tmp/xdg"))),
            PathBuf::from("/tmp/xdg")
        );
    }

    #[test]
    fn test_user_config_home_ignores_empty_override() {
        let resolved = user_config_home(Some(OsString::new()));
        assert_eq!(resolved, user_config_home(None));
        assert!(!resolved.as_os_str().is_empty());
    }

    #[test]
    fn test_default_builder_uses_program_name() {
        let builder = ConfigBuilder::default();
        assert!(!builder.name.is_empty());
        assert!(builder.save_on_exit);
    }
}
