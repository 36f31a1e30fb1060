use std::fmt;
use std::path::{Path, PathBuf};

use super::value::Table;

/// Where a candidate config file sits in the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    Site,
    User,
    Custom,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Site => "site",
            SourceKind::User => "user",
            SourceKind::Custom => "custom",
        })
    }
}

/// One candidate config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: SourceKind,
    pub path: PathBuf,
}

/// Lists the candidate files for `name`, lowest precedence first.
///
/// The last entry is also where the tree is saved.
pub fn candidate_sources(
    name: &str,
    site_root: &Path,
    user_root: &Path,
    custom_path: Option<&Path>,
) -> Vec<ConfigSource> {
    let mut sources = vec![
        ConfigSource {
            kind: SourceKind::Site,
            path: site_root.join(name).join("config.json"),
        },
        ConfigSource {
            kind: SourceKind::User,
            path: user_root.join(name).join("config.json"),
        },
    ];
    if let Some(custom) = custom_path {
        sources.push(ConfigSource {
            kind: SourceKind::Custom,
            path: custom.join(format!("{name}.json")),
        });
    }
    sources
}

/// Merges `overlay` into `base` one level deep: each top-level key of the
/// overlay replaces the base's entry wholesale, nested tables included.
pub fn merge_shallow(base: &Table, overlay: Table) {
    for (key, value) in overlay.entries() {
        base.insert(key, value);
    }
}
