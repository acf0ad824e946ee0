//! Root directories per retention class.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::warn;

use crate::domain::entities::RetentionClass;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "pixvend";
const APP_NAME: &str = "pixvend";

/// Marks a directory as regenerable cache content for backup tools.
const CACHEDIR_TAG: &str = "CACHEDIR.TAG";
const CACHEDIR_TAG_CONTENT: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by pixvend.\n\
# For information about cache directory tags see https://bford.info/cachedir/\n";

/// Excludes a directory from backups without declaring it a cache.
const NO_BACKUP_MARKER: &str = ".nobackup";

/// Where each retention class keeps its namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRoots {
    /// Durable root for `UserGenerated` and `BackedUp`.
    pub data: PathBuf,
    /// Purgeable root for `Reloadable`.
    pub cache: PathBuf,
    /// Scratch root for `Temporary`.
    pub scratch: PathBuf,
}

impl StoreRoots {
    /// Platform locations (e.g. `~/.local/share/pixvend/variants`,
    /// `~/.cache/pixvend/variants`, `$TMPDIR/pixvend/scratch`).
    #[must_use]
    pub fn default_location() -> Self {
        let scratch = std::env::temp_dir().join(APP_NAME).join("scratch");
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
            || {
                let fallback = std::env::temp_dir().join(APP_NAME);
                Self {
                    data: fallback.join("data"),
                    cache: fallback.join("cache"),
                    scratch: scratch.clone(),
                }
            },
            |dirs| Self {
                data: dirs.data_dir().join("variants"),
                cache: dirs.cache_dir().join("variants"),
                scratch: scratch.clone(),
            },
        )
    }

    /// All roots below a single base directory.
    #[must_use]
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            data: base.join("data"),
            cache: base.join("cache"),
            scratch: base.join("scratch"),
        }
    }

    /// Returns the root used by `retention`.
    #[must_use]
    pub fn root_for(&self, retention: RetentionClass) -> &Path {
        match retention {
            RetentionClass::UserGenerated | RetentionClass::BackedUp => &self.data,
            RetentionClass::Reloadable => &self.cache,
            RetentionClass::Temporary => &self.scratch,
        }
    }
}

impl Default for StoreRoots {
    fn default() -> Self {
        Self::default_location()
    }
}

/// Writes the backup marker matching `retention` into a namespace directory.
///
/// Markers are advisory, so failures are only logged.
pub(crate) fn mark_namespace_dir(dir: &Path, retention: RetentionClass) {
    let marker = match retention {
        RetentionClass::Temporary | RetentionClass::Reloadable => {
            Some((CACHEDIR_TAG, CACHEDIR_TAG_CONTENT))
        }
        RetentionClass::UserGenerated => Some((NO_BACKUP_MARKER, "")),
        RetentionClass::BackedUp => None,
    };

    let Some((name, content)) = marker else {
        return;
    };

    let path = dir.join(name);
    if path.exists() {
        return;
    }
    if let Err(e) = fs::write(&path, content) {
        warn!(path = %path.display(), error = %e, "Failed to write retention marker");
    }
}
