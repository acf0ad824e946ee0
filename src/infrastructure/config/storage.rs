//! Loading `config.toml` from disk.

use super::app_config::{AppConfig, StorageConfig};
use crate::domain::ports::DEFAULT_BLUR_RADIUS;
use crate::infrastructure::image::variant_store::validate_namespace;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while locating, reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory and no explicit path.
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The default file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The default config could not be rendered as TOML.
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// A `config.toml` location.
///
/// Loading never fails on bad content: a missing file is created with the
/// defaults, an unparsable one is ignored, and out-of-range values fall back
/// to their defaults with a warning.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Uses `path_override` when given, the platform config directory otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfigDirNotFound` if there is no override and no platform directory.
    pub fn locate(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path_override
            .map(Path::to_path_buf)
            .or_else(AppConfig::default_config_path)
            .ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Config file at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the config file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the configuration, writing the defaults first if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default cannot be written.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = if self.path.exists() {
            let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;
            toml::from_str::<AppConfig>(&content).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Failed to parse config file, using defaults");
                AppConfig::default()
            })
        } else {
            info!(path = %self.path.display(), "Config file not found, creating default");
            let config = AppConfig::default();
            self.write(&config)?;
            config
        };

        sanitize(&mut config);
        config.config = Some(self.path.clone());
        Ok(config)
    }

    fn write(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        temp_file.write_all(content.as_bytes()).map_err(write_err)?;
        temp_file.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Resets values the rest of the program cannot use.
fn sanitize(config: &mut AppConfig) {
    if let Err(e) = validate_namespace(&config.storage.namespace) {
        warn!(namespace = %config.storage.namespace, error = %e, "Invalid storage namespace, using default");
        config.storage.namespace = StorageConfig::default().namespace;
    }

    let blur_radius = config.transform.blur_radius;
    if !blur_radius.is_finite() || blur_radius < 0.0 {
        warn!(blur_radius, "Invalid blur radius, using default");
        config.transform.blur_radius = DEFAULT_BLUR_RADIUS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RetentionClass;
    use tempfile::tempdir;
    use test_case::test_case;

    #[test]
    fn test_load_creates_default_if_missing() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("nested").join("config.toml"));

        let config = file.load().unwrap();
        assert_eq!(config.storage.namespace, "default");
        assert_eq!(config.config.as_deref(), Some(file.path()));
        assert!(file.path().exists());

        let written: AppConfig = toml::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(written.storage, config.storage);
    }

    #[test]
    fn test_load_handles_malformed_file() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("config.toml"));
        fs::write(file.path(), "invalid_toml = [").unwrap();

        let config = file.load().unwrap();
        assert_eq!(config.storage.namespace, "default");
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "invalid_toml = [");
    }

    #[test]
    fn test_load_reads_existing_file() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("config.toml"));
        fs::write(
            file.path(),
            "[storage]\nnamespace = \"avatars\"\nretention = \"backed-up\"\n",
        )
        .unwrap();

        let config = file.load().unwrap();
        assert_eq!(config.storage.namespace, "avatars");
        assert_eq!(config.storage.retention, RetentionClass::BackedUp);
    }

    #[test_case("" ; "empty")]
    #[test_case("a/b" ; "separator")]
    #[test_case(".." ; "parent")]
    fn test_invalid_namespace_falls_back(namespace: &str) {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("config.toml"));
        fs::write(file.path(), format!("[storage]\nnamespace = {namespace:?}\n")).unwrap();

        let config = file.load().unwrap();
        assert_eq!(config.storage.namespace, "default");
    }

    #[test_case("-1.0" ; "negative")]
    #[test_case("nan" ; "nan")]
    #[test_case("inf" ; "infinite")]
    fn test_invalid_blur_radius_falls_back(radius: &str) {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("config.toml"));
        fs::write(file.path(), format!("[transform]\nblur_radius = {radius}\n")).unwrap();

        let config = file.load().unwrap();
        assert!((config.transform.blur_radius - DEFAULT_BLUR_RADIUS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_locate_prefers_override() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom").join("pixvend.toml");

        let file = ConfigFile::locate(Some(custom.as_path())).unwrap();
        file.load().unwrap();

        assert_eq!(file.path(), custom);
        assert!(custom.exists());
    }
}
