//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::entities::RetentionClass;
use crate::domain::ports::DEFAULT_BLUR_RADIUS;
use crate::infrastructure::image::StoreRoots;

const APP_NAME: &str = "pixvend";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "pixvend";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Variant store configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Transform configuration.
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Variant store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all retention roots; platform dirs when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Namespace used by the CLI.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Retention class of that namespace.
    #[serde(default)]
    pub retention: RetentionClass,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            namespace: default_namespace(),
            retention: RetentionClass::default(),
        }
    }
}

/// Transform configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Blur radius in pixels used for blurred variants.
    #[serde(default = "default_blur_radius")]
    pub blur_radius: f32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            blur_radius: default_blur_radius(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

const fn default_blur_radius() -> f32 {
    DEFAULT_BLUR_RADIUS
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(root) = &args.root {
            self.storage.root = Some(root.clone());
        }
        if let Some(namespace) = &args.namespace {
            self.storage.namespace.clone_from(namespace);
        }
        if let Some(retention) = args.retention {
            self.storage.retention = retention;
        }
        if let Some(blur_radius) = args.blur_radius {
            self.transform.blur_radius = blur_radius;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("pixvend.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Storage roots honoring the configured base directory.
    #[must_use]
    pub fn store_roots(&self) -> StoreRoots {
        self.storage
            .root
            .as_ref()
            .map_or_else(StoreRoots::default_location, StoreRoots::under)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            storage: StorageConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config_sections() {
        let toml_content = r#"
            log_level = "debug"

            [storage]
            root = "/srv/pixvend"
            namespace = "avatars"
            retention = "user-generated"

            [transform]
            blur_radius = 4.5
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.storage.root, Some(PathBuf::from("/srv/pixvend")));
        assert_eq!(config.storage.namespace, "avatars");
        assert_eq!(config.storage.retention, RetentionClass::UserGenerated);
        assert!((config.transform.blur_radius - 4.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let config: AppConfig = toml::from_str("").expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.storage.namespace, "default");
        assert_eq!(config.storage.retention, RetentionClass::Reloadable);
        assert!((config.transform.blur_radius - DEFAULT_BLUR_RADIUS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "pixvend",
            "--log-level",
            "trace",
            "--namespace",
            "thumbs",
            "--retention",
            "temporary",
            "--root",
            "/tmp/base",
            "--blur-radius",
            "2",
            "clear",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.storage.namespace, "thumbs");
        assert_eq!(config.storage.retention, RetentionClass::Temporary);
        assert_eq!(config.store_roots(), StoreRoots::under("/tmp/base"));
        assert!((config.transform.blur_radius - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_keeps_file_values_without_flags() {
        let mut config = AppConfig::default();
        config.storage.namespace = "from-file".to_string();

        config.merge_with_args(&CliArgs::parse_from(["pixvend", "stats"]));

        assert_eq!(config.storage.namespace, "from-file");
        assert_eq!(config.log_level, LogLevel::Info);
    }
}
