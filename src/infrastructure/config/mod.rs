//! Application configuration.

/// Configuration model.
pub mod app_config;
/// Command line arguments.
pub mod args;
/// Config file loading.
pub mod storage;

pub use app_config::{AppConfig, LogLevel, StorageConfig, TransformConfig};
pub use args::{CliArgs, Command, SizeArgs, SweepArgs, VendArgs};
pub use storage::{ConfigError, ConfigFile};
