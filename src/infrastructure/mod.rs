//! Infrastructure layer with image, storage and configuration adapters.

/// Application configuration.
pub mod config;
/// Image handling (transforms, vend cache, variant store).
pub mod image;

pub use config::{AppConfig, CliArgs, Command, ConfigError, ConfigFile, LogLevel};
pub use image::{
    FileImageOwner, RasterTransformer, StoreRoots, VariantStore, VendCache, VendStats,
};
