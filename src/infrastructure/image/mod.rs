//! Image handling infrastructure.
//!
//! This module provides:
//! - Raster transforms on `image` buffers
//! - Per-retention storage roots
//! - Namespaced on-disk variant persistence
//! - The in-memory single-flight vend cache
//! - File-backed image owners

/// File-backed image owners.
pub mod file_owner;
/// Default raster transforms.
pub mod raster_transformer;
/// Storage roots per retention class.
pub mod store_roots;
/// On-disk variant persistence.
pub mod variant_store;
/// Single-flight in-memory vend cache.
pub mod vend_cache;

pub use file_owner::FileImageOwner;
pub use raster_transformer::RasterTransformer;
pub use store_roots::StoreRoots;
pub use variant_store::{RECORD_EXTENSION, VariantStore};
pub use vend_cache::{VendCache, VendStats};
