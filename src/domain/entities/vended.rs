//! Domain types for vended and stored images.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Size, Variant, VariantKey, VariantSize};

/// A resolved variant held in memory by the vend cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Address of the variant.
    pub key: VariantKey,
    /// Shared bitmap handed to callers.
    pub image: Arc<image::DynamicImage>,
    /// When the entry was inserted.
    pub created_at: DateTime<Utc>,
    /// When the entry was last vended.
    pub last_access: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(key: VariantKey, image: Arc<image::DynamicImage>) -> Self {
        let now = Utc::now();
        Self {
            key,
            image,
            created_at: now,
            last_access: now,
        }
    }

    /// Marks the entry as just vended.
    pub fn touch(&mut self) {
        self.last_access = Utc::now();
    }
}

/// A decoded image read back from a variant store.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Decoded bitmap.
    pub image: image::DynamicImage,
    /// Display density multiplier; pixels per point.
    pub scale: f32,
}

impl StoredImage {
    /// Wraps a decoded bitmap with its display scale.
    #[must_use]
    pub const fn new(image: image::DynamicImage, scale: f32) -> Self {
        Self { image, scale }
    }

    /// Size in pixels.
    #[must_use]
    pub fn pixel_size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    /// Size in display points, rounded to the nearest point.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn point_size(&self) -> Size {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        Size::new(
            (self.image.width() as f32 / scale).round() as u32,
            (self.image.height() as f32 / scale).round() as u32,
        )
    }

    /// Returns the bitmap.
    #[must_use]
    pub fn into_inner(self) -> image::DynamicImage {
        self.image
    }
}

/// Metadata of one record on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    /// File holding the record.
    pub path: PathBuf,
    /// Hashed key as it appears in the file name.
    pub key_digest: String,
    /// Modifiers of the stored variant.
    pub variant: Variant,
    /// Bounding size of the stored variant.
    pub size: VariantSize,
    /// Size on disk in bytes.
    pub len: u64,
    /// Last write of the record; records are only replaced whole.
    pub created_at: DateTime<Utc>,
    /// Last successful read or write.
    pub accessed_at: DateTime<Utc>,
}

/// Where a vended image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Already resolved in memory.
    Memory,
    /// Decoded from the backing variant store.
    Store,
    /// Rendered from the owner's original.
    Rendered,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Store => write!(f, "store"),
            Self::Rendered => write!(f, "rendered"),
        }
    }
}
