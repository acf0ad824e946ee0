//! Vend DTOs.

use std::path::PathBuf;

use serde::Serialize;

use crate::domain::entities::{ImageSource, Size, Variant, VariantKey, VariantSize};

/// Request to vend one variant and write it to a file.
#[derive(Debug, Clone)]
pub struct VendRequest {
    /// Owner identifier.
    pub owner_id: i64,
    /// Requested bounding size.
    pub size: VariantSize,
    /// Requested modifiers.
    pub variant: Variant,
    /// Destination file; the encoding follows its extension.
    pub output: PathBuf,
}

impl VendRequest {
    /// Creates a request for the untouched original.
    #[must_use]
    pub fn new(owner_id: i64, output: impl Into<PathBuf>) -> Self {
        Self {
            owner_id,
            size: VariantSize::Original,
            variant: Variant::Original,
            output: output.into(),
        }
    }

    /// Sets the bounding size.
    #[must_use]
    pub const fn with_size(mut self, size: VariantSize) -> Self {
        self.size = size;
        self
    }

    /// Sets the modifiers.
    #[must_use]
    pub const fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Cache key of the requested variant.
    #[must_use]
    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.owner_id, self.size, self.variant)
    }
}

/// Outcome of a vend.
#[derive(Debug, Clone, Serialize)]
pub struct VendResponse {
    /// File the variant was written to.
    pub output: PathBuf,
    /// Pixel size of the vended variant.
    pub size: Size,
    /// Where the variant came from.
    #[serde(serialize_with = "serialize_display")]
    pub source: ImageSource,
}

fn serialize_display<S: serde::Serializer>(
    value: &ImageSource,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
