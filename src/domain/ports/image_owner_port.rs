//! Port for entities that own exactly one source image.

use std::sync::Arc;

/// Implemented by image vendors, following the pattern that one owner has one image.
pub trait ImageOwner: Send + Sync {
    /// Identifier unique to this owner, stable across sessions.
    fn identifier(&self) -> i64;

    /// Fetches the original image, e.g. from a database or a file.
    /// Returns `None` if the owner currently has no image.
    fn original_image(&self) -> Option<Arc<image::DynamicImage>>;
}

impl<T: ImageOwner + ?Sized> ImageOwner for Arc<T> {
    fn identifier(&self) -> i64 {
        (**self).identifier()
    }

    fn original_image(&self) -> Option<Arc<image::DynamicImage>> {
        (**self).original_image()
    }
}
