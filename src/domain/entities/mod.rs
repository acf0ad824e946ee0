//! Domain entity definitions.

mod geometry;
mod retention;
mod variant;
mod vended;

pub use geometry::{Point, Rect, Size};
pub use retention::RetentionClass;
pub use variant::{Modifier, OwnerKey, Variant, VariantKey, VariantSize};
pub use vended::{CacheEntry, ImageSource, StoredImage, StoredRecord};
