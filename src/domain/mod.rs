//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{Modifier, RetentionClass, Variant, VariantKey, VariantSize};
pub use errors::{VendError, VendResult};
pub use ports::{ImageOwner, ImageTransformer};
