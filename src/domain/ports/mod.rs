mod image_owner_port;
mod image_transformer_port;

pub use image_owner_port::ImageOwner;
pub use image_transformer_port::{DEFAULT_BLUR_RADIUS, ImageTransformer, ensure_drawable};
