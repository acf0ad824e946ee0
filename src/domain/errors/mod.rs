//! Domain error types.

mod vend_error;

pub use vend_error::{VendError, VendResult};
