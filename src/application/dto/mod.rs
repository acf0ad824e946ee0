//! Data transfer objects for the application layer.

mod store_dto;
mod vend_dto;

pub use store_dto::{StoreSummary, SweepRequest};
pub use vend_dto::{VendRequest, VendResponse};
