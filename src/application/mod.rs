//! Application layer with use cases and DTOs.

/// Data transfer objects.
pub mod dto;
/// Use case implementations.
pub mod use_cases;

pub use dto::{StoreSummary, SweepRequest, VendRequest, VendResponse};
pub use use_cases::{MaintainStoreUseCase, VendVariantUseCase};
