//! Use case implementations.

mod maintain_store_use_case;
mod vend_variant_use_case;

pub use maintain_store_use_case::MaintainStoreUseCase;
pub use vend_variant_use_case::VendVariantUseCase;
