//! Error types for vending and persisting variants.

use thiserror::Error;

/// Result type for vend and store operations.
pub type VendResult<T> = std::result::Result<T, VendError>;

/// Failures surfaced by the vend cache, the variant store and transforms.
///
/// None of these are retried internally.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum VendError {
    #[error("no original image available for owner {owner}")]
    NotAvailable { owner: String },

    #[error("invalid address component {component:?}: {reason}")]
    InvalidAddress { component: String, reason: String },

    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid transform input: {reason}")]
    InvalidInput { reason: String },
}

impl VendError {
    /// Creates a not-available error.
    #[must_use]
    pub fn not_available(owner: impl std::fmt::Display) -> Self {
        Self::NotAvailable {
            owner: owner.to_string(),
        }
    }

    /// Creates an invalid address error.
    #[must_use]
    pub fn invalid_address(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write error.
    #[must_use]
    pub fn write(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a read error.
    #[must_use]
    pub fn read(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns true if the owner simply had nothing to vend.
    #[must_use]
    pub const fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }

    /// Returns true if the failure came from the storage layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Read { .. })
    }
}
