//! Retention policy of a variant store namespace.

use serde::{Deserialize, Serialize};

/// How long stored variants are expected to live.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionClass {
    /// Wiped when the owning store instance is dropped.
    Temporary,
    /// Lives in the cache root; may be purged by external storage pressure.
    #[default]
    Reloadable,
    /// Never removed automatically.
    UserGenerated,
    /// Never removed automatically and eligible for backup.
    BackedUp,
}

impl RetentionClass {
    /// Returns true if records are never removed automatically.
    #[must_use]
    pub const fn is_durable(self) -> bool {
        matches!(self, Self::UserGenerated | Self::BackedUp)
    }

    /// Returns true if records should be included in backups.
    #[must_use]
    pub const fn is_backed_up(self) -> bool {
        matches!(self, Self::BackedUp)
    }

    /// Returns true if the store wipes its records when dropped.
    #[must_use]
    pub const fn wipes_on_drop(self) -> bool {
        matches!(self, Self::Temporary)
    }
}

impl std::fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temporary => write!(f, "temporary"),
            Self::Reloadable => write!(f, "reloadable"),
            Self::UserGenerated => write!(f, "user-generated"),
            Self::BackedUp => write!(f, "backed-up"),
        }
    }
}
