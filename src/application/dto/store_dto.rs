//! Store maintenance DTOs.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::entities::RetentionClass;

/// Which timestamp an age sweep compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepRequest {
    /// Records created strictly before the threshold.
    CreatedBefore(DateTime<Utc>),
    /// Records last accessed strictly before the threshold.
    AccessedBefore(DateTime<Utc>),
}

impl SweepRequest {
    /// Sweep of records created more than `hours` ago.
    #[must_use]
    pub fn created_hours_ago(hours: u32) -> Self {
        Self::CreatedBefore(Utc::now() - Duration::hours(i64::from(hours)))
    }

    /// Sweep of records not accessed for more than `hours`.
    #[must_use]
    pub fn accessed_hours_ago(hours: u32) -> Self {
        Self::AccessedBefore(Utc::now() - Duration::hours(i64::from(hours)))
    }

    /// Cut-off time of the sweep.
    #[must_use]
    pub const fn threshold(&self) -> DateTime<Utc> {
        match self {
            Self::CreatedBefore(t) | Self::AccessedBefore(t) => *t,
        }
    }
}

/// Snapshot of one namespace, printed by `pixvend stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    /// Namespace name.
    pub namespace: String,
    /// Retention class.
    pub retention: RetentionClass,
    /// Namespace directory.
    pub dir: PathBuf,
    /// Number of records.
    pub records: usize,
    /// Total record size in bytes.
    pub total_bytes: u64,
    /// Least recent access among the records.
    pub oldest_access: Option<DateTime<Utc>>,
}
