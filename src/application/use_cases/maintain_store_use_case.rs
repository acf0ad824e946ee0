//! Store maintenance use case implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::application::dto::{StoreSummary, SweepRequest};
use crate::domain::entities::{Variant, VariantSize};
use crate::infrastructure::image::VariantStore;

/// Explicit maintenance of one variant store namespace.
#[derive(Clone)]
pub struct MaintainStoreUseCase {
    store: Arc<VariantStore>,
}

impl MaintainStoreUseCase {
    /// Creates the use case over a shared store.
    #[must_use]
    pub const fn new(store: Arc<VariantStore>) -> Self {
        Self { store }
    }

    /// Runs an age sweep and returns how many records were deleted.
    pub fn sweep(&self, request: SweepRequest) -> usize {
        let removed = match request {
            SweepRequest::CreatedBefore(threshold) => {
                self.store.remove_images_created_before(threshold)
            }
            SweepRequest::AccessedBefore(threshold) => {
                self.store.remove_images_accessed_before(threshold)
            }
        };
        info!(namespace = self.store.namespace(), threshold = %request.threshold(), removed, "Swept variant store");
        removed
    }

    /// Deletes every record of `key`.
    pub fn remove(&self, key: &str) -> usize {
        let removed = self.store.remove_images(key);
        info!(namespace = self.store.namespace(), key, removed, "Removed key from variant store");
        removed
    }

    /// Deletes every record in the namespace.
    pub fn clear(&self) -> usize {
        let removed = self.store.remove_all_images();
        info!(namespace = self.store.namespace(), removed, "Cleared variant store");
        removed
    }

    /// Path a record would be stored at.
    #[must_use]
    pub fn path(&self, key: &str, variant: Variant, size: VariantSize) -> PathBuf {
        self.store.file_path(key, variant, size)
    }

    /// Record count and size of the namespace.
    #[must_use]
    pub fn summary(&self) -> StoreSummary {
        let records = self.store.records();
        StoreSummary {
            namespace: self.store.namespace().to_string(),
            retention: self.store.retention(),
            dir: self.store.dir().to_path_buf(),
            records: records.len(),
            total_bytes: records.iter().map(|record| record.len).sum(),
            oldest_access: records.iter().map(|record| record.accessed_at).min(),
        }
    }
}
