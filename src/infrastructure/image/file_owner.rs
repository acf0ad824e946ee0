//! Image owner backed by a file on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::DynamicImage;
use tracing::{debug, warn};

use crate::domain::ports::ImageOwner;

/// Owner whose original is an image file, decoded once on first use.
#[derive(Debug)]
pub struct FileImageOwner {
    id: i64,
    path: PathBuf,
    original: OnceLock<Option<Arc<DynamicImage>>>,
}

impl FileImageOwner {
    /// Creates an owner; the file is not read until first use.
    #[must_use]
    pub fn new(id: i64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            original: OnceLock::new(),
        }
    }

    /// Path of the original image.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Option<Arc<DynamicImage>> {
        match image::open(&self.path) {
            Ok(image) => {
                debug!(owner = self.id, path = %self.path.display(), width = image.width(), height = image.height(), "Loaded original");
                Some(Arc::new(image))
            }
            Err(e) => {
                warn!(owner = self.id, path = %self.path.display(), error = %e, "Failed to load original");
                None
            }
        }
    }
}

impl ImageOwner for FileImageOwner {
    fn identifier(&self) -> i64 {
        self.id
    }

    fn original_image(&self) -> Option<Arc<DynamicImage>> {
        self.original.get_or_init(|| self.load()).clone()
    }
}
