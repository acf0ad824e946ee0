//! Vend variant use case implementation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::dto::{VendRequest, VendResponse};
use crate::domain::entities::Size;
use crate::domain::errors::{VendError, VendResult};
use crate::domain::ports::ImageOwner;
use crate::infrastructure::image::VendCache;

/// Vends a variant through the cache and writes it out.
#[derive(Clone)]
pub struct VendVariantUseCase {
    cache: Arc<VendCache>,
}

impl VendVariantUseCase {
    /// Creates the use case over a shared cache.
    #[must_use]
    pub const fn new(cache: Arc<VendCache>) -> Self {
        Self { cache }
    }

    /// Executes the vend for `owner`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the owner id does not match the request,
    /// any error from the cache, and `Write` if the output cannot be saved.
    pub fn execute(&self, owner: &dyn ImageOwner, request: &VendRequest) -> VendResult<VendResponse> {
        if owner.identifier() != request.owner_id {
            return Err(VendError::invalid_input(format!(
                "owner {} does not match requested owner {}",
                owner.identifier(),
                request.owner_id
            )));
        }

        debug!(key = %request.key(), output = %request.output.display(), "Vending variant");
        let (image, source) = self.cache.vend(owner, request.key())?;

        if let Some(parent) = request.output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| VendError::write(parent, e))?;
        }
        image
            .save(&request.output)
            .map_err(|e| VendError::write(&request.output, e))?;

        let size = Size::new(image.width(), image.height());
        info!(key = %request.key(), size = %size, source = %source, "Vended variant");

        Ok(VendResponse {
            output: request.output.clone(),
            size,
            source,
        })
    }
}
