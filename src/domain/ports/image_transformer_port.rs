//! Port for pure image transforms.

use image::{DynamicImage, GenericImageView};

use crate::domain::entities::{Modifier, Point, Rect, Size, Variant, VariantSize};
use crate::domain::errors::{VendError, VendResult};

/// Blur radius used when a variant asks for `Modifier::BLURRED`.
pub const DEFAULT_BLUR_RADIUS: f32 = 8.0;

/// Fails with `InvalidInput` for zero-area images.
///
/// # Errors
/// Returns `VendError::InvalidInput` if either side is zero.
pub fn ensure_drawable(image: &DynamicImage) -> VendResult<Size> {
    let (width, height) = image.dimensions();
    let size = Size::new(width, height);
    if size.is_empty() {
        return Err(VendError::invalid_input(format!(
            "image has zero area ({size})"
        )));
    }
    Ok(size)
}

/// Stateless, reentrant image transforms.
///
/// Every transform takes a borrowed image and returns a new owned one, so
/// implementations can be shared freely across threads.
pub trait ImageTransformer: Send + Sync {
    /// Center-crops to a square and masks everything outside the inscribed circle.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn circular(&self, image: &DynamicImage) -> VendResult<DynamicImage>;

    /// Blurs with the given radius in pixels.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn blurred(&self, image: &DynamicImage, radius: f32) -> VendResult<DynamicImage>;

    /// Converts to grayscale, keeping alpha.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn grayscale(&self, image: &DynamicImage) -> VendResult<DynamicImage>;

    /// Uses the luminance of `mask` (stretched to the image size) as alpha.
    ///
    /// # Errors
    /// Returns `InvalidInput` if either image has zero area.
    fn masked_with(&self, image: &DynamicImage, mask: &DynamicImage) -> VendResult<DynamicImage>;

    /// Draws `overlay` on top of `image` with its top-left corner at `point`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `image` has zero area.
    fn composite_at(
        &self,
        image: &DynamicImage,
        overlay: &DynamicImage,
        point: Point,
    ) -> VendResult<DynamicImage>;

    /// Crops to `rect`, clipped to the image bounds.
    ///
    /// # Errors
    /// Returns `InvalidInput` if nothing of `rect` lies inside the image.
    fn cropped_to(&self, image: &DynamicImage, rect: Rect) -> VendResult<DynamicImage>;

    /// Resizes to exactly `size`, ignoring aspect ratio.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input or target.
    fn scaled_to(&self, image: &DynamicImage, size: Size) -> VendResult<DynamicImage>;

    /// Returns a copy that carries an alpha channel.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn with_alpha(&self, image: &DynamicImage) -> VendResult<DynamicImage>;

    /// Radius used for `Modifier::BLURRED`.
    fn default_blur_radius(&self) -> f32 {
        DEFAULT_BLUR_RADIUS
    }

    /// Returns true if the image has an alpha channel.
    fn has_alpha(&self, image: &DynamicImage) -> bool {
        image.color().has_alpha()
    }

    /// Crops the centered region of `size`, clamped to the image.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input or target.
    fn center_cropped_to(&self, image: &DynamicImage, size: Size) -> VendResult<DynamicImage> {
        let source = ensure_drawable(image)?;
        if size.is_empty() {
            return Err(VendError::invalid_input(format!(
                "crop target has zero area ({size})"
            )));
        }
        let width = size.width.min(source.width);
        let height = size.height.min(source.height);
        let rect = Rect::new(
            i64::from((source.width - width) / 2),
            i64::from((source.height - height) / 2),
            width,
            height,
        );
        self.cropped_to(image, rect)
    }

    /// Aspect-preserving scale so the result covers `size`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_least(
        &self,
        image: &DynamicImage,
        size: Size,
    ) -> VendResult<DynamicImage> {
        let source = ensure_drawable(image)?;
        self.scaled_to(image, source.cover(size))
    }

    /// Aspect-preserving scale so the result fits inside `size`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_most(
        &self,
        image: &DynamicImage,
        size: Size,
    ) -> VendResult<DynamicImage> {
        let source = ensure_drawable(image)?;
        self.scaled_to(image, source.fit_within(size))
    }

    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_least_width(
        &self,
        image: &DynamicImage,
        width: u32,
    ) -> VendResult<DynamicImage> {
        self.aspect_scaled_to_at_least(image, Size::new(width, 0))
    }

    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_most_width(
        &self,
        image: &DynamicImage,
        width: u32,
    ) -> VendResult<DynamicImage> {
        self.aspect_scaled_to_at_most(image, Size::new(width, 0))
    }

    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_least_height(
        &self,
        image: &DynamicImage,
        height: u32,
    ) -> VendResult<DynamicImage> {
        self.aspect_scaled_to_at_least(image, Size::new(0, height))
    }

    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn aspect_scaled_to_at_most_height(
        &self,
        image: &DynamicImage,
        height: u32,
    ) -> VendResult<DynamicImage> {
        self.aspect_scaled_to_at_most(image, Size::new(0, height))
    }

    /// Renders a variant of `image`.
    ///
    /// A bounded size is applied first so later transforms work at the final
    /// resolution; modifiers then run in bit order.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero-area input.
    fn render_variant(
        &self,
        image: &DynamicImage,
        variant: Variant,
        size: VariantSize,
    ) -> VendResult<DynamicImage> {
        ensure_drawable(image)?;
        let mut rendered = match size {
            VariantSize::Original => image.clone(),
            VariantSize::Bounded(bounds) => self.aspect_scaled_to_at_most(image, bounds)?,
        };

        let modifier = variant.modifier();
        if modifier.contains(Modifier::CIRCULAR) {
            rendered = self.circular(&rendered)?;
        }
        if modifier.contains(Modifier::BLURRED) {
            rendered = self.blurred(&rendered, self.default_blur_radius())?;
        }
        if modifier.contains(Modifier::GRAYSCALE) {
            rendered = self.grayscale(&rendered)?;
        }
        Ok(rendered)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps a transformer and counts variant renders.
    pub struct CountingTransformer<T> {
        inner: T,
        renders: AtomicUsize,
        delay: Option<Duration>,
    }

    impl<T: ImageTransformer> CountingTransformer<T> {
        pub fn new(inner: T) -> Self {
            Self {
                inner,
                renders: AtomicUsize::new(0),
                delay: None,
            }
        }

        /// Sleeps inside every render, widening race windows in tests.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    impl<T: ImageTransformer> ImageTransformer for CountingTransformer<T> {
        fn circular(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
            self.inner.circular(image)
        }

        fn blurred(&self, image: &DynamicImage, radius: f32) -> VendResult<DynamicImage> {
            self.inner.blurred(image, radius)
        }

        fn grayscale(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
            self.inner.grayscale(image)
        }

        fn masked_with(
            &self,
            image: &DynamicImage,
            mask: &DynamicImage,
        ) -> VendResult<DynamicImage> {
            self.inner.masked_with(image, mask)
        }

        fn composite_at(
            &self,
            image: &DynamicImage,
            overlay: &DynamicImage,
            point: Point,
        ) -> VendResult<DynamicImage> {
            self.inner.composite_at(image, overlay, point)
        }

        fn cropped_to(&self, image: &DynamicImage, rect: Rect) -> VendResult<DynamicImage> {
            self.inner.cropped_to(image, rect)
        }

        fn scaled_to(&self, image: &DynamicImage, size: Size) -> VendResult<DynamicImage> {
            self.inner.scaled_to(image, size)
        }

        fn with_alpha(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
            self.inner.with_alpha(image)
        }

        fn default_blur_radius(&self) -> f32 {
            self.inner.default_blur_radius()
        }

        fn render_variant(
            &self,
            image: &DynamicImage,
            variant: Variant,
            size: VariantSize,
        ) -> VendResult<DynamicImage> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.inner.render_variant(image, variant, size)
        }
    }
}
