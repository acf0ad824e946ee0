//! Default transformer backed by `image::imageops`.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};
use tracing::trace;

use crate::domain::entities::{Point, Rect, Size};
use crate::domain::errors::{VendError, VendResult};
use crate::domain::ports::{DEFAULT_BLUR_RADIUS, ImageTransformer, ensure_drawable};

/// Pure raster transforms over `DynamicImage`.
#[derive(Debug, Clone, Copy)]
pub struct RasterTransformer {
    blur_radius: f32,
    filter: FilterType,
}

impl RasterTransformer {
    /// Creates a transformer with the given default blur radius.
    #[must_use]
    pub const fn new(blur_radius: f32) -> Self {
        Self {
            blur_radius,
            filter: FilterType::Lanczos3,
        }
    }

    /// Uses a different resampling filter for scaling.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for RasterTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_RADIUS)
    }
}

impl ImageTransformer for RasterTransformer {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn circular(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
        let size = ensure_drawable(image)?;
        let side = size.width.min(size.height);
        let square = self.center_cropped_to(image, Size::new(side, side))?;

        let mut rgba = square.to_rgba8();
        let radius = side as f32 / 2.0;
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - radius;
            let dy = y as f32 + 0.5 - radius;
            // One pixel of feathering keeps the edge from aliasing.
            let coverage = (radius - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0);
            pixel[3] = (f32::from(pixel[3]) * coverage).round() as u8;
        }

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn blurred(&self, image: &DynamicImage, radius: f32) -> VendResult<DynamicImage> {
        ensure_drawable(image)?;
        if radius <= 0.0 {
            return Ok(image.clone());
        }
        // Gaussian sigma; the kernel reaches roughly twice this far.
        let sigma = radius / 2.0;
        trace!(radius, sigma, "Blurring image");
        Ok(image.blur(sigma))
    }

    fn grayscale(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
        ensure_drawable(image)?;
        Ok(image.grayscale())
    }

    fn masked_with(&self, image: &DynamicImage, mask: &DynamicImage) -> VendResult<DynamicImage> {
        let size = ensure_drawable(image)?;
        ensure_drawable(mask)?;

        let luma = if mask.dimensions() == (size.width, size.height) {
            mask.to_luma8()
        } else {
            mask.resize_exact(size.width, size.height, self.filter)
                .to_luma8()
        };

        let mut rgba = image.to_rgba8();
        for (pixel, alpha) in rgba.pixels_mut().zip(luma.pixels()) {
            let combined = (u32::from(pixel[3]) * u32::from(alpha[0]) + 127) / 255;
            pixel[3] = u8::try_from(combined).unwrap_or(u8::MAX);
        }

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn composite_at(
        &self,
        image: &DynamicImage,
        overlay: &DynamicImage,
        point: Point,
    ) -> VendResult<DynamicImage> {
        ensure_drawable(image)?;
        let mut base = image.to_rgba8();
        imageops::overlay(&mut base, &overlay.to_rgba8(), point.x, point.y);
        Ok(DynamicImage::ImageRgba8(base))
    }

    fn cropped_to(&self, image: &DynamicImage, rect: Rect) -> VendResult<DynamicImage> {
        let size = ensure_drawable(image)?;
        let clipped = rect.clip_to(size).ok_or_else(|| {
            VendError::invalid_input(format!(
                "crop rect {}x{} at ({}, {}) lies outside {size}",
                rect.size.width, rect.size.height, rect.origin.x, rect.origin.y
            ))
        })?;

        let x = u32::try_from(clipped.origin.x).unwrap_or_default();
        let y = u32::try_from(clipped.origin.y).unwrap_or_default();
        Ok(image.crop_imm(x, y, clipped.size.width, clipped.size.height))
    }

    fn scaled_to(&self, image: &DynamicImage, size: Size) -> VendResult<DynamicImage> {
        let source = ensure_drawable(image)?;
        if size.is_empty() {
            return Err(VendError::invalid_input(format!(
                "scale target has zero area ({size})"
            )));
        }
        if source == size {
            return Ok(image.clone());
        }
        trace!(from = %source, to = %size, "Scaling image");
        Ok(image.resize_exact(size.width, size.height, self.filter))
    }

    fn with_alpha(&self, image: &DynamicImage) -> VendResult<DynamicImage> {
        ensure_drawable(image)?;
        if self.has_alpha(image) {
            return Ok(image.clone());
        }
        Ok(DynamicImage::ImageRgba8(image.to_rgba8()))
    }

    fn default_blur_radius(&self) -> f32 {
        self.blur_radius
    }
}
