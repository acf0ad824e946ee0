//! Pixel geometry used by transforms.

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Largest aspect-preserving size that fits inside `bounds`.
    /// A zero side of `bounds` leaves that axis unconstrained.
    #[must_use]
    pub fn fit_within(self, bounds: Self) -> Self {
        self.scaled_by(self.axis_ratios(bounds).reduce(f64::min))
    }

    /// Smallest aspect-preserving size that covers `bounds`.
    /// A zero side of `bounds` leaves that axis unconstrained.
    #[must_use]
    pub fn cover(self, bounds: Self) -> Self {
        self.scaled_by(self.axis_ratios(bounds).reduce(f64::max))
    }

    fn axis_ratios(self, bounds: Self) -> impl Iterator<Item = f64> {
        let width = (bounds.width > 0 && self.width > 0)
            .then(|| f64::from(bounds.width) / f64::from(self.width));
        let height = (bounds.height > 0 && self.height > 0)
            .then(|| f64::from(bounds.height) / f64::from(self.height));
        width.into_iter().chain(height)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn scaled_by(self, ratio: Option<f64>) -> Self {
        let Some(ratio) = ratio else {
            return self;
        };
        let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);
        Self::new(scale(self.width), scale(self.height))
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Offset in pixels; may be negative for partially off-canvas overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Horizontal offset.
    pub x: i64,
    /// Vertical offset.
    pub y: i64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Point,
    /// Extent from the origin.
    pub size: Size,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Clips this rectangle to `bounds` anchored at the origin.
    /// Returns `None` when nothing of the rectangle remains.
    #[must_use]
    pub fn clip_to(self, bounds: Size) -> Option<Self> {
        let left = self.origin.x.max(0);
        let top = self.origin.y.max(0);
        let right = (self.origin.x + i64::from(self.size.width)).min(i64::from(bounds.width));
        let bottom = (self.origin.y + i64::from(self.size.height)).min(i64::from(bounds.height));

        if right <= left || bottom <= top {
            return None;
        }

        let width = u32::try_from(right - left).ok()?;
        let height = u32::try_from(bottom - top).ok()?;
        Some(Self::new(left, top, width, height))
    }
}
