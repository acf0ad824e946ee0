//! Variant addressing: which transforms, at which size, for which owner.

use serde::{Deserialize, Serialize};

use super::Size;

bitflags::bitflags! {
    /// Transforms applied on top of the (possibly scaled) original.
    ///
    /// Bits are applied in ascending order, so a combined request always
    /// renders the same way.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifier: u64 {
        /// Mask to the inscribed circle.
        const CIRCULAR = 1 << 0;
        /// Gaussian blur at the transformer's radius.
        const BLURRED = 1 << 1;
        /// Luminance only; alpha is kept.
        const GRAYSCALE = 1 << 2;
    }
}

/// Either the untouched image or a non-empty set of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Variant {
    /// Untouched image, or its native size.
    #[default]
    Original,
    /// At least one modifier applied.
    Modified(Modifier),
}

impl Variant {
    /// Builds a variant from raw bits, dropping unknown ones.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        let modifier = Modifier::from_bits_truncate(bits);
        if modifier.is_empty() {
            Self::Original
        } else {
            Self::Modified(modifier)
        }
    }

    /// Modifier set; empty for `Original`.
    #[must_use]
    pub const fn modifier(self) -> Modifier {
        match self {
            Self::Original => Modifier::empty(),
            Self::Modified(modifier) => modifier,
        }
    }

    /// Raw modifier bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.modifier().bits()
    }

    /// Returns true for the untouched variant.
    #[must_use]
    pub const fn is_original(self) -> bool {
        matches!(self, Self::Original)
    }

    /// Returns true if every bit of `modifier` is set.
    #[must_use]
    pub const fn contains(self, modifier: Modifier) -> bool {
        self.modifier().contains(modifier)
    }
}

impl From<Modifier> for Variant {
    fn from(modifier: Modifier) -> Self {
        Self::from_bits(modifier.bits())
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Modified(modifier) => {
                let names: Vec<&str> = modifier.iter_names().map(|(name, _)| name).collect();
                write!(f, "{}", names.join("|").to_lowercase())
            }
        }
    }
}

/// Requested output size.
///
/// `Bounded` is an at-most box; a zero side leaves that axis unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VariantSize {
    /// Untouched image, or its native size.
    #[default]
    Original,
    /// Fit within this box.
    Bounded(Size),
}

impl VariantSize {
    /// `(0, 0)` maps to `Original`.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        if width == 0 && height == 0 {
            Self::Original
        } else {
            Self::Bounded(Size::new(width, height))
        }
    }

    /// Dimensions as written into storage addresses; `Original` is `0x0`.
    #[must_use]
    pub const fn dimensions(self) -> Size {
        match self {
            Self::Original => Size::new(0, 0),
            Self::Bounded(size) => size,
        }
    }

    /// Returns true for the untouched variant.
    #[must_use]
    pub const fn is_original(self) -> bool {
        matches!(self, Self::Original)
    }
}

impl From<Size> for VariantSize {
    fn from(size: Size) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<(u32, u32)> for VariantSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl std::fmt::Display for VariantSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Bounded(size) => write!(f, "{size}"),
        }
    }
}

/// Identity of whoever owns the source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKey {
    /// Owner addressed by numeric identifier.
    Id(i64),
    /// Owner addressed by name.
    Name(String),
}

impl OwnerKey {
    /// Numeric identifier, if the owner has one.
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Key used when the owner is addressed in a variant store.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Name(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for OwnerKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for OwnerKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for OwnerKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Full address of a vended image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    /// Owner of the source image.
    pub owner: OwnerKey,
    /// Requested bounding size.
    pub size: VariantSize,
    /// Requested modifiers.
    pub variant: Variant,
}

impl VariantKey {
    /// Creates a key.
    #[must_use]
    pub fn new(owner: impl Into<OwnerKey>, size: VariantSize, variant: Variant) -> Self {
        Self {
            owner: owner.into(),
            size,
            variant,
        }
    }

    /// Key for the untouched original.
    #[must_use]
    pub fn original(owner: impl Into<OwnerKey>) -> Self {
        Self::new(owner, VariantSize::Original, Variant::Original)
    }

    /// Returns true for the untouched original at native size.
    #[must_use]
    pub const fn is_original(&self) -> bool {
        self.size.is_original() && self.variant.is_original()
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.variant, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_modifier_is_original() {
        assert_eq!(Variant::from(Modifier::empty()), Variant::Original);
        assert_eq!(Variant::from_bits(0), Variant::Original);
        assert_eq!(Variant::Original.bits(), 0);
    }

    #[test]
    fn test_unknown_bits_dropped() {
        let variant = Variant::from_bits(0b1000_0011);
        assert_eq!(
            variant,
            Variant::Modified(Modifier::CIRCULAR | Modifier::BLURRED)
        );
        assert_eq!(variant.bits(), 0b11);
    }

    #[test_case(0, 0, VariantSize::Original ; "zero_is_original")]
    #[test_case(100, 0, VariantSize::Bounded(Size::new(100, 0)) ; "width_only")]
    #[test_case(100, 50, VariantSize::Bounded(Size::new(100, 50)) ; "both_sides")]
    fn test_variant_size_new(width: u32, height: u32, expected: VariantSize) {
        assert_eq!(VariantSize::new(width, height), expected);
    }

    #[test]
    fn test_key_equality_needs_all_fields() {
        let a = VariantKey::new(42, VariantSize::new(10, 10), Modifier::CIRCULAR.into());
        let b = VariantKey::new(42, VariantSize::new(10, 10), Modifier::CIRCULAR.into());
        let c = VariantKey::new(42, VariantSize::new(10, 10), Modifier::BLURRED.into());
        let d = VariantKey::new(43, VariantSize::new(10, 10), Modifier::CIRCULAR.into());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_display() {
        let key = VariantKey::new(
            7,
            VariantSize::new(64, 32),
            (Modifier::CIRCULAR | Modifier::BLURRED).into(),
        );
        assert_eq!(key.to_string(), "7/circular|blurred/64x32");
        assert_eq!(VariantKey::original("avatar").to_string(), "avatar/original/original");
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(OwnerKey::Id(-5).storage_key(), "-5");
        assert_eq!(OwnerKey::from("me").storage_key(), "me");
    }
}
