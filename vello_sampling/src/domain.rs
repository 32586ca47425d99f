// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sampling rectangles and their edge behavior.

use static_assertions::const_assert;

use crate::sampler::WrapMode;

/// An axis-aligned rectangle in texture space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
}

impl Rect {
    /// A rectangle from its edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle covering no area at the origin.
    pub const fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Width; negative for an inverted rectangle.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height; negative for an inverted rectangle.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// An axis-aligned rectangle of whole texels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge, exclusive.
    pub right: i32,
    /// Bottom edge, exclusive.
    pub bottom: i32,
}

impl IntRect {
    /// A rectangle from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height in texels.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// What a lookup outside the domain does along one axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The domain does not apply along this axis.
    #[default]
    Ignore = 0,
    /// Clamp the coordinate into the domain.
    Clamp = 1,
    /// Transparent black outside the domain.
    Decal = 2,
    /// Tile the domain.
    ///
    /// Filtering can read texels outside the domain near its edges.
    Repeat = 3,
    /// Tile the domain, mirroring every other tile.
    ///
    /// Filtering can read texels outside the domain near its edges.
    MirrorRepeat = 4,
}

impl Mode {
    /// Number of modes.
    pub const COUNT: u32 = 5;

    /// Every mode, in key order.
    pub const ALL: [Self; Self::COUNT as usize] = [
        Self::Ignore,
        Self::Clamp,
        Self::Decal,
        Self::Repeat,
        Self::MirrorRepeat,
    ];

    /// Whether lookups along the axis are clamped into the domain before sampling.
    pub fn clamps(self) -> bool {
        matches!(self, Self::Clamp | Self::Decal)
    }
}

/// Bits taken by one axis's mode in a domain key.
pub const MODE_BITS: u32 = 3;

/// Bits taken by a whole domain key, one mode per axis.
pub const DOMAIN_KEY_BITS: u32 = 2 * MODE_BITS;

const_assert!(Mode::COUNT <= 1 << MODE_BITS);
const_assert!(Mode::COUNT * Mode::COUNT <= 1 << DOMAIN_KEY_BITS);

/// A rectangle that texture lookups are constrained to, with per-axis edge behavior.
///
/// Two domains are equal when their modes match and, along every axis that is not
/// [`Mode::Ignore`], so do their edges.
#[derive(Copy, Clone, Debug)]
pub struct TextureDomain {
    rect: Rect,
    mode_x: Mode,
    mode_y: Mode,
    index: Option<u32>,
}

impl TextureDomain {
    /// A domain over `rect`, used as given.
    pub const fn new(rect: Rect, mode_x: Mode, mode_y: Mode) -> Self {
        Self {
            rect,
            mode_x,
            mode_y,
            index: None,
        }
    }

    /// A domain over `rect` for a `width` x `height` texture.
    ///
    /// The rectangle is pinned into the texture bounds, so an edge outside the texture
    /// moves onto its border. `rect` must not be inverted.
    pub fn for_texture(width: f32, height: f32, rect: Rect, mode_x: Mode, mode_y: Mode) -> Self {
        debug_assert!(
            rect.left <= rect.right && rect.top <= rect.bottom,
            "inverted texture domain {rect:?}"
        );
        let left = rect.left.clamp(0.0, width);
        let top = rect.top.clamp(0.0, height);
        let pinned = Rect {
            left,
            top,
            right: rect.right.clamp(left, width),
            bottom: rect.bottom.clamp(top, height),
        };
        Self::new(pinned, mode_x, mode_y)
    }

    /// The domain that constrains nothing.
    pub const fn ignored() -> Self {
        Self::new(Rect::empty(), Mode::Ignore, Mode::Ignore)
    }

    /// The same domain distinguished by `index`, for stages sampling through several
    /// domains at once.
    #[must_use]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// The rectangle.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Behavior along x.
    pub fn mode_x(&self) -> Mode {
        self.mode_x
    }

    /// Behavior along y.
    pub fn mode_y(&self) -> Mode {
        self.mode_y
    }

    /// The index set with [`with_index`](Self::with_index).
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// Whether neither axis is constrained.
    pub fn is_ignored(&self) -> bool {
        self.mode_x == Mode::Ignore && self.mode_y == Mode::Ignore
    }

    /// Whether either axis uses [`Mode::Decal`].
    pub fn has_decal(&self) -> bool {
        self.mode_x == Mode::Decal || self.mode_y == Mode::Decal
    }

    /// The domain covering the texels of `texel_rect`.
    ///
    /// Along axes in [`Mode::Clamp`] or [`Mode::Decal`] with a nonzero extent, the edges
    /// move half a texel inwards onto the outermost texel centers, so that filtering at
    /// the edge does not pick up texels outside the rectangle.
    pub fn make_texel_domain(texel_rect: IntRect, mode_x: Mode, mode_y: Mode) -> Rect {
        let inset_x = if mode_x.clamps() && texel_rect.width() > 0 {
            0.5
        } else {
            0.0
        };
        let inset_y = if mode_y.clamps() && texel_rect.height() > 0 {
            0.5
        } else {
            0.0
        };
        Rect {
            left: texel_rect.left as f32 + inset_x,
            top: texel_rect.top as f32 + inset_y,
            right: texel_rect.right as f32 - inset_x,
            bottom: texel_rect.bottom as f32 - inset_y,
        }
    }

    /// Whether sampling produces transparent black outside some edge, either through a
    /// [`Mode::Decal`] axis or through a clamp-to-border sampler.
    pub fn is_decal_sampled(wrap_x: WrapMode, wrap_y: WrapMode, mode_x: Mode, mode_y: Mode) -> bool {
        wrap_x == WrapMode::ClampToBorder
            || wrap_y == WrapMode::ClampToBorder
            || mode_x == Mode::Decal
            || mode_y == Mode::Decal
    }

    /// The part of a program key that depends on this domain.
    ///
    /// Domains with the same key generate the same shader code. The key fits in
    /// [`DOMAIN_KEY_BITS`] bits.
    pub fn domain_key(&self) -> u32 {
        (self.mode_x as u32) | ((self.mode_y as u32) << MODE_BITS)
    }
}

impl PartialEq for TextureDomain {
    fn eq(&self, other: &Self) -> bool {
        self.mode_x == other.mode_x
            && self.mode_y == other.mode_y
            && (self.mode_x == Mode::Ignore
                || (self.rect.left == other.rect.left && self.rect.right == other.rect.right))
            && (self.mode_y == Mode::Ignore
                || (self.rect.top == other.rect.top && self.rect.bottom == other.rect.bottom))
    }
}

impl Default for TextureDomain {
    fn default() -> Self {
        Self::ignored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_domain_insets_clamped_axes() {
        let texels = IntRect::new(0, 0, 4, 4);
        assert_eq!(
            TextureDomain::make_texel_domain(texels, Mode::Clamp, Mode::Clamp),
            Rect::new(0.5, 0.5, 3.5, 3.5)
        );
        assert_eq!(
            TextureDomain::make_texel_domain(texels, Mode::Ignore, Mode::Ignore),
            Rect::new(0.0, 0.0, 4.0, 4.0)
        );
        assert_eq!(
            TextureDomain::make_texel_domain(texels, Mode::Decal, Mode::Repeat),
            Rect::new(0.5, 0.0, 3.5, 4.0)
        );
        assert_eq!(
            TextureDomain::make_texel_domain(texels, Mode::MirrorRepeat, Mode::Decal),
            Rect::new(0.0, 0.5, 4.0, 3.5)
        );
    }

    #[test]
    fn texel_domain_keeps_empty_axes() {
        let line = IntRect::new(2, 3, 2, 7);
        assert_eq!(
            TextureDomain::make_texel_domain(line, Mode::Clamp, Mode::Clamp),
            Rect::new(2.0, 3.5, 2.0, 6.5)
        );
    }

    #[test]
    fn equality_ignores_unconstrained_axes() {
        let a = TextureDomain::new(Rect::new(0.0, 0.0, 1.0, 1.0), Mode::Ignore, Mode::Clamp);
        let b = TextureDomain::new(Rect::new(5.0, 0.0, 6.0, 1.0), Mode::Ignore, Mode::Clamp);
        assert_eq!(a, b);

        let c = TextureDomain::new(Rect::new(0.0, 0.0, 1.0, 2.0), Mode::Ignore, Mode::Clamp);
        assert_ne!(a, c);

        let d = TextureDomain::new(Rect::new(0.0, 0.0, 1.0, 1.0), Mode::Clamp, Mode::Clamp);
        assert_ne!(a, d);

        assert_eq!(
            TextureDomain::ignored(),
            TextureDomain::new(Rect::new(1.0, 2.0, 3.0, 4.0), Mode::Ignore, Mode::Ignore)
        );
    }

    #[test]
    fn domain_keys_are_distinct() {
        let mut keys = Vec::new();
        for mode_y in Mode::ALL {
            for mode_x in Mode::ALL {
                let key = TextureDomain::new(Rect::empty(), mode_x, mode_y).domain_key();
                assert!(key < 1 << DOMAIN_KEY_BITS);
                assert!(!keys.contains(&key), "duplicate key {key}");
                keys.push(key);
            }
        }
        assert_eq!(keys.len(), 25);
        assert_eq!(TextureDomain::ignored().domain_key(), 0);
    }

    #[test]
    fn for_texture_pins_into_bounds() {
        let domain = TextureDomain::for_texture(
            10.0,
            20.0,
            Rect::new(-5.0, 2.0, 15.0, 25.0),
            Mode::Clamp,
            Mode::Decal,
        );
        assert_eq!(domain.rect(), Rect::new(0.0, 2.0, 10.0, 20.0));

        let outside = TextureDomain::for_texture(
            10.0,
            10.0,
            Rect::new(12.0, 12.0, 14.0, 14.0),
            Mode::Clamp,
            Mode::Clamp,
        );
        assert_eq!(outside.rect(), Rect::new(10.0, 10.0, 10.0, 10.0));
    }

    #[test]
    fn decal_sampling_comes_from_modes_or_wraps() {
        assert!(!TextureDomain::is_decal_sampled(
            WrapMode::Clamp,
            WrapMode::Repeat,
            Mode::Clamp,
            Mode::Ignore
        ));
        assert!(TextureDomain::is_decal_sampled(
            WrapMode::Clamp,
            WrapMode::ClampToBorder,
            Mode::Ignore,
            Mode::Ignore
        ));
        assert!(TextureDomain::is_decal_sampled(
            WrapMode::Clamp,
            WrapMode::Clamp,
            Mode::Ignore,
            Mode::Decal
        ));
    }
}
