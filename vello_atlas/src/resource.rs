// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interfaces to the GPU resource provider and its capabilities.

/// The pixel formats glyph masks come in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaskFormat {
    /// 8-bit coverage.
    A8,
    /// 16-bit per-channel (LCD) coverage, packed as RGB 5-6-5.
    A565,
    /// 32-bit premultiplied color.
    Argb,
}

/// Number of [`MaskFormat`] variants.
pub const MASK_FORMAT_COUNT: usize = 3;

impl MaskFormat {
    /// All formats, in atlas index order.
    pub const ALL: [Self; MASK_FORMAT_COUNT] = [Self::A8, Self::A565, Self::Argb];

    /// Size of one pixel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::A8 => 1,
            Self::A565 => 2,
            Self::Argb => 4,
        }
    }

    /// The logical color type textures of this format are created with.
    pub const fn color_type(self) -> ColorType {
        match self {
            Self::A8 => ColorType::Alpha8,
            Self::A565 => ColorType::Bgr565,
            Self::Argb => ColorType::Rgba8888,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::A8 => 0,
            Self::A565 => 1,
            Self::Argb => 2,
        }
    }
}

/// A backend-independent description of texel contents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// A single 8-bit alpha channel.
    Alpha8,
    /// 5-6-5 packed color.
    Bgr565,
    /// 8 bits per channel, RGBA order.
    Rgba8888,
}

/// A concrete texture format understood by the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendFormat {
    /// One 8-bit normalized channel.
    R8Unorm,
    /// 5-6-5 packed normalized color.
    B5G6R5Unorm,
    /// Four 8-bit normalized channels.
    Rgba8Unorm,
}

/// What the backend can do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Caps {
    /// Largest width or height of a 2D texture.
    pub max_texture_size: u32,
    /// Whether 5-6-5 textures can be sampled.
    pub supports_rgb565: bool,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            max_texture_size: 8192,
            supports_rgb565: true,
        }
    }
}

impl Caps {
    /// The format textures of `color_type` should be created with, if any.
    pub fn default_backend_format(&self, color_type: ColorType) -> Option<BackendFormat> {
        match color_type {
            ColorType::Alpha8 => Some(BackendFormat::R8Unorm),
            ColorType::Bgr565 => self.supports_rgb565.then_some(BackendFormat::B5G6R5Unorm),
            ColorType::Rgba8888 => Some(BackendFormat::Rgba8Unorm),
        }
    }
}

/// Parameters for creating an atlas page texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: &'static str,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: BackendFormat,
}

/// Identifies a resource shared by everything that knows the key.
///
/// Keys are made of a domain, allocated once per kind of resource from
/// [`UniqueKeyDomains`], and domain-specific data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    domain: u32,
    data: u32,
}

impl UniqueKey {
    /// A key in `domain` distinguished by `data`.
    pub fn new(domain: u32, data: u32) -> Self {
        Self { domain, data }
    }

    /// The domain the key was built in.
    pub fn domain(&self) -> u32 {
        self.domain
    }

    /// The domain-specific part of the key.
    pub fn data(&self) -> u32 {
        self.data
    }
}

/// Allocates [`UniqueKey`] domains.
///
/// One instance is shared by everything that caches resources through the same
/// [`ResourceProvider`], and passed to them explicitly.
#[derive(Debug, Default)]
pub struct UniqueKeyDomains {
    next: u32,
}

impl UniqueKeyDomains {
    /// An allocator with no domains handed out.
    pub fn new() -> Self {
        Self::default()
    }

    /// A domain no other caller of this allocator has received.
    pub fn generate(&mut self) -> u32 {
        let domain = self.next;
        self.next += 1;
        domain
    }
}

/// Index data made of a pattern repeated with an increasing vertex offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternedIndices {
    indices: Vec<u16>,
}

impl PatternedIndices {
    /// Repeat `pattern` `repetitions` times, offsetting repetition `i` by
    /// `i * vertices_per_repetition`.
    ///
    /// Returns `None` if the pattern refers to a vertex outside its repetition or if the
    /// largest index would not fit in 16 bits.
    pub fn new(pattern: &[u16], repetitions: usize, vertices_per_repetition: u16) -> Option<Self> {
        if pattern.iter().any(|&index| index >= vertices_per_repetition) {
            return None;
        }
        let max_vertex = repetitions
            .checked_mul(usize::from(vertices_per_repetition))?
            .checked_sub(1)
            .unwrap_or(0);
        if max_vertex > usize::from(u16::MAX) {
            return None;
        }
        let mut indices = Vec::with_capacity(pattern.len() * repetitions);
        for repetition in 0..repetitions {
            let base = (repetition * usize::from(vertices_per_repetition)) as u16;
            indices.extend(pattern.iter().map(|index| base + index));
        }
        Some(Self { indices })
    }

    /// The indices.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// The indices as native-endian bytes, ready to upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Creates the GPU resources atlases live in.
pub trait ResourceProvider {
    /// A texture handle. Dropping it releases the texture.
    type Texture;
    /// An index buffer handle.
    type IndexBuffer: Clone;

    /// What the backend supports.
    fn caps(&self) -> &Caps;

    /// Create an uninitialized texture, or `None` if that is not possible.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Option<Self::Texture>;

    /// Find the index buffer cached under `key`, creating it from `indices` on a miss.
    fn find_or_create_patterned_index_buffer(
        &mut self,
        key: UniqueKey,
        indices: &PatternedIndices,
    ) -> Option<Self::IndexBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_pattern_repeats_with_offset() {
        let indices = PatternedIndices::new(&[0, 1, 2, 2, 1, 3], 3, 4).unwrap();
        assert_eq!(
            indices.indices(),
            &[0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7, 8, 9, 10, 10, 9, 11]
        );
        assert_eq!(indices.as_bytes().len(), 18 * 2);
    }

    #[test]
    fn pattern_overflowing_u16_is_rejected() {
        assert!(PatternedIndices::new(&[0, 1, 2], 16385, 4).is_none());
        assert!(PatternedIndices::new(&[0, 1, 2], 16384, 4).is_some());
        assert!(PatternedIndices::new(&[0, 4], 1, 4).is_none());
    }

    #[test]
    fn domains_are_distinct() {
        let mut domains = UniqueKeyDomains::new();
        let a = domains.generate();
        let b = domains.generate();
        assert_ne!(a, b);
        assert_ne!(UniqueKey::new(a, 0), UniqueKey::new(b, 0));
    }

    #[test]
    fn rgb565_depends_on_caps() {
        let caps = Caps {
            supports_rgb565: false,
            ..Caps::default()
        };
        assert_eq!(caps.default_backend_format(ColorType::Bgr565), None);
        assert_eq!(
            Caps::default().default_backend_format(ColorType::Bgr565),
            Some(BackendFormat::B5G6R5Unorm)
        );
    }
}
