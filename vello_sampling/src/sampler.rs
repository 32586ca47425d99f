// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! How a texture is sampled and laid out.

/// Texel filtering.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// The nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation of the four nearest texels.
    Linear,
}

/// What the hardware sampler does outside `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Repeat the edge texel.
    #[default]
    Clamp,
    /// Tile.
    Repeat,
    /// Tile, mirroring every other tile.
    MirrorRepeat,
    /// Transparent black.
    ClampToBorder,
}

/// Filtering and per-axis wrapping of a texture lookup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SamplerState {
    /// Filtering between texels.
    pub filter: FilterMode,
    /// Wrapping along x.
    pub wrap_x: WrapMode,
    /// Wrapping along y.
    pub wrap_y: WrapMode,
}

impl SamplerState {
    /// A sampler with `filter` that clamps on both axes.
    pub fn new(filter: FilterMode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// Which corner row 0 of a texture is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceOrigin {
    /// Row 0 is the top.
    #[default]
    TopLeft,
    /// Row 0 is the bottom.
    BottomLeft,
}

/// The properties of a texture that affect how coordinates into it are expressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureView {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Position of row 0.
    pub origin: SurfaceOrigin,
    /// Whether shaders address the texture in `[0, 1]` rather than in texels.
    pub normalized_coords: bool,
}

impl TextureView {
    /// A top-left origin texture addressed with normalized coordinates.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin: SurfaceOrigin::TopLeft,
            normalized_coords: true,
        }
    }

    /// The same texture with row 0 at `origin`.
    #[must_use]
    pub fn with_origin(mut self, origin: SurfaceOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The same texture addressed in texels.
    #[must_use]
    pub fn with_texel_coords(mut self) -> Self {
        self.normalized_coords = false;
        self
    }
}
