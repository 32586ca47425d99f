// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

use crate::resource::ColorType;

/// Errors that can occur during atlas operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtlasError {
    /// The bitmap is larger than a plot and will never fit.
    #[error("Bitmap too large ({width}x{height}) for a {plot_width}x{plot_height} plot")]
    Oversized {
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
        /// Width of a plot in the atlas.
        plot_width: u32,
        /// Height of a plot in the atlas.
        plot_height: u32,
    },
    /// The pixel slice does not hold exactly one bitmap of the requested size.
    #[error("Expected {expected} bytes of pixel data, got {actual}")]
    PixelDataMismatch {
        /// Bytes required by the width, height and format.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Every page is full and the least recently used plot is read by the draw being
    /// prepared. Issue that draw and retry.
    #[error("Least recently used plot is still needed by the pending draw")]
    TryAgain,
    /// No space was found even after evicting a plot.
    #[error("No space available in any page")]
    NoSpace,
    /// The resource provider could not create a page texture.
    #[error("Failed to create a {width}x{height} page texture")]
    TextureAllocation {
        /// The requested page width.
        width: u32,
        /// The requested page height.
        height: u32,
    },
    /// The backend has no texture format for the color type.
    #[error("No backend format for {0:?}")]
    MissingBackendFormat(ColorType),
    /// Page dimensions are not a whole multiple of plot dimensions, or produce too
    /// many plots.
    #[error("Invalid plot layout: {page_width}x{page_height} page, {plot_width}x{plot_height} plots")]
    InvalidPlotLayout {
        /// Page width.
        page_width: u32,
        /// Page height.
        page_height: u32,
        /// Plot width.
        plot_width: u32,
        /// Plot height.
        plot_height: u32,
    },
}

impl AtlasError {
    /// Whether retrying the same request can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Oversized { .. })
    }
}
