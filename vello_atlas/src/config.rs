// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Size policy for atlas pages and plots.

use crate::draw_op_atlas::MAX_PLOTS;
use crate::resource::MaskFormat;

/// Largest page dimension an atlas is ever configured with.
pub const MAX_ATLAS_DIM: u32 = 2048;

/// Plot dimension used by every format unless a larger A8 page allows more.
const DEFAULT_PLOT_DIM: u32 = 256;

/// Plot dimension for A8 pages that are at least [`MAX_ATLAS_DIM`] along an axis.
const LARGE_A8_PLOT_DIM: u32 = 512;

/// ARGB page sizes, indexed by `floor(log2(budget >> 18))`.
const ARGB_DIMENSIONS: [(u32, u32); 6] = [
    (256, 256),
    (512, 256),
    (512, 512),
    (1024, 512),
    (1024, 1024),
    (2048, 1024),
];

/// Whether an atlas may spread its content over several pages.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AllowMultitexturing {
    /// A single page per atlas.
    No,
    /// Up to [`MAX_MULTITEXTURE_PAGES`](crate::MAX_MULTITEXTURE_PAGES) pages per atlas.
    #[default]
    Yes,
}

impl AllowMultitexturing {
    /// The page limit this setting implies.
    pub fn max_pages(self) -> u32 {
        match self {
            Self::No => 1,
            Self::Yes => crate::MAX_MULTITEXTURE_PAGES,
        }
    }
}

/// Page and plot sizes for each [`MaskFormat`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Page size of the ARGB and A565 atlases.
    argb_dimensions: (u32, u32),
    /// Largest page dimension any atlas may use.
    max_texture_size: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        // 4 MiB of ARGB pages, the budget for a typical desktop context.
        Self::new(MAX_ATLAS_DIM, 1 << 22)
    }
}

impl AtlasConfig {
    /// Derive page sizes from the backend's maximum texture dimension and a byte
    /// budget for the ARGB atlas.
    pub fn new(max_texture_size: u32, max_texture_bytes: usize) -> Self {
        let steps = max_texture_bytes >> 18;
        let index = if steps > 0 {
            (steps.ilog2() as usize).min(ARGB_DIMENSIONS.len() - 1)
        } else {
            0
        };
        let (width, height) = ARGB_DIMENSIONS[index];
        Self {
            argb_dimensions: (width.min(max_texture_size), height.min(max_texture_size)),
            max_texture_size: max_texture_size.min(MAX_ATLAS_DIM),
        }
    }

    /// The smallest configuration: a single 256x256 plot per page, for every format.
    ///
    /// Useful to exercise eviction in tests.
    pub fn minimal() -> Self {
        Self::new(DEFAULT_PLOT_DIM, 0)
    }

    /// Page size for `format`.
    ///
    /// Pages hold a whole number of plots, and no more than
    /// [`MAX_PLOTS`](crate::MAX_PLOTS) of them.
    pub fn atlas_dimensions(&self, format: MaskFormat) -> (u32, u32) {
        self.layout(format).0
    }

    /// Plot size for `format`.
    ///
    /// A8 plots grow on large pages to hold more of the bigger distance-field glyphs.
    /// Plots are never larger than their page.
    pub fn plot_dimensions(&self, format: MaskFormat) -> (u32, u32) {
        self.layout(format).1
    }

    /// Page and plot size for `format`.
    fn layout(&self, format: MaskFormat) -> ((u32, u32), (u32, u32)) {
        let (page_width, page_height) = match format {
            MaskFormat::A8 => (
                (2 * self.argb_dimensions.0).min(self.max_texture_size),
                (2 * self.argb_dimensions.1).min(self.max_texture_size),
            ),
            MaskFormat::A565 | MaskFormat::Argb => self.argb_dimensions,
        };
        let plot_dim = |page_dim: u32| {
            let dim = if format == MaskFormat::A8 && page_dim >= MAX_ATLAS_DIM {
                LARGE_A8_PLOT_DIM
            } else {
                DEFAULT_PLOT_DIM
            };
            dim.min(page_dim)
        };
        let (plot_width, plot_height) = (plot_dim(page_width), plot_dim(page_height));
        if plot_width == 0 || plot_height == 0 {
            return ((page_width, page_height), (plot_width, plot_height));
        }

        let mut plots_x = page_width / plot_width;
        let mut plots_y = page_height / plot_height;
        while plots_x * plots_y > MAX_PLOTS {
            if plots_x >= plots_y {
                plots_x -= 1;
            } else {
                plots_y -= 1;
            }
        }
        (
            (plots_x * plot_width, plots_y * plot_height),
            (plot_width, plot_height),
        )
    }
}
