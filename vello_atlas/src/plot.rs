// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plots, the unit of packing and eviction, and the handles pointing into them.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use guillotiere::{size2, AtlasAllocator};

use crate::token::DeferredUploadToken;

/// Generation value no plot ever has.
const INVALID_GENERATION: u64 = 0;

/// Source of plot generations.
///
/// Clones share the same sequence, so plots of different atlases (and of atlases
/// recreated after a reset) never share a generation.
#[derive(Clone, Debug)]
pub struct GenerationCounter {
    next: Arc<AtomicU64>,
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationCounter {
    /// A counter whose first generation is 1.
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(INVALID_GENERATION + 1)),
        }
    }

    /// A generation not handed out before.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Identifies one plot at one generation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlotLocator {
    page_index: u32,
    plot_index: u32,
    generation: u64,
}

impl PlotLocator {
    pub(crate) fn new(page_index: u32, plot_index: u32, generation: u64) -> Self {
        Self {
            page_index,
            plot_index,
            generation,
        }
    }

    /// Whether this locator ever referred to a plot.
    pub fn is_valid(&self) -> bool {
        self.generation != INVALID_GENERATION
    }

    /// The page the plot is on.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// The plot's index within its page.
    pub fn plot_index(&self) -> u32 {
        self.plot_index
    }

    /// The plot's generation when this locator was made.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An integer rectangle in page texels; `right` and `bottom` are exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AtlasRect {
    /// Left edge.
    pub left: u16,
    /// Top edge.
    pub top: u16,
    /// Right edge, exclusive.
    pub right: u16,
    /// Bottom edge, exclusive.
    pub bottom: u16,
}

impl AtlasRect {
    /// A rectangle from its origin and size.
    pub fn from_xywh(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u16 {
        self.right - self.left
    }

    /// Height in texels.
    pub fn height(&self) -> u16 {
        self.bottom - self.top
    }

    /// Whether the rectangle covers no texels.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// Where a packed bitmap lives: its plot and its rectangle within the page.
///
/// The default locator is invalid and never matches any plot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AtlasLocator {
    plot: PlotLocator,
    rect: AtlasRect,
}

impl AtlasLocator {
    pub(crate) fn new(plot: PlotLocator, rect: AtlasRect) -> Self {
        Self { plot, rect }
    }

    /// Whether the locator was ever filled in by a successful pack.
    pub fn is_valid(&self) -> bool {
        self.plot.is_valid()
    }

    /// The plot holding the bitmap.
    pub fn plot_locator(&self) -> PlotLocator {
        self.plot
    }

    /// The page holding the bitmap.
    pub fn page_index(&self) -> u32 {
        self.plot.page_index
    }

    /// The plot's index within its page.
    pub fn plot_index(&self) -> u32 {
        self.plot.plot_index
    }

    /// The plot generation this locator was issued for.
    pub fn generation(&self) -> u64 {
        self.plot.generation
    }

    /// The bitmap's rectangle in page texels.
    pub fn rect(&self) -> AtlasRect {
        self.rect
    }

    /// The bitmap's rectangle shrunk by `padding` texels on every side.
    ///
    /// For callers that packed their bitmaps with a transparent border.
    #[must_use]
    pub fn inset(&self, padding: u16) -> Self {
        let mut rect = self.rect;
        rect.left = rect.left.saturating_add(padding).min(rect.right);
        rect.top = rect.top.saturating_add(padding).min(rect.bottom);
        rect.right = rect.right.saturating_sub(padding).max(rect.left);
        rect.bottom = rect.bottom.saturating_sub(padding).max(rect.top);
        Self {
            plot: self.plot,
            rect,
        }
    }
}

/// A fixed-size region of a page.
pub(crate) struct Plot {
    page_index: u32,
    plot_index: u32,
    generation: u64,
    /// Top-left of the plot within its page.
    offset: (u16, u16),
    size: (u16, u16),
    /// Guillotiere allocator for the plot's texels, in plot coordinates.
    allocator: AtlasAllocator,
    /// Texels handed out since the last reset.
    allocated_area: u32,
    last_use: DeferredUploadToken,
    /// The newest draw that may still read content evicted from this plot.
    ///
    /// Uploads into the plot must not execute before that draw has.
    eviction_fence: DeferredUploadToken,
}

impl Plot {
    pub(crate) fn new(
        page_index: u32,
        plot_index: u32,
        generation: u64,
        offset: (u16, u16),
        width: u16,
        height: u16,
    ) -> Self {
        Self {
            page_index,
            plot_index,
            generation,
            offset,
            size: (width, height),
            allocator: AtlasAllocator::new(size2(i32::from(width), i32::from(height))),
            allocated_area: 0,
            last_use: DeferredUploadToken::already_flushed(),
            eviction_fence: DeferredUploadToken::already_flushed(),
        }
    }

    pub(crate) fn locator(&self) -> PlotLocator {
        PlotLocator::new(self.page_index, self.plot_index, self.generation)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn plot_index(&self) -> u32 {
        self.plot_index
    }

    pub(crate) fn last_use(&self) -> DeferredUploadToken {
        self.last_use
    }

    pub(crate) fn eviction_fence(&self) -> DeferredUploadToken {
        self.eviction_fence
    }

    /// Record a use, keeping the newest token seen.
    ///
    /// Returns `false` if `token` is older than the recorded one.
    pub(crate) fn set_last_use(&mut self, token: DeferredUploadToken) -> bool {
        if token < self.last_use {
            return false;
        }
        self.last_use = token;
        true
    }

    /// Pack a rectangle, returning its position in page texels.
    ///
    /// An empty rectangle always fits, at the plot's origin, and takes no space.
    pub(crate) fn add_sub_image(&mut self, width: u16, height: u16) -> Option<AtlasRect> {
        if width == 0 || height == 0 {
            return Some(AtlasRect::from_xywh(
                self.offset.0,
                self.offset.1,
                width,
                height,
            ));
        }
        if width > self.size.0 || height > self.size.1 {
            return None;
        }
        let allocation = self
            .allocator
            .allocate(size2(i32::from(width), i32::from(height)))?;
        self.allocated_area += u32::from(width) * u32::from(height);
        let origin = allocation.rectangle.min;
        Some(AtlasRect::from_xywh(
            self.offset.0 + origin.x as u16,
            self.offset.1 + origin.y as u16,
            width,
            height,
        ))
    }

    /// Drop all content and move to a new generation.
    ///
    /// Draws up to the plot's last use may still read the old content, so the last use
    /// becomes the fence for uploads into the reset plot.
    pub(crate) fn reset_rects(&mut self, generation: u64) {
        self.allocator.clear();
        self.allocated_area = 0;
        self.generation = generation;
        self.eviction_fence = self.eviction_fence.max(self.last_use);
    }

    /// Fraction of the plot's texels in use, from 0.0 to 1.0.
    pub(crate) fn percent_full(&self) -> f32 {
        let total = u32::from(self.size.0) * u32::from(self.size.1);
        self.allocated_area as f32 / total as f32
    }
}

impl fmt::Debug for Plot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plot")
            .field("page_index", &self.page_index)
            .field("plot_index", &self.plot_index)
            .field("generation", &self.generation)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("allocated_area", &self.allocated_area)
            .field("last_use", &self.last_use)
            .field("eviction_fence", &self.eviction_fence)
            .finish_non_exhaustive()
    }
}
