// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A multi-page atlas for a single mask format.

use log::{debug, warn};

use crate::config::{AllowMultitexturing, MAX_ATLAS_DIM};
use crate::error::AtlasError;
use crate::plot::{AtlasLocator, AtlasRect, GenerationCounter, Plot, PlotLocator};
use crate::resource::{BackendFormat, MaskFormat, ResourceProvider, TextureDescriptor};
use crate::token::DeferredUploadToken;
use crate::upload::{DeferredUploadTarget, TextureUpload};
use crate::usage::{BulkUseTokenUpdater, MruList};

/// Most pages an atlas can have when multitexturing is allowed.
pub const MAX_MULTITEXTURE_PAGES: u32 = 4;

/// Most plots a page can be divided into.
pub const MAX_PLOTS: u32 = 32;

/// A page texture and the plots it is divided into.
#[derive(Debug)]
struct Page<T> {
    texture: T,
    /// Indexed by plot index.
    plots: Vec<Plot>,
    mru: MruList,
}

/// Packs bitmaps of one [`MaskFormat`] into up to [`MAX_MULTITEXTURE_PAGES`] textures.
///
/// Each page is a grid of equally sized plots. Bitmaps are packed into the first page
/// with room, trying that page's plots from most to least recently used. When every
/// page is full and no more may be created, the least recently used plot of the whole
/// atlas is cleared and reused; locators into it stop being valid.
#[derive(Debug)]
pub struct DrawOpAtlas<T> {
    format: MaskFormat,
    backend_format: BackendFormat,
    texture_width: u32,
    texture_height: u32,
    plot_width: u16,
    plot_height: u16,
    plots_x: u32,
    plots_y: u32,
    max_pages: u32,
    pages: Vec<Page<T>>,
    generations: GenerationCounter,
    evicted: Vec<PlotLocator>,
}

impl<T> DrawOpAtlas<T> {
    /// Create an atlas of `format` pages sized `atlas_dimensions`, divided into plots
    /// of `plot_dimensions`.
    ///
    /// The first page is created immediately.
    pub fn new<P>(
        provider: &mut P,
        format: MaskFormat,
        atlas_dimensions: (u32, u32),
        plot_dimensions: (u32, u32),
        allow_multitexturing: AllowMultitexturing,
        generations: GenerationCounter,
    ) -> Result<Self, AtlasError>
    where
        P: ResourceProvider<Texture = T> + ?Sized,
    {
        let (texture_width, texture_height) = atlas_dimensions;
        let (plot_width, plot_height) = plot_dimensions;
        let invalid_layout = AtlasError::InvalidPlotLayout {
            page_width: texture_width,
            page_height: texture_height,
            plot_width,
            plot_height,
        };
        if plot_width == 0
            || plot_height == 0
            || texture_width > MAX_ATLAS_DIM
            || texture_height > MAX_ATLAS_DIM
            || texture_width % plot_width != 0
            || texture_height % plot_height != 0
        {
            return Err(invalid_layout);
        }
        let plots_x = texture_width / plot_width;
        let plots_y = texture_height / plot_height;
        if plots_x == 0 || plots_y == 0 || plots_x * plots_y > MAX_PLOTS {
            return Err(invalid_layout);
        }

        let backend_format = provider
            .caps()
            .default_backend_format(format.color_type())
            .ok_or(AtlasError::MissingBackendFormat(format.color_type()))?;

        let mut atlas = Self {
            format,
            backend_format,
            texture_width,
            texture_height,
            plot_width: plot_width as u16,
            plot_height: plot_height as u16,
            plots_x,
            plots_y,
            max_pages: allow_multitexturing.max_pages(),
            pages: Vec::new(),
            generations,
            evicted: Vec::new(),
        };
        atlas.activate_new_page(provider)?;
        debug!(
            "Created {format:?} atlas: {texture_width}x{texture_height} pages, \
             {plot_width}x{plot_height} plots, up to {} pages",
            atlas.max_pages
        );
        Ok(atlas)
    }

    /// The format of every bitmap in this atlas.
    pub fn format(&self) -> MaskFormat {
        self.format
    }

    /// The texture format pages are created with.
    pub fn backend_format(&self) -> BackendFormat {
        self.backend_format
    }

    /// Size of each page in texels.
    pub fn atlas_dimensions(&self) -> (u32, u32) {
        (self.texture_width, self.texture_height)
    }

    /// Size of each plot in texels; nothing larger can be packed.
    pub fn plot_dimensions(&self) -> (u32, u32) {
        (u32::from(self.plot_width), u32::from(self.plot_height))
    }

    /// Number of plots on each page.
    pub fn plots_per_page(&self) -> u32 {
        self.plots_x * self.plots_y
    }

    /// Most pages this atlas will create.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Number of pages created so far.
    pub fn num_active_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    /// The texture of page `page_index`, if that page exists.
    pub fn texture(&self, page_index: u32) -> Option<&T> {
        self.pages
            .get(page_index as usize)
            .map(|page| &page.texture)
    }

    /// The textures of all active pages, in page order.
    pub fn textures(&self) -> impl Iterator<Item = &T> + '_ {
        self.pages.iter().map(|page| &page.texture)
    }

    /// Average occupancy of the plots of page `page_index`, from 0.0 to 1.0.
    pub fn percent_full(&self, page_index: u32) -> Option<f32> {
        let page = self.pages.get(page_index as usize)?;
        let total: f32 = page.plots.iter().map(Plot::percent_full).sum();
        Some(total / page.plots.len() as f32)
    }

    /// Pack a `width` x `height` bitmap and schedule the upload of its `pixels`.
    ///
    /// `pixels` holds tightly packed rows in this atlas's format. The upload is queued on
    /// `target`: before the next recorded draw if the plot's previous content may still
    /// be read by recorded draws, as soon as possible otherwise.
    pub fn add_to_atlas<P, U>(
        &mut self,
        provider: &mut P,
        target: &mut U,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<AtlasLocator, AtlasError>
    where
        P: ResourceProvider<Texture = T> + ?Sized,
        U: DeferredUploadTarget + ?Sized,
    {
        if width > u32::from(self.plot_width) || height > u32::from(self.plot_height) {
            return Err(AtlasError::Oversized {
                width,
                height,
                plot_width: u32::from(self.plot_width),
                plot_height: u32::from(self.plot_height),
            });
        }
        let expected = width as usize * height as usize * self.format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(AtlasError::PixelDataMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let (width, height) = (width as u16, height as u16);

        for page_index in 0..self.pages.len() {
            if let Some(locator) = self.add_to_page(page_index, target, width, height, pixels) {
                return Ok(locator);
            }
        }

        if self.num_active_pages() < self.max_pages {
            self.activate_new_page(provider)?;
            let page_index = self.pages.len() - 1;
            return self
                .add_to_page(page_index, target, width, height, pixels)
                .ok_or(AtlasError::NoSpace);
        }

        let (page_index, plot_index) = self.lru_position().ok_or(AtlasError::NoSpace)?;
        let next_draw_token = target.token_tracker().next_draw_token();
        let plot = &mut self.pages[page_index].plots[plot_index];
        if plot.last_use() >= next_draw_token {
            return Err(AtlasError::TryAgain);
        }

        let evicted = plot.locator();
        plot.reset_rects(self.generations.next());
        self.evicted.push(evicted);
        debug!(
            "Evicted plot {plot_index} of page {page_index} from {:?} atlas",
            self.format
        );

        let rect = plot
            .add_sub_image(width, height)
            .ok_or(AtlasError::NoSpace)?;
        Ok(self.upload_to_plot(page_index, plot_index, target, rect, pixels))
    }

    /// Whether `locator` still refers to live content in this atlas.
    pub fn has_id(&self, locator: &AtlasLocator) -> bool {
        locator.is_valid()
            && self
                .plot(locator.page_index(), locator.plot_index())
                .is_some_and(|plot| plot.generation() == locator.generation())
    }

    /// Mark the plot behind `locator` as read by the draw with `token`.
    ///
    /// Locators that are no longer valid are ignored. A token older than the one
    /// already recorded leaves the plot unchanged.
    pub fn set_last_use_token(&mut self, locator: &AtlasLocator, token: DeferredUploadToken) {
        if !self.has_id(locator) {
            return;
        }
        self.mark_used(locator.page_index(), locator.plot_index(), token);
    }

    /// Mark every plot collected in `updater` as read by the draw with `token`.
    ///
    /// Plots on pages that no longer exist, and plots evicted since they were collected,
    /// are skipped.
    pub fn set_last_use_token_bulk(
        &mut self,
        updater: &BulkUseTokenUpdater,
        token: DeferredUploadToken,
    ) {
        for plot in updater.plots() {
            let live = self
                .plot(plot.page_index(), plot.plot_index())
                .is_some_and(|current| current.generation() == plot.generation());
            if live {
                self.mark_used(plot.page_index(), plot.plot_index(), token);
            }
        }
    }

    /// The plot the next eviction would pick.
    ///
    /// That is the plot with the oldest last use over all pages, the lowest page and
    /// then the lowest plot index winning ties.
    pub fn least_recently_used_plot(&self) -> Option<PlotLocator> {
        let (page_index, plot_index) = self.lru_position()?;
        Some(self.pages[page_index].plots[plot_index].locator())
    }

    /// The plots evicted since the last call, oldest first.
    ///
    /// Caches keyed by locator can use this to drop entries that no longer exist.
    pub fn take_evicted_plots(&mut self) -> Vec<PlotLocator> {
        std::mem::take(&mut self.evicted)
    }

    fn plot(&self, page_index: u32, plot_index: u32) -> Option<&Plot> {
        self.pages
            .get(page_index as usize)?
            .plots
            .get(plot_index as usize)
    }

    fn mark_used(&mut self, page_index: u32, plot_index: u32, token: DeferredUploadToken) {
        let Some(page) = self.pages.get_mut(page_index as usize) else {
            return;
        };
        let Some(plot) = page.plots.get_mut(plot_index as usize) else {
            return;
        };
        if !plot.set_last_use(token) {
            warn!(
                "Ignoring use token {} older than {} for plot {plot_index} of page {page_index}",
                token.sequence_number(),
                plot.last_use().sequence_number()
            );
            return;
        }
        page.mru.make_mru(plot_index);
    }

    fn lru_position(&self) -> Option<(usize, usize)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(page_index, page)| {
                page.plots
                    .iter()
                    .enumerate()
                    .map(move |(plot_index, plot)| (page_index, plot_index, plot.last_use()))
            })
            .min_by_key(|&(_, _, last_use)| last_use)
            .map(|(page_index, plot_index, _)| (page_index, plot_index))
    }

    fn add_to_page<U>(
        &mut self,
        page_index: usize,
        target: &mut U,
        width: u16,
        height: u16,
        pixels: &[u8],
    ) -> Option<AtlasLocator>
    where
        U: DeferredUploadTarget + ?Sized,
    {
        let page = &mut self.pages[page_index];
        let (plot_index, rect) = page.mru.iter().find_map(|plot_index| {
            page.plots[plot_index as usize]
                .add_sub_image(width, height)
                .map(|rect| (plot_index as usize, rect))
        })?;
        Some(self.upload_to_plot(page_index, plot_index, target, rect, pixels))
    }

    fn upload_to_plot<U>(
        &mut self,
        page_index: usize,
        plot_index: usize,
        target: &mut U,
        rect: AtlasRect,
        pixels: &[u8],
    ) -> AtlasLocator
    where
        U: DeferredUploadTarget + ?Sized,
    {
        let page = &mut self.pages[page_index];
        let plot = &page.plots[plot_index];
        page.mru.make_mru(plot.plot_index());

        if !rect.is_empty() {
            let upload = TextureUpload {
                format: self.format,
                page_index: page_index as u32,
                rect,
                pixels: pixels.to_vec(),
            };
            // Recorded draws may still read what was evicted from this plot.
            if plot.eviction_fence() >= target.token_tracker().next_token_to_flush() {
                target.add_inline_upload(upload);
            } else {
                target.add_asap_upload(upload);
            }
        }
        AtlasLocator::new(plot.locator(), rect)
    }

    fn activate_new_page<P>(&mut self, provider: &mut P) -> Result<(), AtlasError>
    where
        P: ResourceProvider<Texture = T> + ?Sized,
    {
        let page_index = self.pages.len() as u32;
        let texture = provider
            .create_texture(&TextureDescriptor {
                label: page_label(self.format),
                width: self.texture_width,
                height: self.texture_height,
                format: self.backend_format,
            })
            .ok_or(AtlasError::TextureAllocation {
                width: self.texture_width,
                height: self.texture_height,
            })?;

        let mut plots = Vec::with_capacity(self.plots_per_page() as usize);
        for y in 0..self.plots_y {
            for x in 0..self.plots_x {
                plots.push(Plot::new(
                    page_index,
                    y * self.plots_x + x,
                    self.generations.next(),
                    (
                        x as u16 * self.plot_width,
                        y as u16 * self.plot_height,
                    ),
                    self.plot_width,
                    self.plot_height,
                ));
            }
        }
        self.pages.push(Page {
            texture,
            mru: MruList::new(plots.len() as u32),
            plots,
        });
        debug!("Activated page {page_index} of {:?} atlas", self.format);
        Ok(())
    }
}

fn page_label(format: MaskFormat) -> &'static str {
    match format {
        MaskFormat::A8 => "vello_atlas A8 page",
        MaskFormat::A565 => "vello_atlas A565 page",
        MaskFormat::Argb => "vello_atlas ARGB page",
    }
}
