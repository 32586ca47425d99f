// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One atlas per mask format, created on demand.

use log::debug;

use crate::config::{AllowMultitexturing, AtlasConfig};
use crate::draw_op_atlas::DrawOpAtlas;
use crate::error::AtlasError;
use crate::plot::{AtlasLocator, GenerationCounter, PlotLocator};
use crate::resource::{
    ColorType, MaskFormat, PatternedIndices, ResourceProvider, UniqueKey, UniqueKeyDomains,
    MASK_FORMAT_COUNT,
};
use crate::token::DeferredUploadToken;
use crate::upload::DeferredUploadTarget;
use crate::usage::BulkUseTokenUpdater;

/// Most quads the shared quad index buffer can draw at once.
pub const MAX_QUADS: usize = 2048;

/// Vertices of one quad.
pub const VERTICES_PER_QUAD: u16 = 4;

/// Indices of one quad, as two triangles.
pub const QUAD_INDEX_PATTERN: [u16; 6] = [0, 1, 2, 2, 1, 3];

type AtlasSlots<T> = [Option<DrawOpAtlas<T>>; MASK_FORMAT_COUNT];

/// Everything needed to create an atlas, kept apart from the atlas slots so both can
/// be borrowed at once.
#[derive(Clone, Debug)]
struct AtlasSettings {
    config: AtlasConfig,
    allow_multitexturing: AllowMultitexturing,
    generations: GenerationCounter,
}

/// Owns the atlases for every [`MaskFormat`] and the resource provider they live in.
///
/// Atlases are created the first time content of their format is added. Formats the
/// backend cannot store are redirected: A565 masks go to the ARGB atlas, expanded to
/// RGBA, when the backend has no 5-6-5 texture format.
pub struct AtlasManager<P: ResourceProvider> {
    provider: P,
    settings: AtlasSettings,
    atlases: AtlasSlots<P::Texture>,
    quad_index_key: UniqueKey,
    quad_index_buffer: Option<P::IndexBuffer>,
}

impl<P: ResourceProvider> std::fmt::Debug for AtlasManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasManager")
            .field("settings", &self.settings)
            .field(
                "active_atlases",
                &MaskFormat::ALL
                    .iter()
                    .filter(|format| self.atlases[format.index()].is_some())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<P: ResourceProvider> AtlasManager<P> {
    /// Create a manager whose ARGB atlas fits in `max_texture_bytes`.
    ///
    /// `domains` is the key-domain allocator shared by everything caching resources in
    /// `provider`.
    pub fn new(
        provider: P,
        max_texture_bytes: usize,
        allow_multitexturing: AllowMultitexturing,
        domains: &mut UniqueKeyDomains,
    ) -> Self {
        let config = AtlasConfig::new(provider.caps().max_texture_size, max_texture_bytes);
        Self::with_config(provider, config, allow_multitexturing, domains)
    }

    /// Create a manager with an explicit size policy.
    pub fn with_config(
        provider: P,
        config: AtlasConfig,
        allow_multitexturing: AllowMultitexturing,
        domains: &mut UniqueKeyDomains,
    ) -> Self {
        Self {
            provider,
            settings: AtlasSettings {
                config,
                allow_multitexturing,
                generations: GenerationCounter::new(),
            },
            atlases: [None, None, None],
            quad_index_key: UniqueKey::new(domains.generate(), 0),
            quad_index_buffer: None,
        }
    }

    /// The resource provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The resource provider, mutably.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The size policy atlases are created with.
    pub fn config(&self) -> &AtlasConfig {
        &self.settings.config
    }

    /// The format content of `format` is actually stored in.
    pub fn resolve_mask_format(&self, format: MaskFormat) -> MaskFormat {
        if format == MaskFormat::A565
            && self
                .provider
                .caps()
                .default_backend_format(ColorType::Bgr565)
                .is_none()
        {
            MaskFormat::Argb
        } else {
            format
        }
    }

    /// The atlas for `format`, if it has been created.
    pub fn atlas(&self, format: MaskFormat) -> Option<&DrawOpAtlas<P::Texture>> {
        self.atlases[self.resolve_mask_format(format).index()].as_ref()
    }

    /// The atlas for `format`, created if needed.
    ///
    /// A failed creation is not remembered; the next call tries again.
    pub fn get_or_create_atlas(
        &mut self,
        format: MaskFormat,
    ) -> Result<&mut DrawOpAtlas<P::Texture>, AtlasError> {
        let format = self.resolve_mask_format(format);
        get_or_create(&mut self.atlases, &mut self.provider, &self.settings, format)
    }

    /// The texture of page `page_index` of the `format` atlas.
    pub fn texture(&self, format: MaskFormat, page_index: u32) -> Option<&P::Texture> {
        self.atlas(format)?.texture(page_index)
    }

    /// Pack a `width` x `height` bitmap of `format` and queue its upload on `target`.
    pub fn add_to_atlas<U>(
        &mut self,
        target: &mut U,
        format: MaskFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<AtlasLocator, AtlasError>
    where
        U: DeferredUploadTarget + ?Sized,
    {
        let resolved = self.resolve_mask_format(format);
        // Before the atlas is created: oversized requests never allocate a texture.
        let (plot_width, plot_height) = match &self.atlases[resolved.index()] {
            Some(atlas) => atlas.plot_dimensions(),
            None => self.settings.config.plot_dimensions(resolved),
        };
        if width > plot_width || height > plot_height {
            return Err(AtlasError::Oversized {
                width,
                height,
                plot_width,
                plot_height,
            });
        }
        let expanded;
        let pixels = if resolved == format {
            pixels
        } else {
            let expected = width as usize * height as usize * format.bytes_per_pixel();
            if pixels.len() != expected {
                return Err(AtlasError::PixelDataMismatch {
                    expected,
                    actual: pixels.len(),
                });
            }
            expanded = expand_565_to_rgba(pixels);
            &expanded
        };
        let atlas = get_or_create(&mut self.atlases, &mut self.provider, &self.settings, resolved)?;
        atlas.add_to_atlas(&mut self.provider, target, width, height, pixels)
    }

    /// Whether `locator` still refers to live content of `format`.
    ///
    /// Never creates an atlas.
    pub fn has_glyph(&self, format: MaskFormat, locator: &AtlasLocator) -> bool {
        self.atlas(format)
            .is_some_and(|atlas| atlas.has_id(locator))
    }

    /// Mark the plot behind `locator` as read by the draw with `token`, and record it in
    /// `updater`.
    ///
    /// Returns `false` if the content is gone and must be added again.
    pub fn add_and_mark_used(
        &mut self,
        updater: &mut BulkUseTokenUpdater,
        format: MaskFormat,
        locator: &AtlasLocator,
        token: DeferredUploadToken,
    ) -> bool {
        let index = self.resolve_mask_format(format).index();
        let Some(atlas) = self.atlases[index].as_mut() else {
            return false;
        };
        if !atlas.has_id(locator) {
            return false;
        }
        if updater.add(locator) {
            atlas.set_last_use_token(locator, token);
        }
        true
    }

    /// Mark every plot in `updater` as read by the draw with `token`.
    pub fn set_use_token_bulk(
        &mut self,
        updater: &BulkUseTokenUpdater,
        token: DeferredUploadToken,
        format: MaskFormat,
    ) {
        let index = self.resolve_mask_format(format).index();
        if let Some(atlas) = self.atlases[index].as_mut() {
            atlas.set_last_use_token_bulk(updater, token);
        }
    }

    /// The plots of the `format` atlas evicted since the last call.
    pub fn take_evicted_plots(&mut self, format: MaskFormat) -> Vec<PlotLocator> {
        let index = self.resolve_mask_format(format).index();
        self.atlases[index]
            .as_mut()
            .map(DrawOpAtlas::take_evicted_plots)
            .unwrap_or_default()
    }

    /// Drop every atlas and its textures.
    ///
    /// Atlases are recreated on demand. Locators issued before stay invalid. Recorded
    /// work must not refer to the dropped textures.
    pub fn free_all(&mut self) {
        self.atlases = [None, None, None];
        debug!("Freed all atlases");
    }

    /// Drop every atlas and recreate them with the smallest possible pages.
    pub fn set_atlas_dimensions_to_minimum_for_testing(&mut self) {
        self.free_all();
        self.settings.config = AtlasConfig::minimal();
    }

    /// An index buffer drawing up to [`MAX_QUADS`] quads of [`VERTICES_PER_QUAD`]
    /// vertices each, shared through the provider's resource cache.
    pub fn quad_index_buffer(&mut self) -> Option<P::IndexBuffer> {
        if let Some(buffer) = &self.quad_index_buffer {
            return Some(buffer.clone());
        }
        let indices = PatternedIndices::new(&QUAD_INDEX_PATTERN, MAX_QUADS, VERTICES_PER_QUAD)?;
        let buffer = self
            .provider
            .find_or_create_patterned_index_buffer(self.quad_index_key, &indices)?;
        self.quad_index_buffer = Some(buffer.clone());
        Some(buffer)
    }
}

fn get_or_create<'a, P: ResourceProvider>(
    atlases: &'a mut AtlasSlots<P::Texture>,
    provider: &mut P,
    settings: &AtlasSettings,
    format: MaskFormat,
) -> Result<&'a mut DrawOpAtlas<P::Texture>, AtlasError> {
    let slot = &mut atlases[format.index()];
    let atlas = match slot.take() {
        Some(atlas) => atlas,
        None => DrawOpAtlas::new(
            provider,
            format,
            settings.config.atlas_dimensions(format),
            settings.config.plot_dimensions(format),
            settings.allow_multitexturing,
            settings.generations.clone(),
        )?,
    };
    Ok(slot.insert(atlas))
}

/// Expand native-endian RGB 5-6-5 pixels to opaque RGBA 8-8-8-8.
fn expand_565_to_rgba(pixels: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixels.len() * 2);
    for pixel in pixels.chunks_exact(2) {
        let value = u16::from_ne_bytes([pixel[0], pixel[1]]);
        let r = ((value >> 11) & 0x1f) as u8;
        let g = ((value >> 5) & 0x3f) as u8;
        let b = (value & 0x1f) as u8;
        rgba.extend_from_slice(&[
            (r << 3) | (r >> 2),
            (g << 2) | (g >> 4),
            (b << 3) | (b >> 2),
            0xff,
        ]);
    }
    rgba
}
