// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atlas pages in `wgpu` textures.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use wgpu::util::DeviceExt;
use wgpu::{TextureFormat, TextureUsages};

use crate::manager::AtlasManager;
use crate::resource::{
    BackendFormat, Caps, PatternedIndices, ResourceProvider, TextureDescriptor, UniqueKey,
};
use crate::upload::{TextureUpload, WritePixels};

/// Creates atlas pages and shared index buffers on a `wgpu` device.
#[derive(Debug)]
pub struct WgpuResourceProvider {
    device: Arc<wgpu::Device>,
    caps: Caps,
    index_buffers: HashMap<UniqueKey, Arc<wgpu::Buffer>>,
}

impl WgpuResourceProvider {
    /// A provider for `device`.
    ///
    /// `wgpu` has no 5-6-5 texture format, so A565 masks are stored as RGBA.
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        let caps = Caps {
            max_texture_size: device.limits().max_texture_dimension_2d,
            supports_rgb565: false,
        };
        Self {
            device,
            caps,
            index_buffers: HashMap::new(),
        }
    }

    /// The device resources are created on.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

fn texture_format(format: BackendFormat) -> Option<TextureFormat> {
    match format {
        BackendFormat::R8Unorm => Some(TextureFormat::R8Unorm),
        BackendFormat::Rgba8Unorm => Some(TextureFormat::Rgba8Unorm),
        BackendFormat::B5G6R5Unorm => None,
    }
}

impl ResourceProvider for WgpuResourceProvider {
    type Texture = wgpu::Texture;
    type IndexBuffer = Arc<wgpu::Buffer>;

    fn caps(&self) -> &Caps {
        &self.caps
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Option<wgpu::Texture> {
        let format = texture_format(descriptor.format)?;
        Some(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(descriptor.label),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            format,
            view_formats: &[],
        }))
    }

    fn find_or_create_patterned_index_buffer(
        &mut self,
        key: UniqueKey,
        indices: &PatternedIndices,
    ) -> Option<Arc<wgpu::Buffer>> {
        let device = &self.device;
        let buffer = self.index_buffers.entry(key).or_insert_with(|| {
            Arc::new(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vello_atlas patterned indices"),
                contents: indices.as_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            }))
        });
        Some(buffer.clone())
    }
}

/// Executes [`TextureUpload`]s into the pages of an [`AtlasManager`] with
/// [`wgpu::Queue::write_texture`].
#[derive(Debug)]
pub struct WgpuUploadWriter<'a> {
    queue: &'a wgpu::Queue,
    atlases: &'a AtlasManager<WgpuResourceProvider>,
}

impl<'a> WgpuUploadWriter<'a> {
    /// A writer into the pages of `atlases`.
    pub fn new(queue: &'a wgpu::Queue, atlases: &'a AtlasManager<WgpuResourceProvider>) -> Self {
        Self { queue, atlases }
    }
}

impl WritePixels for WgpuUploadWriter<'_> {
    fn write_pixels(&mut self, upload: &TextureUpload) {
        let Some(texture) = self.atlases.texture(upload.format, upload.page_index) else {
            warn!(
                "Dropping upload to missing page {} of {:?} atlas",
                upload.page_index, upload.format
            );
            return;
        };
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: u32::from(upload.rect.left),
                    y: u32::from(upload.rect.top),
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &upload.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row() as u32),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: u32::from(upload.rect.width()),
                height: u32::from(upload.rect.height()),
                depth_or_array_layers: 1,
            },
        );
    }
}
