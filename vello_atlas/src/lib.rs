// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-page atlases for glyph masks and other small bitmaps.
//!
//! An [`AtlasManager`] owns one [`DrawOpAtlas`] per [`MaskFormat`]. Each atlas is a
//! set of texture pages cut into fixed-size plots; bitmaps are packed into plots with
//! a guillotine allocator and addressed through generation-checked [`AtlasLocator`]s.
//!
//! Work is recorded now and executed later. Pixel data is therefore never written to
//! a texture directly: every successful [`DrawOpAtlas::add_to_atlas`] enqueues a
//! [`TextureUpload`] on a [`DeferredUploadTarget`], and draws mark the plots they read
//! with the [`DeferredUploadToken`] they will execute at. When all pages are in use
//! the plot with the oldest token is evicted, unless the draw being prepared still
//! needs it, in which case [`AtlasError::TryAgain`] is returned.
//!
//! ## Features
//!
//! - `wgpu`: Implements [`ResourceProvider`] and [`WritePixels`] on top of `wgpu`.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::cast_possible_truncation,
    reason = "Atlas coordinates are bounded by the maximum atlas dimension"
)]

mod config;
mod draw_op_atlas;
mod error;
mod manager;
mod plot;
mod resource;
mod token;
mod upload;
mod usage;
#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use config::{AllowMultitexturing, AtlasConfig, MAX_ATLAS_DIM};
pub use draw_op_atlas::{DrawOpAtlas, MAX_MULTITEXTURE_PAGES, MAX_PLOTS};
pub use error::AtlasError;
pub use manager::{AtlasManager, MAX_QUADS, QUAD_INDEX_PATTERN, VERTICES_PER_QUAD};
pub use plot::{AtlasLocator, AtlasRect, GenerationCounter, PlotLocator};
pub use resource::{
    BackendFormat, Caps, ColorType, MaskFormat, PatternedIndices, ResourceProvider,
    TextureDescriptor, UniqueKey, UniqueKeyDomains, MASK_FORMAT_COUNT,
};
pub use token::{DeferredUploadToken, TokenTracker};
pub use upload::{DeferredUploadTarget, TextureUpload, UploadQueue, WritePixels};
pub use usage::BulkUseTokenUpdater;
#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuResourceProvider, WgpuUploadWriter};
