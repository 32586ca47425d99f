// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture lookups constrained to a sub-rectangle of a texture.
//!
//! A [`TextureDomain`] names a rectangle of texture space and, for each axis, what
//! happens to coordinates that fall outside it ([`Mode`]). A [`DomainSampler`] turns a
//! domain into WGSL statements at program build time and keeps the program's domain
//! uniforms current afterwards, writing them only when they change.
//!
//! [`TextureDomainEffect`] packages both as a [`FragmentStage`] that samples one
//! texture through a domain.

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

mod builder;
mod domain;
mod domain_sampler;
mod effect;
mod sampler;
mod uniforms;

pub use builder::{ShaderBuilder, UniformHandle, UniformType};
pub use domain::{IntRect, Mode, Rect, TextureDomain, DOMAIN_KEY_BITS, MODE_BITS};
pub use domain_sampler::DomainSampler;
pub use effect::{EmitArgs, FragmentStage, TextureDomainEffect};
pub use sampler::{FilterMode, SamplerState, SurfaceOrigin, TextureView, WrapMode};
pub use uniforms::{ProgramDataManager, UniformBlock};
