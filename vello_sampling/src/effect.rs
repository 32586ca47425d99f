// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fragment stages built from texture domains.

use crate::builder::ShaderBuilder;
use crate::domain::TextureDomain;
use crate::domain_sampler::DomainSampler;
use crate::sampler::{SamplerState, TextureView};
use crate::uniforms::ProgramDataManager;

/// The WGSL names a stage emits its code against.
#[derive(Copy, Clone, Debug)]
pub struct EmitArgs<'a> {
    /// Variable receiving the stage's `vec4<f32>` output.
    pub output_color: &'a str,
    /// `vec2<f32>` expression for the texture coordinates.
    pub input_coords: &'a str,
    /// The texture binding.
    pub texture: &'a str,
    /// The sampler binding.
    pub sampler: &'a str,
    /// `vec4<f32>` expression the sampled color is multiplied by, if any.
    pub modulate: Option<&'a str>,
}

/// A piece of fragment shader with its own uniforms.
///
/// Stages with equal [`program_key`](Self::program_key)s generate the same code, so a
/// program built for one serves the others; only [`set_data`](Self::set_data) differs.
pub trait FragmentStage {
    /// Per-program state, such as uniform handles.
    type Program;

    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Distinguishes stages that generate different code.
    fn program_key(&self) -> u32;

    /// Fresh program state, before any code is emitted.
    fn create_program(&self) -> Self::Program;

    /// Append this stage's code to `builder`.
    fn emit_code(
        &self,
        program: &mut Self::Program,
        builder: &mut ShaderBuilder,
        args: &EmitArgs<'_>,
    );

    /// Upload this stage's uniforms for the next draw.
    fn set_data(&self, program: &mut Self::Program, pdman: &mut dyn ProgramDataManager);
}

/// Samples one texture through a [`TextureDomain`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextureDomainEffect {
    view: TextureView,
    sampler: SamplerState,
    domain: TextureDomain,
}

impl TextureDomainEffect {
    /// An effect sampling `view` with `sampler` inside `domain`.
    pub fn new(view: TextureView, sampler: SamplerState, domain: TextureDomain) -> Self {
        Self {
            view,
            sampler,
            domain,
        }
    }

    /// The sampled texture.
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Filtering and wrapping of the lookup.
    pub fn sampler(&self) -> SamplerState {
        self.sampler
    }

    /// The domain lookups are constrained to.
    pub fn domain(&self) -> &TextureDomain {
        &self.domain
    }
}

impl FragmentStage for TextureDomainEffect {
    type Program = DomainSampler;

    fn name(&self) -> &'static str {
        "TextureDomain"
    }

    fn program_key(&self) -> u32 {
        self.domain.domain_key()
    }

    fn create_program(&self) -> DomainSampler {
        DomainSampler::new()
    }

    fn emit_code(
        &self,
        program: &mut DomainSampler,
        builder: &mut ShaderBuilder,
        args: &EmitArgs<'_>,
    ) {
        program.sample_texture(
            builder,
            &self.domain,
            args.output_color,
            args.input_coords,
            args.texture,
            args.sampler,
            args.modulate,
        );
    }

    fn set_data(&self, program: &mut DomainSampler, pdman: &mut dyn ProgramDataManager) {
        program.set_data_for_view(pdman, &self.domain, &self.view, self.sampler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, Rect};
    use crate::sampler::FilterMode;
    use crate::uniforms::UniformBlock;

    const ARGS: EmitArgs<'static> = EmitArgs {
        output_color: "out",
        input_coords: "in.uv",
        texture: "atlas",
        sampler: "atlas_sampler",
        modulate: Some("in.color"),
    };

    fn effect(mode_x: Mode, mode_y: Mode, rect: Rect) -> TextureDomainEffect {
        TextureDomainEffect::new(
            TextureView::new(64, 32),
            SamplerState::new(FilterMode::Linear),
            TextureDomain::new(rect, mode_x, mode_y),
        )
    }

    #[test]
    fn key_ignores_the_rectangle() {
        let a = effect(Mode::Clamp, Mode::Decal, Rect::new(0.0, 0.0, 8.0, 8.0));
        let b = effect(Mode::Clamp, Mode::Decal, Rect::new(4.0, 4.0, 16.0, 16.0));
        let c = effect(Mode::Decal, Mode::Clamp, Rect::new(0.0, 0.0, 8.0, 8.0));
        assert_eq!(a.program_key(), b.program_key());
        assert_ne!(a.program_key(), c.program_key());
        assert_ne!(a, b);
    }

    #[test]
    fn one_program_serves_equal_keys() {
        let first = effect(Mode::Decal, Mode::Decal, Rect::new(0.0, 0.0, 32.0, 16.0));
        let mut program = first.create_program();
        let mut builder = ShaderBuilder::new();
        first.emit_code(&mut program, &mut builder, &ARGS);
        assert!(builder
            .code()
            .contains("textureSample(atlas, atlas_sampler, clampedCoord) * in.color"));

        let mut block = UniformBlock::new(&builder);
        first.set_data(&mut program, &mut block);
        assert_eq!(block.write_count(), 2);
        first.set_data(&mut program, &mut block);
        assert_eq!(block.write_count(), 2);

        let second = effect(Mode::Decal, Mode::Decal, Rect::new(32.0, 16.0, 64.0, 32.0));
        second.set_data(&mut program, &mut block);
        // Only the rectangle changed.
        assert_eq!(block.write_count(), 3);
    }
}
