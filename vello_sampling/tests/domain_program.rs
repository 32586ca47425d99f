// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds fragment programs from texture domain effects the way a renderer would.

use vello_sampling::{
    EmitArgs, FilterMode, FragmentStage, IntRect, Mode, SamplerState, ShaderBuilder,
    SurfaceOrigin, TextureDomain, TextureDomainEffect, TextureView, UniformBlock, WrapMode,
};

const ARGS: EmitArgs<'static> = EmitArgs {
    output_color: "color",
    input_coords: "in.uv",
    texture: "tex",
    sampler: "tex_sampler",
    modulate: None,
};

fn build(effect: &TextureDomainEffect) -> (ShaderBuilder, <TextureDomainEffect as FragmentStage>::Program) {
    let mut program = effect.create_program();
    let mut builder = ShaderBuilder::new();
    builder.push_line("var color: vec4<f32>;");
    effect.emit_code(&mut program, &mut builder, &ARGS);
    (builder, program)
}

fn floats(block: &UniformBlock) -> Vec<f32> {
    block
        .as_bytes()
        .chunks_exact(4)
        .map(|bytes| f32::from_ne_bytes(bytes.try_into().unwrap()))
        .collect()
}

#[test]
fn subset_draw_with_texel_domain() {
    // A 10x10 subset at (4, 4) of a 64x64 texture, clamped so linear filtering does
    // not bleed in texels from outside the subset.
    let rect = TextureDomain::make_texel_domain(
        IntRect::new(4, 4, 14, 14),
        Mode::Clamp,
        Mode::Clamp,
    );
    let domain = TextureDomain::for_texture(64.0, 64.0, rect, Mode::Clamp, Mode::Clamp);
    let effect = TextureDomainEffect::new(
        TextureView::new(64, 64),
        SamplerState::new(FilterMode::Linear),
        domain,
    );

    let (builder, mut program) = build(&effect);
    let declarations = builder.uniform_declarations(0, 2);
    assert!(declarations.contains("TexDom_0: vec4<f32>,"));
    assert!(!declarations.contains("DecalParams"));
    assert!(builder.code().starts_with("var color: vec4<f32>;\n{\n"));

    let mut block = UniformBlock::new(&builder);
    effect.set_data(&mut program, &mut block);
    assert_eq!(floats(&block), [4.5 / 64.0, 4.5 / 64.0, 13.5 / 64.0, 13.5 / 64.0]);
}

#[test]
fn decal_domain_on_flipped_texture() {
    let domain = TextureDomain::new(
        vello_sampling::Rect::new(0.0, 0.0, 16.0, 8.0),
        Mode::Decal,
        Mode::Decal,
    );
    let view = TextureView::new(16, 16)
        .with_origin(SurfaceOrigin::BottomLeft)
        .with_texel_coords();
    let effect = TextureDomainEffect::new(view, SamplerState::default(), domain);

    let (builder, mut program) = build(&effect);
    assert!(builder.code().contains("errX"));
    assert!(builder.code().contains("errY"));

    let mut block = UniformBlock::new(&builder);
    effect.set_data(&mut program, &mut block);
    // Domain at offset 0, decal parameters at 16, nearest filtering.
    assert_eq!(floats(&block), [0.0, 8.0, 16.0, 16.0, 1.0, 1.0, 0.0, 0.0]);
    assert_eq!(block.write_count(), 2);
}

#[test]
fn decal_comes_from_modes_or_border_wrapping() {
    assert!(TextureDomain::is_decal_sampled(
        WrapMode::ClampToBorder,
        WrapMode::ClampToBorder,
        Mode::Decal,
        Mode::Decal,
    ));
    assert!(TextureDomain::is_decal_sampled(
        WrapMode::Clamp,
        WrapMode::Clamp,
        Mode::Clamp,
        Mode::Decal,
    ));
    assert!(!TextureDomain::is_decal_sampled(
        WrapMode::Repeat,
        WrapMode::Clamp,
        Mode::Clamp,
        Mode::Ignore,
    ));
}
