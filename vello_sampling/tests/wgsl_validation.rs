// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generated sampling code forms valid WGSL modules.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use vello_sampling::{DomainSampler, Mode, Rect, ShaderBuilder, TextureDomain};

/// Wrap the builder's uniforms and statements in a fragment shader.
fn fragment_module(builder: &ShaderBuilder) -> String {
    let mut body = String::new();
    for line in builder.code().lines() {
        body.push_str("    ");
        body.push_str(line);
        body.push('\n');
    }
    format!(
        "{uniforms}\n\
         @group(0) @binding(0) var tex: texture_2d<f32>;\n\
         @group(0) @binding(1) var tex_sampler: sampler;\n\
         \n\
         @fragment\n\
         fn fs_main(@location(0) uv: vec2<f32>, @location(1) tint: vec4<f32>) -> @location(0) vec4<f32> {{\n\
         \x20   var color: vec4<f32>;\n\
         {body}\
         \x20   return color;\n\
         }}\n",
        uniforms = builder.uniform_declarations(0, 2),
    )
}

fn validate(source: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| format!("{e:?}"))?;
    Ok(())
}

#[test]
fn every_mode_pair_validates() {
    let rect = Rect::new(0.5, 0.5, 31.5, 15.5);
    for mode_y in Mode::ALL {
        for mode_x in Mode::ALL {
            for modulate in [None, Some("tint")] {
                let domain = TextureDomain::new(rect, mode_x, mode_y);
                let mut builder = ShaderBuilder::new();
                DomainSampler::new().sample_texture(
                    &mut builder,
                    &domain,
                    "color",
                    "uv",
                    "tex",
                    "tex_sampler",
                    modulate,
                );
                let source = fragment_module(&builder);
                if let Err(error) = validate(&source) {
                    panic!("{mode_x:?} {mode_y:?} {modulate:?}:\n{error}\n{source}");
                }
            }
        }
    }
}

#[test]
fn several_domains_share_a_module() {
    let mut builder = ShaderBuilder::new();
    builder.push_line("var second: vec4<f32>;");
    let first_rect = Rect::new(0.0, 0.0, 8.0, 8.0);
    let first = TextureDomain::new(first_rect, Mode::Decal, Mode::MirrorRepeat).with_index(0);
    let other_rect = Rect::new(8.0, 0.0, 16.0, 8.0);
    let other = TextureDomain::new(other_rect, Mode::Repeat, Mode::Decal).with_index(1);
    DomainSampler::new().sample_texture(
        &mut builder,
        &first,
        "color",
        "uv",
        "tex",
        "tex_sampler",
        None,
    );
    DomainSampler::new().sample_with(&mut builder, &other, "second", "uv * 0.5", |coord| {
        format!("textureSampleLevel(tex, tex_sampler, {coord}, 0.0)")
    });
    builder.push_line("color = color + second;");

    let source = fragment_module(&builder);
    if let Err(error) = validate(&source) {
        panic!("{error}\n{source}");
    }
}
