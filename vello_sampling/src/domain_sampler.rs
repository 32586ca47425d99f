// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WGSL generation and uniform upload for domain-constrained sampling.

use log::{trace, warn};

use crate::builder::{ShaderBuilder, UniformHandle, UniformType};
use crate::domain::{Mode, TextureDomain};
use crate::sampler::{FilterMode, SamplerState, SurfaceOrigin, TextureView};
use crate::uniforms::ProgramDataManager;

/// Generates the code sampling through a [`TextureDomain`] and keeps its uniforms
/// up to date.
///
/// One `DomainSampler` belongs to one program and one domain within it. The domain
/// passed to the `set_data` methods must have the same modes as the one the code was
/// generated for; only its rectangle may change between draws.
#[derive(Clone, Debug)]
pub struct DomainSampler {
    modes: Option<(Mode, Mode)>,
    domain_uniform: Option<UniformHandle>,
    decal_uniform: Option<UniformHandle>,
    prev_domain: [f32; 4],
    prev_decal_params: [f32; 3],
}

impl Default for DomainSampler {
    fn default() -> Self {
        Self {
            modes: None,
            domain_uniform: None,
            decal_uniform: None,
            prev_domain: [f32::NAN; 4],
            prev_decal_params: [f32::NAN; 3],
        }
    }
}

impl DomainSampler {
    /// A sampler that has not generated any code yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit code assigning to `out_color` the texel of `texture` at `coords`, constrained
    /// by `domain`, and multiplied by `modulate` if given.
    ///
    /// `coords` is a `vec2<f32>` expression; `texture` and `sampler` name WGSL bindings.
    #[allow(
        clippy::too_many_arguments,
        reason = "Mirrors the inputs of a texture sample statement"
    )]
    pub fn sample_texture(
        &mut self,
        builder: &mut ShaderBuilder,
        domain: &TextureDomain,
        out_color: &str,
        coords: &str,
        texture: &str,
        sampler: &str,
        modulate: Option<&str>,
    ) {
        self.sample_with(builder, domain, out_color, coords, |coord| match modulate {
            Some(modulate) => format!("textureSample({texture}, {sampler}, {coord}) * {modulate}"),
            None => format!("textureSample({texture}, {sampler}, {coord})"),
        });
    }

    /// Emit code assigning to `out_color` the color `sample` produces at `coords`,
    /// constrained by `domain`.
    ///
    /// `sample` maps a `vec2<f32>` expression to a `vec4<f32>` expression. It is called
    /// once.
    pub fn sample_with(
        &mut self,
        builder: &mut ShaderBuilder,
        domain: &TextureDomain,
        out_color: &str,
        coords: &str,
        sample: impl FnOnce(&str) -> String,
    ) {
        let (mode_x, mode_y) = (domain.mode_x(), domain.mode_y());
        self.modes = Some((mode_x, mode_y));

        if domain.is_ignored() {
            builder.push_line(&format!("{out_color} = {};", sample(coords)));
            return;
        }

        let suffix = domain.index().map(|index| index.to_string()).unwrap_or_default();
        let domain_uniform = builder.add_uniform(UniformType::Vec4, &format!("TexDom{suffix}"));
        self.domain_uniform = Some(domain_uniform);
        let dom = builder.uniform_ref(domain_uniform);
        let decal = domain.has_decal().then(|| {
            let handle = builder.add_uniform(UniformType::Vec3, &format!("DecalParams{suffix}"));
            self.decal_uniform = Some(handle);
            builder.uniform_ref(handle)
        });

        builder.open_scope();
        builder.push_line(&format!("let origCoord = {coords};"));
        let x = clamped_axis(builder, mode_x, Axis::X, &dom);
        let y = clamped_axis(builder, mode_y, Axis::Y, &dom);
        builder.push_line(&format!("let clampedCoord = vec2<f32>({x}, {y});"));
        builder.push_line(&format!("let inside = {};", sample("clampedCoord")));

        match decal {
            Some(decal) => {
                builder.push_line("var coverage = 1.0;");
                for (axis, mode) in [(Axis::X, mode_x), (Axis::Y, mode_y)] {
                    if mode != Mode::Decal {
                        continue;
                    }
                    let c = axis.component();
                    let err = format!("err{}", axis.suffix());
                    // Distance outside the domain, in texels when the weight is the size.
                    builder.push_line(&format!(
                        "let {err} = abs(clampedCoord.{c} - origCoord.{c}) * {decal}.{c};"
                    ));
                    builder.push_line(&format!(
                        "coverage *= select(1.0 - {err}, 0.0, {err} > {decal}.z);"
                    ));
                }
                builder.push_line(&format!("{out_color} = inside * coverage;"));
            }
            None => builder.push_line(&format!("{out_color} = inside;")),
        }
        builder.close_scope();
    }

    /// Upload the domain rectangle as given, with unit decal weights.
    ///
    /// With `filter_if_decal`, decal axes fade to transparent over one unit outside the
    /// domain; otherwise they cut off at its edge.
    pub fn set_data(
        &mut self,
        pdman: &mut dyn ProgramDataManager,
        domain: &TextureDomain,
        filter_if_decal: bool,
    ) {
        self.upload(pdman, domain, None, filter_if_decal);
    }

    /// Upload the domain rectangle for sampling `view` with `sampler`.
    ///
    /// Decal edges are filtered when the sampler filters linearly.
    pub fn set_data_for_view(
        &mut self,
        pdman: &mut dyn ProgramDataManager,
        domain: &TextureDomain,
        view: &TextureView,
        sampler: SamplerState,
    ) {
        self.upload(pdman, domain, Some(view), sampler.filter == FilterMode::Linear);
    }

    /// Upload the domain rectangle for sampling `view`, with explicit decal filtering.
    ///
    /// The rectangle is given in texels. It is normalized for textures addressed in
    /// `[0, 1]` and flipped for bottom-left origin textures.
    pub fn set_data_for_texture(
        &mut self,
        pdman: &mut dyn ProgramDataManager,
        domain: &TextureDomain,
        view: &TextureView,
        filter_if_decal: bool,
    ) {
        self.upload(pdman, domain, Some(view), filter_if_decal);
    }

    fn upload(
        &mut self,
        pdman: &mut dyn ProgramDataManager,
        domain: &TextureDomain,
        view: Option<&TextureView>,
        filter_if_decal: bool,
    ) {
        if let Some(modes) = self.modes {
            if modes != (domain.mode_x(), domain.mode_y()) {
                warn!(
                    "Texture domain modes {:?} differ from the generated code's {modes:?}",
                    (domain.mode_x(), domain.mode_y())
                );
            }
        }
        if domain.is_ignored() {
            return;
        }
        let Some(domain_uniform) = self.domain_uniform else {
            warn!("Texture domain data set before its code was generated");
            return;
        };

        let mut scale = [1.0, 1.0];
        let mut flip_height = None;
        let mut decal_weights = [1.0, 1.0];
        if let Some(view) = view {
            let (width, height) = (view.width as f32, view.height as f32);
            if view.normalized_coords {
                scale = [1.0 / width, 1.0 / height];
                decal_weights = [width, height];
            }
            if view.origin == SurfaceOrigin::BottomLeft {
                flip_height = Some(if view.normalized_coords { 1.0 } else { height });
            }
        }

        let rect = domain.rect();
        let mut values = [
            rect.left * scale[0],
            rect.top * scale[1],
            rect.right * scale[0],
            rect.bottom * scale[1],
        ];
        if let Some(height) = flip_height {
            values[1] = height - values[1];
            values[3] = height - values[3];
            values.swap(1, 3);
        }
        if bits(&values) != bits(&self.prev_domain) {
            pdman.set_vec4(domain_uniform, values);
            self.prev_domain = values;
        } else {
            trace!("Texture domain unchanged, skipping upload");
        }

        if let Some(decal_uniform) = self.decal_uniform {
            let params = [
                decal_weights[0],
                decal_weights[1],
                if filter_if_decal { 1.0 } else { 0.0 },
            ];
            if bits(&params) != bits(&self.prev_decal_params) {
                pdman.set_vec3(decal_uniform, params);
                self.prev_decal_params = params;
            } else {
                trace!("Decal parameters unchanged, skipping upload");
            }
        }
    }
}

/// Bit patterns, so that NaN compares unequal to everything but itself and `-0.0`
/// differs from `0.0`.
fn bits<const N: usize>(values: &[f32; N]) -> [u32; N] {
    values.map(f32::to_bits)
}

#[derive(Copy, Clone, Debug)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn component(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
        }
    }

    fn suffix(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
        }
    }

    /// Components of the domain vector holding the low and high edge.
    fn edges(self) -> (char, char) {
        match self {
            Self::X => ('x', 'z'),
            Self::Y => ('y', 'w'),
        }
    }
}

/// An expression for the coordinate along `axis` moved into the domain, emitting any
/// helper locals it needs.
fn clamped_axis(builder: &mut ShaderBuilder, mode: Mode, axis: Axis, dom: &str) -> String {
    let c = axis.component();
    let (lo, hi) = axis.edges();
    match mode {
        Mode::Ignore => format!("origCoord.{c}"),
        Mode::Clamp | Mode::Decal => format!("clamp(origCoord.{c}, {dom}.{lo}, {dom}.{hi})"),
        Mode::Repeat => {
            let s = axis.suffix();
            builder.push_line(&format!("let repeatW{s} = {dom}.{hi} - {dom}.{lo};"));
            builder.push_line(&format!("let repeatD{s} = origCoord.{c} - {dom}.{lo};"));
            format!("{dom}.{lo} + repeatD{s} - repeatW{s} * floor(repeatD{s} / repeatW{s})")
        }
        Mode::MirrorRepeat => {
            let s = axis.suffix();
            builder.push_line(&format!("let mirrorW{s} = {dom}.{hi} - {dom}.{lo};"));
            builder.push_line(&format!("let mirrorD{s} = origCoord.{c} - {dom}.{lo};"));
            builder.push_line(&format!(
                "let mirrorM{s} = mirrorD{s} - 2.0 * mirrorW{s} * floor(mirrorD{s} / (2.0 * mirrorW{s}));"
            ));
            format!(
                "mix(mirrorM{s}, 2.0 * mirrorW{s} - mirrorM{s}, step(mirrorW{s}, mirrorM{s})) + {dom}.{lo}"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rect;

    #[derive(Debug, Default)]
    struct RecordingManager {
        vec3: Vec<(UniformHandle, [f32; 3])>,
        vec4: Vec<(UniformHandle, [f32; 4])>,
    }

    impl ProgramDataManager for RecordingManager {
        fn set_vec3(&mut self, handle: UniformHandle, value: [f32; 3]) {
            self.vec3.push((handle, value));
        }

        fn set_vec4(&mut self, handle: UniformHandle, value: [f32; 4]) {
            self.vec4.push((handle, value));
        }
    }

    fn emit(domain: &TextureDomain) -> (DomainSampler, ShaderBuilder) {
        let mut sampler = DomainSampler::new();
        let mut builder = ShaderBuilder::new();
        sampler.sample_texture(&mut builder, domain, "color", "uv", "tex", "samp", None);
        (sampler, builder)
    }

    fn domain(mode_x: Mode, mode_y: Mode) -> TextureDomain {
        TextureDomain::new(Rect::new(1.0, 2.0, 3.0, 4.0), mode_x, mode_y)
    }

    #[test]
    fn ignored_domain_samples_directly() {
        let mut sampler = DomainSampler::new();
        let mut builder = ShaderBuilder::new();
        sampler.sample_texture(
            &mut builder,
            &TextureDomain::ignored(),
            "color",
            "uv",
            "tex",
            "samp",
            Some("tint"),
        );
        assert_eq!(builder.code(), "color = textureSample(tex, samp, uv) * tint;\n");
        assert_eq!(builder.uniform_count(), 0);

        let mut pdman = RecordingManager::default();
        sampler.set_data(&mut pdman, &TextureDomain::ignored(), true);
        assert!(pdman.vec4.is_empty() && pdman.vec3.is_empty());
    }

    #[test]
    fn clamp_code() {
        let (_, builder) = emit(&domain(Mode::Clamp, Mode::Clamp));
        assert_eq!(
            builder.code(),
            "{\n\
             \x20   let origCoord = uv;\n\
             \x20   let clampedCoord = vec2<f32>(\
             clamp(origCoord.x, uniforms.TexDom_0.x, uniforms.TexDom_0.z), \
             clamp(origCoord.y, uniforms.TexDom_0.y, uniforms.TexDom_0.w));\n\
             \x20   let inside = textureSample(tex, samp, clampedCoord);\n\
             \x20   color = inside;\n\
             }\n"
        );
    }

    #[test]
    fn decal_code_weights_each_axis() {
        let (_, builder) = emit(&domain(Mode::Decal, Mode::Ignore));
        let code = builder.code();
        assert!(code.contains("vec2<f32>(clamp(origCoord.x, uniforms.TexDom_0.x, uniforms.TexDom_0.z), origCoord.y)"));
        assert!(code.contains(
            "let errX = abs(clampedCoord.x - origCoord.x) * uniforms.DecalParams_1.x;"
        ));
        assert!(code.contains("coverage *= select(1.0 - errX, 0.0, errX > uniforms.DecalParams_1.z);"));
        assert!(!code.contains("errY"));
        assert!(code.contains("color = inside * coverage;"));
    }

    #[test]
    fn repeat_modes_wrap_into_domain() {
        let (_, builder) = emit(&domain(Mode::Repeat, Mode::MirrorRepeat));
        let code = builder.code();
        assert!(code.contains("let repeatWX = uniforms.TexDom_0.z - uniforms.TexDom_0.x;"));
        assert!(code.contains(
            "uniforms.TexDom_0.x + repeatDX - repeatWX * floor(repeatDX / repeatWX)"
        ));
        assert!(code.contains("let mirrorWY = uniforms.TexDom_0.w - uniforms.TexDom_0.y;"));
        assert!(code.contains(
            "mix(mirrorMY, 2.0 * mirrorWY - mirrorMY, step(mirrorWY, mirrorMY)) + uniforms.TexDom_0.y"
        ));
        assert_eq!(builder.uniform_count(), 1);
    }

    #[test]
    fn uniforms_match_modes_for_every_combination() {
        for mode_y in Mode::ALL {
            for mode_x in Mode::ALL {
                let domain = domain(mode_x, mode_y);
                let (_, builder) = emit(&domain);
                let expected = match (domain.is_ignored(), domain.has_decal()) {
                    (true, _) => 0,
                    (false, false) => 1,
                    (false, true) => 2,
                };
                assert_eq!(builder.uniform_count(), expected, "{mode_x:?} {mode_y:?}");
                let code = builder.code();
                assert!(code.contains("color = "), "{mode_x:?} {mode_y:?}");
                assert_eq!(
                    code.matches('{').count(),
                    code.matches('}').count(),
                    "{mode_x:?} {mode_y:?}"
                );
            }
        }
    }

    #[test]
    fn indexed_domains_get_distinct_uniforms() {
        let mut builder = ShaderBuilder::new();
        let first = domain(Mode::Decal, Mode::Decal).with_index(0);
        let second = domain(Mode::Decal, Mode::Decal).with_index(1);
        DomainSampler::new().sample_texture(&mut builder, &first, "a", "uv", "t", "s", None);
        DomainSampler::new().sample_texture(&mut builder, &second, "b", "uv", "t", "s", None);
        let names: Vec<_> = builder
            .uniform_layout()
            .map(|(handle, _, _)| builder.uniform_name(handle).to_owned())
            .collect();
        assert_eq!(
            names,
            ["TexDom0_0", "DecalParams0_1", "TexDom1_2", "DecalParams1_3"]
        );
    }

    #[test]
    fn redundant_uploads_are_skipped() {
        let domain = domain(Mode::Clamp, Mode::Clamp);
        let (mut sampler, _) = emit(&domain);
        let mut pdman = RecordingManager::default();

        sampler.set_data(&mut pdman, &domain, false);
        assert_eq!(pdman.vec4.len(), 1);
        assert_eq!(pdman.vec4[0].1, [1.0, 2.0, 3.0, 4.0]);

        sampler.set_data(&mut pdman, &domain, false);
        sampler.set_data(&mut pdman, &domain, true);
        assert_eq!(pdman.vec4.len(), 1);
        assert!(pdman.vec3.is_empty());

        let moved = TextureDomain::new(Rect::new(1.0, 2.0, 3.0, 5.0), Mode::Clamp, Mode::Clamp);
        sampler.set_data(&mut pdman, &moved, false);
        assert_eq!(pdman.vec4.len(), 2);
        assert_eq!(pdman.vec4[1].1, [1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn decal_params_follow_filtering() {
        let domain = domain(Mode::Ignore, Mode::Decal);
        let (mut sampler, _) = emit(&domain);
        let mut pdman = RecordingManager::default();

        sampler.set_data(&mut pdman, &domain, false);
        assert_eq!(pdman.vec3.len(), 1);
        assert_eq!(pdman.vec3[0].0.index(), 1);
        assert_eq!(pdman.vec3[0].1, [1.0, 1.0, 0.0]);
        sampler.set_data(&mut pdman, &domain, false);
        assert_eq!(pdman.vec3.len(), 1);
        sampler.set_data(&mut pdman, &domain, true);
        assert_eq!(pdman.vec3.len(), 2);
        assert_eq!(pdman.vec3[1].1, [1.0, 1.0, 1.0]);
        // The rectangle itself did not change.
        assert_eq!(pdman.vec4.len(), 1);
    }

    #[test]
    fn normalized_textures_scale_the_rectangle() {
        let domain = TextureDomain::new(Rect::new(2.0, 4.0, 6.0, 8.0), Mode::Decal, Mode::Clamp);
        let (mut sampler, _) = emit(&domain);
        let mut pdman = RecordingManager::default();
        let view = TextureView::new(8, 16);
        sampler.set_data_for_view(
            &mut pdman,
            &domain,
            &view,
            SamplerState::new(FilterMode::Linear),
        );
        assert_eq!(pdman.vec4[0].1, [0.25, 0.25, 0.75, 0.5]);
        assert_eq!(pdman.vec3[0].1, [8.0, 16.0, 1.0]);
    }

    #[test]
    fn texel_textures_keep_the_rectangle() {
        let domain = TextureDomain::new(Rect::new(2.0, 4.0, 6.0, 8.0), Mode::Decal, Mode::Clamp);
        let (mut sampler, _) = emit(&domain);
        let mut pdman = RecordingManager::default();
        let view = TextureView::new(8, 16).with_texel_coords();
        sampler.set_data_for_view(&mut pdman, &domain, &view, SamplerState::default());
        assert_eq!(pdman.vec4[0].1, [2.0, 4.0, 6.0, 8.0]);
        assert_eq!(pdman.vec3[0].1, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn bottom_left_origin_flips_vertically() {
        let domain = TextureDomain::new(Rect::new(2.0, 4.0, 6.0, 8.0), Mode::Clamp, Mode::Clamp);
        let (mut sampler, _) = emit(&domain);
        let mut pdman = RecordingManager::default();

        let view = TextureView::new(8, 16).with_origin(SurfaceOrigin::BottomLeft);
        sampler.set_data_for_texture(&mut pdman, &domain, &view, false);
        assert_eq!(pdman.vec4[0].1, [0.25, 0.5, 0.75, 0.75]);

        let view = view.with_texel_coords();
        sampler.set_data_for_texture(&mut pdman, &domain, &view, false);
        assert_eq!(pdman.vec4[1].1, [2.0, 8.0, 6.0, 12.0]);
    }
}
