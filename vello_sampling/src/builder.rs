// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accumulates WGSL statements and the uniforms they read.

/// Name of the uniform buffer binding generated programs read uniforms through.
const UNIFORMS_VAR: &str = "uniforms";

/// Name of the struct type of [`UNIFORMS_VAR`].
const UNIFORMS_STRUCT: &str = "Uniforms";

/// The type of a uniform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `f32`
    Float,
    /// `vec2<f32>`
    Vec2,
    /// `vec3<f32>`
    Vec3,
    /// `vec4<f32>`
    Vec4,
}

impl UniformType {
    /// The WGSL spelling of the type.
    pub fn wgsl(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
        }
    }

    /// Number of `f32` components.
    pub fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// Size in bytes inside a uniform buffer.
    pub fn size(self) -> usize {
        self.components() * 4
    }

    /// Alignment in bytes inside a uniform buffer.
    pub fn align(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 => 16,
        }
    }
}

/// Refers to a uniform registered with a [`ShaderBuilder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformHandle(usize);

impl UniformHandle {
    /// Position of the uniform in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct UniformInfo {
    name: String,
    ty: UniformType,
    offset: usize,
}

/// Builds the body of a WGSL fragment function and the uniform struct it reads.
///
/// Uniform names are mangled so stages choosing the same name do not collide; the
/// expression to read a uniform is given by [`uniform_ref`](Self::uniform_ref).
#[derive(Clone, Debug, Default)]
pub struct ShaderBuilder {
    code: String,
    indent: usize,
    uniforms: Vec<UniformInfo>,
    uniform_size: usize,
}

impl ShaderBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a uniform named after `name`.
    pub fn add_uniform(&mut self, ty: UniformType, name: &str) -> UniformHandle {
        let handle = UniformHandle(self.uniforms.len());
        let offset = self.uniform_size.next_multiple_of(ty.align());
        self.uniforms.push(UniformInfo {
            name: format!("{name}_{}", handle.0),
            ty,
            offset,
        });
        self.uniform_size = offset + ty.size();
        handle
    }

    /// The mangled name of a uniform.
    pub fn uniform_name(&self, handle: UniformHandle) -> &str {
        &self.uniforms[handle.0].name
    }

    /// A WGSL expression reading a uniform.
    pub fn uniform_ref(&self, handle: UniformHandle) -> String {
        format!("{UNIFORMS_VAR}.{}", self.uniforms[handle.0].name)
    }

    /// The type of a uniform.
    pub fn uniform_type(&self, handle: UniformHandle) -> UniformType {
        self.uniforms[handle.0].ty
    }

    /// Byte offset of a uniform inside the uniform buffer.
    pub fn uniform_offset(&self, handle: UniformHandle) -> usize {
        self.uniforms[handle.0].offset
    }

    /// Number of registered uniforms.
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Size in bytes of the uniform buffer, padded to 16 bytes.
    pub fn uniform_buffer_size(&self) -> usize {
        self.uniform_size.next_multiple_of(16)
    }

    /// The statements appended so far.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Append one line of code at the current nesting depth.
    pub fn push_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.code.push_str("    ");
        }
        self.code.push_str(line);
        self.code.push('\n');
    }

    /// Open a `{` block; locals declared until [`close_scope`](Self::close_scope) stay
    /// private to it.
    pub fn open_scope(&mut self) {
        self.push_line("{");
        self.indent += 1;
    }

    /// Close the innermost block.
    pub fn close_scope(&mut self) {
        debug_assert!(self.indent > 0, "unbalanced scope");
        self.indent = self.indent.saturating_sub(1);
        self.push_line("}");
    }

    /// WGSL declaring the uniform struct and its binding, or nothing without uniforms.
    pub fn uniform_declarations(&self, group: u32, binding: u32) -> String {
        if self.uniforms.is_empty() {
            return String::new();
        }
        let mut declarations = format!("struct {UNIFORMS_STRUCT} {{\n");
        for uniform in &self.uniforms {
            declarations.push_str(&format!("    {}: {},\n", uniform.name, uniform.ty.wgsl()));
        }
        declarations.push_str(&format!(
            "}}\n\n@group({group}) @binding({binding})\nvar<uniform> {UNIFORMS_VAR}: {UNIFORMS_STRUCT};\n"
        ));
        declarations
    }

    /// `(handle, type, offset)` of each uniform, in registration order.
    pub(crate) fn uniform_layout(
        &self,
    ) -> impl Iterator<Item = (UniformHandle, UniformType, usize)> + '_ {
        self.uniforms
            .iter()
            .enumerate()
            .map(|(index, uniform)| (UniformHandle(index), uniform.ty, uniform.offset))
    }
}
