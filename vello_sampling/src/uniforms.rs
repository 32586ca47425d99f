// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uploading uniform values.

use crate::builder::{ShaderBuilder, UniformHandle, UniformType};

/// Receives uniform values for a built program.
pub trait ProgramDataManager {
    /// Set a `vec3<f32>` uniform.
    fn set_vec3(&mut self, handle: UniformHandle, value: [f32; 3]);

    /// Set a `vec4<f32>` uniform.
    fn set_vec4(&mut self, handle: UniformHandle, value: [f32; 4]);
}

/// CPU staging for a program's uniform buffer, laid out as the program declares it.
#[derive(Clone, Debug)]
pub struct UniformBlock {
    /// `(type, offset)` by handle index.
    layout: Vec<(UniformType, usize)>,
    data: Vec<u8>,
    writes: usize,
}

impl UniformBlock {
    /// A zeroed block for the uniforms registered with `builder`.
    pub fn new(builder: &ShaderBuilder) -> Self {
        Self {
            layout: builder
                .uniform_layout()
                .map(|(_, ty, offset)| (ty, offset))
                .collect(),
            data: vec![0; builder.uniform_buffer_size()],
            writes: 0,
        }
    }

    /// The buffer contents, ready to copy to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of uniform writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn write(&mut self, handle: UniformHandle, ty: UniformType, value: &[f32]) {
        let (expected, offset) = self.layout[handle.index()];
        debug_assert_eq!(expected, ty, "uniform {} written with the wrong type", handle.index());
        let bytes: &[u8] = bytemuck::cast_slice(value);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.writes += 1;
    }
}

impl ProgramDataManager for UniformBlock {
    fn set_vec3(&mut self, handle: UniformHandle, value: [f32; 3]) {
        self.write(handle, UniformType::Vec3, &value);
    }

    fn set_vec4(&mut self, handle: UniformHandle, value: [f32; 4]) {
        self.write(handle, UniformType::Vec4, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_land_at_their_offsets() {
        let mut builder = ShaderBuilder::new();
        let decal = builder.add_uniform(UniformType::Vec3, "DecalParams");
        let domain = builder.add_uniform(UniformType::Vec4, "TexDom");
        let mut block = UniformBlock::new(&builder);
        assert_eq!(block.as_bytes().len(), 32);

        block.set_vec4(domain, [1.0, 2.0, 3.0, 4.0]);
        block.set_vec3(decal, [5.0, 6.0, 7.0]);
        let floats: Vec<f32> = block
            .as_bytes()
            .chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes(bytes.try_into().unwrap()))
            .collect();
        assert_eq!(floats, [5.0, 6.0, 7.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(block.write_count(), 2);
    }
}
