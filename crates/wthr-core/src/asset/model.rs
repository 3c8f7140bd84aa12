// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CPU-side model data, produced by parsers and consumed by the GPU upload.
//!
//! Nothing in this module touches a graphics API, so it can be built on any thread.

use super::Asset;
use crate::renderer::{AttributeKind, VertexAttribute};
use bytemuck::{Pod, Zeroable};
use std::path::PathBuf;
use std::sync::Arc;

/// A single interleaved vertex as laid out in GPU memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Vertex normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub tex_coords: [f32; 2],
    /// Tangent (for normal mapping).
    pub tangent: [f32; 3],
    /// Bitangent (for normal mapping).
    pub bitangent: [f32; 3],
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Attribute layout matching the field order above.
    pub const LAYOUT: [VertexAttribute; 5] = [
        VertexAttribute::new(0, 3, AttributeKind::Float, 0, Self::STRIDE),
        VertexAttribute::new(1, 3, AttributeKind::Float, 12, Self::STRIDE),
        VertexAttribute::new(2, 2, AttributeKind::Float, 24, Self::STRIDE),
        VertexAttribute::new(3, 3, AttributeKind::Float, 32, Self::STRIDE),
        VertexAttribute::new(4, 3, AttributeKind::Float, 44, Self::STRIDE),
    ];

    /// Creates a vertex with zeroed tangent space.
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            ..Default::default()
        }
    }
}

/// The role a texture plays in a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Base color.
    Diffuse,
    /// Specular intensity.
    Specular,
    /// Tangent-space normals.
    Normal,
    /// Height / bump map.
    Height,
}

impl TextureKind {
    /// The sampler uniform prefix shaders use for this kind (`texture_diffuse1`, ...).
    pub fn uniform_prefix(&self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 rows, bottom row first.
    pub pixels: Vec<u8>,
}

/// A decoded texture referenced by one or more meshes.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// The file the pixels came from; used to de-duplicate loads.
    pub path: PathBuf,
    /// How the texture is sampled.
    pub kind: TextureKind,
    /// Decoded pixels, shared when several materials use the same file.
    pub image: Arc<ImageData>,
}

/// A triangle list plus the textures it samples.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Name from the source file, if any.
    pub name: String,
    /// Interleaved vertices.
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
    /// Indices into [`ModelData::textures`].
    pub textures: Vec<usize>,
}

impl MeshData {
    /// Creates an untextured mesh.
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            textures: Vec::new(),
        }
    }
}

/// The intermediate representation of a model after CPU parsing.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    /// The file the model was parsed from.
    pub source: PathBuf,
    /// All meshes, in file order.
    pub meshes: Vec<MeshData>,
    /// Unique textures referenced by the meshes.
    pub textures: Vec<TextureData>,
}

impl Asset for ModelData {}

impl ModelData {
    /// Wraps a single mesh, as used for procedurally generated shapes.
    pub fn from_mesh(source: impl Into<PathBuf>, mesh: MeshData) -> Self {
        Self {
            source: source.into(),
            meshes: vec![mesh],
            textures: Vec::new(),
        }
    }

    /// Total vertex count across all meshes.
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    /// Total index count across all meshes.
    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_memory() {
        assert_eq!(Vertex::STRIDE, 56);
        let last = Vertex::LAYOUT[4];
        assert_eq!(last.offset + last.components * 4, Vertex::STRIDE);
        assert_eq!(
            std::mem::offset_of!(Vertex, tangent) as u32,
            Vertex::LAYOUT[3].offset
        );
    }

    #[test]
    fn counts_span_meshes() {
        let quad = MeshData::new(
            "quad",
            vec![Vertex::default(); 4],
            vec![0, 1, 2, 2, 3, 0],
        );
        let mut model = ModelData::from_mesh("quad.obj", quad.clone());
        model.meshes.push(quad);
        assert_eq!(model.vertex_count(), 8);
        assert_eq!(model.index_count(), 12);
    }
}
