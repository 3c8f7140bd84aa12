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

use super::context::ContextId;
use super::error::ResourceError;
use std::fmt::Debug;

/// `GL_INVALID_VALUE`.
pub const ERROR_INVALID_VALUE: u32 = 0x0501;
/// `GL_INVALID_OPERATION`.
pub const ERROR_INVALID_OPERATION: u32 = 0x0502;
/// `GL_OUT_OF_MEMORY`.
pub const ERROR_OUT_OF_MEMORY: u32 = 0x0505;

/// A buffer object. Lives in the share group's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// A texture object. Lives in the share group's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// A vertex array object.
///
/// Container objects are NOT shared between contexts: a vertex array is only
/// valid in the context that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Binding point for buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data.
    ElementArray,
}

/// Scalar type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// 32-bit float components.
    Float,
    /// 32-bit signed integer components.
    Int,
}

/// One attribute pointer within an interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Number of components (1..=4).
    pub components: u32,
    /// Component type.
    pub kind: AttributeKind,
    /// Byte offset within a vertex.
    pub offset: u32,
    /// Byte distance between consecutive vertices.
    pub stride: u32,
}

impl VertexAttribute {
    /// Creates an attribute description.
    pub const fn new(
        location: u32,
        components: u32,
        kind: AttributeKind,
        offset: u32,
        stride: u32,
    ) -> Self {
        Self {
            location,
            components,
            kind,
            offset,
            stride,
        }
    }
}

/// Pixel format of a texture upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Single channel.
    R8,
    /// Three channels.
    Rgb8,
    /// Four channels.
    #[default]
    Rgba8,
}

impl TextureFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }
}

/// Parameters for a 2D texture upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format of the supplied data.
    pub format: TextureFormat,
    /// Whether to build a full mip chain after upload.
    pub generate_mipmaps: bool,
}

impl TextureDescriptor {
    /// Expected byte length of the pixel data.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// The GPU command interface.
///
/// Like an OpenGL function table, a device is not tied to one context: every
/// call targets the context that is current on the calling thread and fails
/// with [`ResourceError::NoCurrentContext`] when there is none.
pub trait GpuDevice: Send + Sync + Debug {
    /// Returns the context current on the calling thread, if any.
    fn current_context(&self) -> Option<ContextId>;

    /// Creates a buffer and fills it with `data`.
    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> Result<BufferId, ResourceError>;

    /// Deletes a buffer.
    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a 2D texture from `pixels`.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: &[u8],
    ) -> Result<TextureId, ResourceError>;

    /// Deletes a texture.
    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a vertex array in the current context, capturing the given
    /// attribute layout and buffer bindings.
    fn create_vertex_array(
        &self,
        layout: &[VertexAttribute],
        vertex_buffer: Option<BufferId>,
        index_buffer: Option<BufferId>,
    ) -> Result<VertexArrayId, ResourceError>;

    /// Deletes a vertex array owned by the current context.
    fn delete_vertex_array(&self, id: VertexArrayId) -> Result<(), ResourceError>;

    /// Binds `texture` to texture unit `unit`.
    fn bind_texture(&self, unit: u32, texture: TextureId) -> Result<(), ResourceError>;

    /// Issues an indexed triangle-list draw.
    fn draw_indexed(&self, vertex_array: VertexArrayId, index_count: u32)
        -> Result<(), ResourceError>;

    /// Returns and clears the oldest pending error code of the current context.
    fn take_error(&self) -> Option<u32>;
}
