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

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wthr_core::asset::{Asset, Drawable, TextureKind, Vertex};
use wthr_core::renderer::{
    BufferId, ContextId, GpuDevice, ResourceError, TextureId, VertexArrayId,
};

/// A texture resident in the share group's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexture {
    /// The GPU object.
    pub id: TextureId,
    /// How shaders sample it.
    pub kind: TextureKind,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A mesh whose vertex and index data live on the GPU.
///
/// The buffers are shared objects and usable from every context in the share
/// group. Vertex arrays are container objects that cannot be shared, so one is
/// created lazily for each context that draws the mesh.
pub struct GpuMesh {
    name: String,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    index_count: u32,
    textures: Vec<usize>,
    vertex_arrays: Mutex<HashMap<ContextId, VertexArrayId>>,
}

impl GpuMesh {
    pub(crate) fn new(
        name: String,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        index_count: u32,
        textures: Vec<usize>,
    ) -> Self {
        Self {
            name,
            vertex_buffer,
            index_buffer,
            index_count,
            textures,
            vertex_arrays: Mutex::new(HashMap::new()),
        }
    }

    /// Mesh name from the source file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of indices drawn.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The shared vertex buffer.
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    /// The shared index buffer.
    pub fn index_buffer(&self) -> BufferId {
        self.index_buffer
    }

    /// Indices into [`GpuModel::textures`].
    pub fn texture_indices(&self) -> &[usize] {
        &self.textures
    }

    /// The vertex array this mesh uses in `context`, if one was created yet.
    pub fn vertex_array(&self, context: ContextId) -> Option<VertexArrayId> {
        self.vertex_arrays.lock().get(&context).copied()
    }

    /// Number of contexts that have drawn this mesh.
    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.lock().len()
    }

    fn vertex_array_for(
        &self,
        device: &dyn GpuDevice,
        context: ContextId,
    ) -> Result<VertexArrayId, ResourceError> {
        let mut arrays = self.vertex_arrays.lock();
        if let Some(&vao) = arrays.get(&context) {
            return Ok(vao);
        }
        let vao = device.create_vertex_array(
            &Vertex::LAYOUT,
            Some(self.vertex_buffer),
            Some(self.index_buffer),
        )?;
        log::debug!("Created vertex array {:?} for mesh '{}' in {context}", vao, self.name);
        arrays.insert(context, vao);
        Ok(vao)
    }

    fn release(&self, device: &dyn GpuDevice, context: ContextId) {
        let mut arrays = self.vertex_arrays.lock();
        if let Some(vao) = arrays.remove(&context) {
            if let Err(e) = device.delete_vertex_array(vao) {
                log::debug!("Could not delete vertex array {vao:?}: {e}");
            }
        }
        if !arrays.is_empty() {
            log::debug!(
                "Mesh '{}': {} vertex array(s) belong to other contexts and are left to them",
                self.name,
                arrays.len()
            );
        }
        for buffer in [self.vertex_buffer, self.index_buffer] {
            if let Err(e) = device.delete_buffer(buffer) {
                log::debug!("Could not delete buffer {buffer:?}: {e}");
            }
        }
    }
}

impl fmt::Debug for GpuMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuMesh")
            .field("name", &self.name)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("index_count", &self.index_count)
            .field("vertex_arrays", &self.vertex_array_count())
            .finish()
    }
}

/// A model whose meshes and textures are resident on the GPU.
///
/// Dropping the model deletes its objects through whichever context is
/// current on the dropping thread. With no context current the objects leak
/// and a warning is logged.
pub struct GpuModel {
    source: PathBuf,
    pub(crate) meshes: Vec<GpuMesh>,
    pub(crate) textures: Vec<GpuTexture>,
    device: Arc<dyn GpuDevice>,
}

impl Asset for GpuModel {}

impl GpuModel {
    pub(crate) fn new(source: PathBuf, device: Arc<dyn GpuDevice>) -> Self {
        Self {
            source,
            meshes: Vec::new(),
            textures: Vec::new(),
            device,
        }
    }

    /// The file the model was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// All meshes, in file order.
    pub fn meshes(&self) -> &[GpuMesh] {
        &self.meshes
    }

    /// Unique textures referenced by the meshes.
    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    /// Total index count across meshes.
    pub fn index_count(&self) -> u64 {
        self.meshes.iter().map(|m| m.index_count as u64).sum()
    }
}

impl Drawable for GpuModel {
    fn draw(&self, device: &dyn GpuDevice) -> Result<(), ResourceError> {
        let context = device
            .current_context()
            .ok_or(ResourceError::NoCurrentContext)?;

        for mesh in &self.meshes {
            for (unit, &texture) in mesh.textures.iter().enumerate() {
                let texture = self
                    .textures
                    .get(texture)
                    .ok_or(ResourceError::InvalidHandle)?;
                device.bind_texture(unit as u32, texture.id)?;
            }
            let vao = mesh.vertex_array_for(device, context)?;
            device.draw_indexed(vao, mesh.index_count)?;
        }
        Ok(())
    }
}

impl Drop for GpuModel {
    fn drop(&mut self) {
        let Some(context) = self.device.current_context() else {
            if !self.meshes.is_empty() || !self.textures.is_empty() {
                log::warn!(
                    "GPU model '{}' dropped with no current context; {} mesh(es) and {} texture(s) leaked",
                    self.source.display(),
                    self.meshes.len(),
                    self.textures.len()
                );
            }
            return;
        };

        for mesh in &self.meshes {
            mesh.release(self.device.as_ref(), context);
        }
        for texture in &self.textures {
            if let Err(e) = self.device.delete_texture(texture.id) {
                log::debug!("Could not delete texture {:?}: {e}", texture.id);
            }
        }
        log::trace!("Released GPU model '{}' from {context}", self.source.display());
    }
}

impl fmt::Debug for GpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuModel")
            .field("source", &self.source)
            .field("meshes", &self.meshes)
            .field("textures", &self.textures)
            .finish()
    }
}
