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

use super::{GpuMesh, GpuModel, GpuTexture};
use std::sync::Arc;
use wthr_core::asset::ModelData;
use wthr_core::renderer::{
    BufferTarget, GpuDevice, ResourceError, TextureDescriptor, TextureFormat,
};

/// Uploads a parsed [`ModelData`] into GPU objects.
#[derive(Debug, Clone, Copy)]
pub struct ModelUploadLane {
    /// Build a mip chain for every uploaded texture.
    pub generate_mipmaps: bool,
}

impl Default for ModelUploadLane {
    fn default() -> Self {
        Self {
            generate_mipmaps: true,
        }
    }
}

impl ModelUploadLane {
    /// Creates buffers and textures for `model` in the current context's share group.
    ///
    /// On error every object created so far is deleted again before returning.
    pub fn upload(
        &self,
        device: &Arc<dyn GpuDevice>,
        model: &ModelData,
    ) -> Result<GpuModel, ResourceError> {
        let context = device
            .current_context()
            .ok_or(ResourceError::NoCurrentContext)?;
        if model.meshes.is_empty() {
            return Err(ResourceError::InvalidData(format!(
                "model '{}' has no meshes",
                model.source.display()
            )));
        }

        // Dropping a partially built model releases what it already owns.
        let mut gpu = GpuModel::new(model.source.clone(), Arc::clone(device));

        for texture in &model.textures {
            let descriptor = TextureDescriptor {
                label: Some(texture.path.display().to_string()),
                width: texture.image.width,
                height: texture.image.height,
                format: TextureFormat::Rgba8,
                generate_mipmaps: self.generate_mipmaps,
            };
            let id = device.create_texture(&descriptor, &texture.image.pixels)?;
            gpu.textures.push(GpuTexture {
                id,
                kind: texture.kind,
                width: descriptor.width,
                height: descriptor.height,
            });
        }

        for mesh in &model.meshes {
            if mesh.vertices.is_empty() || mesh.indices.is_empty() {
                return Err(ResourceError::InvalidData(format!(
                    "mesh '{}' has no geometry",
                    mesh.name
                )));
            }
            if let Some(&bad) = mesh.textures.iter().find(|&&t| t >= gpu.textures.len()) {
                return Err(ResourceError::InvalidData(format!(
                    "mesh '{}' references missing texture {bad}",
                    mesh.name
                )));
            }

            let vertex_buffer =
                device.create_buffer(BufferTarget::Array, bytemuck::cast_slice(&mesh.vertices))?;
            let index_buffer = match device
                .create_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(&mesh.indices))
            {
                Ok(id) => id,
                Err(e) => {
                    if let Err(cleanup) = device.delete_buffer(vertex_buffer) {
                        log::debug!("Could not delete buffer {vertex_buffer:?}: {cleanup}");
                    }
                    return Err(e);
                }
            };

            gpu.meshes.push(GpuMesh::new(
                mesh.name.clone(),
                vertex_buffer,
                index_buffer,
                mesh.indices.len() as u32,
                mesh.textures.clone(),
            ));
        }

        log::debug!(
            "Uploaded '{}' in {context}: {} mesh(es), {} texture(s), {} indices",
            model.source.display(),
            gpu.meshes.len(),
            gpu.textures.len(),
            gpu.index_count()
        );
        Ok(gpu)
    }
}
