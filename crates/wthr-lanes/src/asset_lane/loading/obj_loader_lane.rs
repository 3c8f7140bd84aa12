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

//! Defines a lane for loading Wavefront OBJ models and their MTL materials.

use super::TextureLoaderLane;
use crate::asset_lane::ModelLoaderLane;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wthr_core::asset::{MeshData, ModelData, TextureData, TextureKind, Vertex};

/// Lane for loading OBJ models.
///
/// Every object in the file becomes one [`MeshData`]. Material libraries are
/// resolved next to the model; a missing or broken library is logged and the
/// meshes are kept untextured.
#[derive(Debug, Clone, Default)]
pub struct ObjLoaderLane {
    textures: TextureLoaderLane,
}

impl ObjLoaderLane {
    /// Creates a lane that decodes material textures with `textures`.
    pub fn with_texture_lane(textures: TextureLoaderLane) -> Self {
        Self { textures }
    }
}

impl ModelLoaderLane for ObjLoaderLane {
    fn extensions(&self) -> &[&'static str] {
        &["obj"]
    }

    fn load_model(&self, path: &Path) -> Result<ModelData> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open OBJ file '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();

        let (models, materials) = tobj::load_obj_buf(
            &mut BufReader::new(file),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |mtl_path| tobj::load_mtl(base_dir.join(mtl_path)),
        )
        .with_context(|| format!("Failed to parse OBJ file '{}'", path.display()))?;

        if models.is_empty() {
            bail!("No meshes found in OBJ file '{}'", path.display());
        }

        let materials = materials.unwrap_or_else(|e| {
            log::warn!(
                "Material library for '{}' could not be loaded ({e}); meshes stay untextured",
                path.display()
            );
            Vec::new()
        });

        let mut textures = MaterialTextures::new(&self.textures, &base_dir);
        let mut meshes = Vec::with_capacity(models.len());
        for model in models {
            let mut mesh = convert_mesh(model.name, &model.mesh)
                .with_context(|| format!("Invalid mesh data in '{}'", path.display()))?;
            if let Some(material) = model.mesh.material_id.and_then(|id| materials.get(id)) {
                mesh.textures = textures.resolve(material);
            }
            meshes.push(mesh);
        }

        Ok(ModelData {
            source: path.to_path_buf(),
            meshes,
            textures: textures.into_loaded(),
        })
    }
}

fn convert_mesh(name: String, mesh: &tobj::Mesh) -> Result<MeshData> {
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == vertex_count * 3;
    let has_uvs = mesh.texcoords.len() == vertex_count * 2;

    let mut vertices: Vec<Vertex> = (0..vertex_count)
        .map(|i| {
            let p = &mesh.positions[i * 3..i * 3 + 3];
            let normal = if has_normals {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0; 3]
            };
            let uv = if has_uvs {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            };
            Vertex::new([p[0], p[1], p[2]], normal, uv)
        })
        .collect();

    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        bail!("index {bad} out of range for {vertex_count} vertices");
    }

    if has_uvs {
        compute_tangents(&mut vertices, &mesh.indices);
    }

    Ok(MeshData::new(name, vertices, mesh.indices.clone()))
}

/// Accumulates per-triangle tangent frames from UV gradients and normalizes them.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (v0, v1, v2) = (vertices[a], vertices[b], vertices[c]);

        let e1 = sub(v1.position, v0.position);
        let e2 = sub(v2.position, v0.position);
        let du1 = v1.tex_coords[0] - v0.tex_coords[0];
        let dv1 = v1.tex_coords[1] - v0.tex_coords[1];
        let du2 = v2.tex_coords[0] - v0.tex_coords[0];
        let dv2 = v2.tex_coords[1] - v0.tex_coords[1];

        let det = du1 * dv2 - du2 * dv1;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = scale(sub(scale(e1, dv2), scale(e2, dv1)), r);
        let bitangent = scale(sub(scale(e2, du1), scale(e1, du2)), r);

        for &i in &[a, b, c] {
            vertices[i].tangent = add(vertices[i].tangent, tangent);
            vertices[i].bitangent = add(vertices[i].bitangent, bitangent);
        }
    }

    for v in vertices.iter_mut() {
        v.tangent = normalize(v.tangent);
        v.bitangent = normalize(v.bitangent);
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn normalize(a: [f32; 3]) -> [f32; 3] {
    let len = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    if len > f32::EPSILON {
        scale(a, 1.0 / len)
    } else {
        a
    }
}

/// Decodes material textures once per file, no matter how many meshes use them.
struct MaterialTextures<'a> {
    lane: &'a TextureLoaderLane,
    base_dir: &'a Path,
    loaded: Vec<TextureData>,
    by_path: HashMap<PathBuf, usize>,
}

impl<'a> MaterialTextures<'a> {
    fn new(lane: &'a TextureLoaderLane, base_dir: &'a Path) -> Self {
        Self {
            lane,
            base_dir,
            loaded: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    fn resolve(&mut self, material: &tobj::Material) -> Vec<usize> {
        let slots = [
            (&material.diffuse_texture, TextureKind::Diffuse),
            (&material.specular_texture, TextureKind::Specular),
            (&material.normal_texture, TextureKind::Normal),
            (&material.ambient_texture, TextureKind::Height),
        ];

        slots
            .into_iter()
            .filter_map(|(name, kind)| {
                let name = name.as_deref()?.trim();
                if name.is_empty() {
                    return None;
                }
                let path = self.base_dir.join(name);
                self.load(&path, kind)
            })
            .collect()
    }

    fn load(&mut self, path: &Path, kind: TextureKind) -> Option<usize> {
        if let Some(&index) = self.by_path.get(path) {
            return Some(index);
        }

        match self.lane.load(path) {
            Ok(image) => {
                let index = self.loaded.len();
                self.loaded.push(TextureData {
                    path: path.to_path_buf(),
                    kind,
                    image: Arc::new(image),
                });
                self.by_path.insert(path.to_path_buf(), index);
                Some(index)
            }
            Err(e) => {
                log::warn!("Texture failed to load: {e:#}");
                None
            }
        }
    }

    fn into_loaded(self) -> Vec<TextureData> {
        self.loaded
    }
}
