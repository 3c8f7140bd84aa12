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

use crate::asset::{MeshData, ModelData, Vertex};
use serde::{Deserialize, Serialize};

/// A procedurally generated shape.
///
/// Persisted with an explicit `type` tag, so a saved scene records which kind
/// of shape an entity carries along with that kind's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PrimitiveShape {
    /// An axis-aligned cube centered on the origin.
    Cube {
        /// Edge length.
        size: f32,
    },
    /// A square-based pyramid standing on the XZ plane.
    Pyramid {
        /// Edge length of the base.
        base: f32,
        /// Apex height above the base.
        height: f32,
    },
}

impl Default for PrimitiveShape {
    fn default() -> Self {
        PrimitiveShape::Cube { size: 1.0 }
    }
}

// The normal slot carries per-corner colors, matching the debug shader.
const CUBE_CORNERS: [([f32; 3], [f32; 3], [f32; 2]); 8] = [
    ([-0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 0.0]),
    ([0.5, -0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
    ([0.5, 0.5, -0.5], [0.0, 0.0, 1.0], [1.0, 1.0]),
    ([-0.5, 0.5, -0.5], [1.0, 1.0, 0.0], [0.0, 1.0]),
    ([-0.5, -0.5, 0.5], [1.0, 0.0, 1.0], [1.0, 0.0]),
    ([0.5, -0.5, 0.5], [0.0, 1.0, 1.0], [0.0, 0.0]),
    ([0.5, 0.5, 0.5], [1.0, 0.5, 0.0], [0.0, 1.0]),
    ([-0.5, 0.5, 0.5], [0.5, 0.0, 1.0], [1.0, 1.0]),
];

const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // back
    4, 5, 6, 6, 7, 4, // front
    4, 0, 3, 3, 7, 4, // left
    1, 5, 6, 6, 2, 1, // right
    4, 5, 1, 1, 0, 4, // bottom
    3, 2, 6, 6, 7, 3, // top
];

const PYRAMID_CORNERS: [([f32; 3], [f32; 3], [f32; 2]); 5] = [
    ([-0.5, 0.0, -0.5], [1.0, 0.0, 0.0], [0.0, 0.0]),
    ([0.5, 0.0, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
    ([0.5, 0.0, 0.5], [0.0, 0.0, 1.0], [1.0, 1.0]),
    ([-0.5, 0.0, 0.5], [1.0, 1.0, 0.0], [0.0, 1.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0]),
];

const PYRAMID_INDICES: [u32; 18] = [
    0, 1, 4, // front
    1, 2, 4, // right
    2, 3, 4, // back
    3, 0, 4, // left
    0, 1, 2, 2, 3, 0, // base
];

impl PrimitiveShape {
    /// The name used for the generated mesh and in scene listings.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveShape::Cube { .. } => "Cube",
            PrimitiveShape::Pyramid { .. } => "Pyramid",
        }
    }

    /// Builds the shape's triangle list.
    pub fn mesh_data(&self) -> MeshData {
        let (vertices, indices): (Vec<Vertex>, &[u32]) = match *self {
            PrimitiveShape::Cube { size } => (
                CUBE_CORNERS
                    .iter()
                    .map(|&(p, n, uv)| Vertex::new(p.map(|c| c * size), n, uv))
                    .collect(),
                &CUBE_INDICES,
            ),
            PrimitiveShape::Pyramid { base, height } => (
                PYRAMID_CORNERS
                    .iter()
                    .map(|&(p, n, uv)| Vertex::new([p[0] * base, p[1] * height, p[2] * base], n, uv))
                    .collect(),
                &PYRAMID_INDICES,
            ),
        };
        MeshData::new(self.name(), vertices, indices.to_vec())
    }

    /// Wraps [`mesh_data`](Self::mesh_data) in a single-mesh model.
    pub fn model_data(&self) -> ModelData {
        ModelData::from_mesh(format!("shape://{}", self.name().to_lowercase()), self.mesh_data())
    }
}
