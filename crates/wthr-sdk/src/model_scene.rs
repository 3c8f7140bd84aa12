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

//! The `ModelScene` facade: entities whose GPU data arrives asynchronously.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wthr_control::{Job, RenderContextWorker, WorkerConfig, WorkerError};
use wthr_core::asset::{AssetStatus, SharedAsset};
use wthr_core::renderer::{GpuDevice, GraphicsContext};
use wthr_core::scene::PrimitiveShape;
use wthr_lanes::upload_lane::{GpuModel, ModelUploadLane};

/// Identifies an entity within one [`ModelScene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Identifies a group of entities, such as a cube grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

/// Placement of an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Translation.
    pub position: [f32; 3],
    /// Euler angles in degrees.
    pub rotation: [f32; 3],
    /// Per-axis scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    /// An unrotated, unscaled transform at `position`.
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// What an entity draws.
#[derive(Debug, Clone)]
pub enum Renderable {
    /// A model file loaded through the worker's loader registry.
    Model {
        /// The file the model is loaded from.
        path: PathBuf,
        /// The slot the loader publishes into.
        asset: SharedAsset<GpuModel>,
    },
    /// A generated primitive uploaded on the worker.
    Shape {
        /// The shape parameters.
        shape: PrimitiveShape,
        /// The slot the upload job publishes into.
        asset: SharedAsset<GpuModel>,
    },
}

impl Renderable {
    /// The asset slot backing this renderable.
    pub fn asset(&self) -> &SharedAsset<GpuModel> {
        match self {
            Renderable::Model { asset, .. } | Renderable::Shape { asset, .. } => asset,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Entity {
    pub(crate) transform: Transform,
    pub(crate) renderable: Renderable,
    pub(crate) group: Option<GroupId>,
}

/// Counts of what one [`ModelScene::render`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entities whose model was drawn.
    pub drawn: usize,
    /// Entities still waiting for their model.
    pub pending: usize,
    /// Entities whose load failed or whose draw was rejected.
    pub failed: usize,
}

/// A collection of drawable entities backed by a background GPU worker.
///
/// The scene must be used from the thread on which `primary` is current:
/// dropping a ready model releases its GPU objects through that context.
///
/// # Examples
///
/// ```rust,ignore
/// let mut scene = ModelScene::new(&primary, WorkerConfig::default())?;
/// let rock = scene.spawn_model("assets/rock.obj", Transform::default());
/// let grid = scene.spawn_cube_grid(4, 4, 1, [0.0; 3]);
/// loop {
///     let stats = scene.render();
///     // present...
/// }
/// ```
pub struct ModelScene {
    // Declared before the worker so ready models are released first.
    entities: BTreeMap<EntityId, Entity>,
    groups: BTreeMap<GroupId, BTreeSet<EntityId>>,
    next_entity_id: u64,
    next_group_id: u32,
    upload: ModelUploadLane,
    device: Arc<dyn GpuDevice>,
    worker: RenderContextWorker,
}

impl ModelScene {
    /// Creates an empty scene and starts its worker against `primary`.
    pub fn new(primary: &dyn GraphicsContext, config: WorkerConfig) -> Result<Self, WorkerError> {
        let worker = RenderContextWorker::new(primary, config)?;
        Ok(Self::with_worker(primary.device(), worker))
    }

    /// Creates an empty scene around an already running worker.
    ///
    /// `device` is used for drawing on the render thread.
    pub fn with_worker(device: Arc<dyn GpuDevice>, worker: RenderContextWorker) -> Self {
        Self {
            entities: BTreeMap::new(),
            groups: BTreeMap::new(),
            next_entity_id: 0,
            next_group_id: 0,
            upload: ModelUploadLane::default(),
            device,
            worker,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entity Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Spawns an entity whose model is loaded from `path` in the background.
    ///
    /// The entity exists immediately; it is drawn once the load completes.
    pub fn spawn_model(&mut self, path: impl AsRef<Path>, transform: Transform) -> EntityId {
        let path = path.as_ref().to_path_buf();
        let asset = SharedAsset::new();
        self.worker.async_load_model(&asset, &path);
        self.insert(transform, Renderable::Model { path, asset })
    }

    /// Spawns an entity drawing `shape`. The mesh is uploaded on the worker.
    pub fn spawn_shape(&mut self, shape: PrimitiveShape, transform: Transform) -> EntityId {
        let asset = SharedAsset::new();
        self.queue_shape_upload(shape, &asset);
        self.insert(transform, Renderable::Shape { shape, asset })
    }

    /// Spawns a `width` x `length` x `height` grid of unit cubes starting at `origin`.
    ///
    /// Cubes are spaced 1.1 units apart. Returns the group holding all of them.
    pub fn spawn_cube_grid(
        &mut self,
        width: u32,
        length: u32,
        height: u32,
        origin: [f32; 3],
    ) -> GroupId {
        let group = self.create_group();
        for i in 0..width {
            for j in 0..length {
                for k in 0..height {
                    let position = [
                        origin[0] + i as f32 * 1.1,
                        origin[1] + j as f32 * 1.1,
                        origin[2] + k as f32 * 1.1,
                    ];
                    let entity =
                        self.spawn_shape(PrimitiveShape::default(), Transform::from_position(position));
                    self.add_to_group(entity, group);
                }
            }
        }
        log::debug!(
            "Spawned {} cube(s) in group {}",
            self.group_members(group).len(),
            group.0
        );
        group
    }

    /// Removes an entity. Returns `false` if it did not exist.
    ///
    /// A load still in flight for the entity completes into a slot nobody
    /// draws and is released with it.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(removed) = self.entities.remove(&entity) else {
            return false;
        };
        if let Some(group) = removed.group {
            if let Some(members) = self.groups.get_mut(&group) {
                members.remove(&entity);
            }
        }
        true
    }

    /// Removes every entity and group.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.groups.clear();
    }

    /// Number of entities in the scene.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the scene has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────────────────

    /// Allocates a new, empty group.
    pub fn create_group(&mut self) -> GroupId {
        let id = self.next_group_id();
        if let Some(next) = self.next_group_id.checked_add(1) {
            self.next_group_id = next;
        }
        self.groups.insert(id, BTreeSet::new());
        id
    }

    /// The id the next [`create_group`](Self::create_group) call returns.
    ///
    /// Once the counter is exhausted, the lowest id no group uses is handed out.
    pub fn next_group_id(&self) -> GroupId {
        if self.next_group_id < u32::MAX {
            return GroupId(self.next_group_id);
        }
        let mut candidate = 0u32;
        for id in self.groups.keys() {
            if id.0 != candidate {
                break;
            }
            candidate = candidate.saturating_add(1);
        }
        GroupId(candidate)
    }

    /// Moves `entity` into `group`, leaving any previous group.
    ///
    /// Returns `false` if either does not exist.
    pub fn add_to_group(&mut self, entity: EntityId, group: GroupId) -> bool {
        if !self.groups.contains_key(&group) {
            return false;
        }
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        if let Some(previous) = record.group.replace(group) {
            if let Some(members) = self.groups.get_mut(&previous) {
                members.remove(&entity);
            }
        }
        self.groups.entry(group).or_default().insert(entity);
        true
    }

    /// The entities in `group`, in spawn order. Empty for unknown groups.
    pub fn group_members(&self, group: GroupId) -> Vec<EntityId> {
        self.groups
            .get(&group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The group `entity` belongs to, if any.
    pub fn group_of(&self, entity: EntityId) -> Option<GroupId> {
        self.entities.get(&entity).and_then(|e| e.group)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Component Access
    // ─────────────────────────────────────────────────────────────────────

    /// The transform of `entity`.
    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.entities.get(&entity).map(|e| e.transform)
    }

    /// Replaces the transform of `entity`. Returns `false` if it does not exist.
    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) -> bool {
        match self.entities.get_mut(&entity) {
            Some(record) => {
                record.transform = transform;
                true
            }
            None => false,
        }
    }

    /// What `entity` draws.
    pub fn renderable(&self, entity: EntityId) -> Option<&Renderable> {
        self.entities.get(&entity).map(|e| &e.renderable)
    }

    /// Load status of the model behind `entity`.
    pub fn model_status(&self, entity: EntityId) -> Option<AssetStatus> {
        self.renderable(entity).map(|r| r.asset().status())
    }

    /// Starts loading `path` into an existing model entity, replacing its model.
    ///
    /// Returns `false` if the entity does not exist or draws a shape.
    pub fn reload_model(&mut self, entity: EntityId, path: impl AsRef<Path>) -> bool {
        let Some(Entity {
            renderable: Renderable::Model { path: current, asset },
            ..
        }) = self.entities.get_mut(&entity)
        else {
            return false;
        };
        *current = path.as_ref().to_path_buf();
        self.worker.async_load_model(asset, current.as_path());
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Frame
    // ─────────────────────────────────────────────────────────────────────

    /// Draws every ready entity with the primary context.
    ///
    /// Must be called on the thread where the primary context is current.
    /// Entities still loading are skipped, never waited for.
    pub fn render(&self) -> FrameStats {
        let mut stats = FrameStats::default();
        for entity in self.entities.values() {
            let asset = entity.renderable.asset();
            match asset.status() {
                AssetStatus::Empty | AssetStatus::Loading => stats.pending += 1,
                AssetStatus::Failed => stats.failed += 1,
                AssetStatus::Ready => {
                    if asset.draw(self.device.as_ref()) {
                        stats.drawn += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
            }
        }
        stats
    }

    /// The background worker.
    pub fn worker(&self) -> &RenderContextWorker {
        &self.worker
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn insert(&mut self, transform: Transform, renderable: Renderable) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(
            id,
            Entity {
                transform,
                renderable,
                group: None,
            },
        );
        id
    }

    pub(crate) fn entity_records(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Makes sure `group` exists and later `create_group` calls do not reuse it.
    ///
    /// Returns `false`, leaving the scene unchanged, for an id the counter
    /// cannot move past.
    pub(crate) fn ensure_group(&mut self, group: GroupId) -> bool {
        let Some(next) = group.0.checked_add(1) else {
            return false;
        };
        self.groups.entry(group).or_default();
        self.next_group_id = self.next_group_id.max(next);
        true
    }

    fn queue_shape_upload(&self, shape: PrimitiveShape, asset: &SharedAsset<GpuModel>) {
        let ticket = asset.begin_load();
        let slot = asset.clone();
        let device = self.worker.device();
        let upload = self.upload;

        let job = Job::named(format!("upload {} shape", shape.name()), move || {
            match upload.upload(&device, &shape.model_data()) {
                Ok(model) => {
                    if slot.publish(ticket, model).is_err() {
                        log::debug!("Discarding {} shape upload: slot was reused", shape.name());
                    }
                }
                Err(e) => {
                    log::error!("Failed to upload {} shape: {e}", shape.name());
                    slot.fail(ticket);
                }
            }
        });

        if let Err(e) = self.worker.add_job(job) {
            log::error!("Could not queue {} shape upload: {e}", shape.name());
            asset.fail(ticket);
        }
    }
}

impl fmt::Debug for ModelScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelScene")
            .field("entities", &self.entities.len())
            .field("groups", &self.groups.len())
            .field("next_group_id", &self.next_group_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transform_has_unit_scale() {
        let t = Transform::from_position([1.0, 2.0, 3.0]);
        assert_eq!(t.position, [1.0, 2.0, 3.0]);
        assert_eq!(t.scale, [1.0; 3]);
        assert_eq!(t.rotation, [0.0; 3]);
    }

    #[test]
    fn transform_fields_default_when_missing() {
        let t: Transform = serde_json::from_str(r#"{"position":[1,0,0]}"#).unwrap();
        assert_eq!(t.scale, [1.0; 3]);
        assert_eq!(t.position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn group_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&GroupId(4)).unwrap(), "4");
        assert_eq!(EntityId(9).to_string(), "entity#9");
    }
}
