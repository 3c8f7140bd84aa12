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

//! Saving and restoring a [`ModelScene`] as JSON.
//!
//! Only the description of each entity is persisted: the file it was loaded
//! from or the shape parameters, its transform and its group. Restoring a
//! scene re-issues the loads, so GPU data is rebuilt in the background.

use crate::model_scene::{ModelScene, Renderable, Transform};
use crate::GroupId;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wthr_core::scene::PrimitiveShape;

/// Where an entity's model comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySource {
    /// A model file.
    Model {
        /// Path of the model file.
        path: PathBuf,
    },
    /// A generated primitive.
    Shape {
        /// Shape parameters.
        shape: PrimitiveShape,
    },
}

/// One persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// What the entity draws.
    pub source: EntitySource,
    /// Where it is placed.
    #[serde(default)]
    pub transform: Transform,
    /// Group membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

/// A serializable snapshot of a scene's entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Entities in spawn order.
    #[serde(default)]
    pub entities: Vec<EntityDescription>,
}

impl SceneDescription {
    /// Parses a description from JSON text and [validates](Self::validate) it.
    pub fn from_json(text: &str) -> Result<Self> {
        let description: Self =
            serde_json::from_str(text).context("Failed to parse scene description")?;
        description.validate()?;
        Ok(description)
    }

    /// Checks that every entry can be applied to a scene.
    ///
    /// Group ids must leave room for the scene's group counter to move past them.
    pub fn validate(&self) -> Result<()> {
        for (index, entry) in self.entities.iter().enumerate() {
            if let Some(group) = entry.group {
                if group.0 == u32::MAX {
                    bail!("Entity {index} uses out-of-range group id {}", group.0);
                }
            }
        }
        Ok(())
    }

    /// Serializes the description as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scene description")
    }
}

impl ModelScene {
    /// Captures the scene's entities.
    pub fn describe(&self) -> SceneDescription {
        let entities = self
            .entity_records()
            .map(|entity| EntityDescription {
                source: match &entity.renderable {
                    Renderable::Model { path, .. } => EntitySource::Model { path: path.clone() },
                    Renderable::Shape { shape, .. } => EntitySource::Shape { shape: *shape },
                },
                transform: entity.transform,
                group: entity.group,
            })
            .collect();
        SceneDescription { entities }
    }

    /// Replaces the scene's contents with `description`, re-issuing every load.
    ///
    /// Returns the number of entities spawned. An invalid description is
    /// rejected before the scene is cleared.
    pub fn apply(&mut self, description: &SceneDescription) -> Result<usize> {
        description.validate()?;
        self.clear();
        for entry in &description.entities {
            let entity = match &entry.source {
                EntitySource::Model { path } => self.spawn_model(path, entry.transform),
                EntitySource::Shape { shape } => self.spawn_shape(*shape, entry.transform),
            };
            if let Some(group) = entry.group {
                if self.ensure_group(group) {
                    self.add_to_group(entity, group);
                }
            }
        }
        Ok(description.entities.len())
    }

    /// Writes the scene description to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.describe().to_json()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write scene file '{}'", path.display()))?;
        log::info!("Saved {} entities to '{}'", self.len(), path.display());
        Ok(())
    }

    /// Replaces the scene with the one stored at `path`.
    ///
    /// On error the current scene is left untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file '{}'", path.display()))?;
        let description = SceneDescription::from_json(&text)
            .with_context(|| format!("Invalid scene file '{}'", path.display()))?;
        let count = self.apply(&description)?;
        log::info!("Loaded {count} entities from '{}'", path.display());
        Ok(count)
    }
}
