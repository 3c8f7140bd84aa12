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

//! A registry of model loader lanes, keyed by file extension.

use super::{ModelLoaderLane, ObjLoaderLane};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use wthr_core::asset::ModelData;

/// Picks the right [`ModelLoaderLane`] for a path.
///
/// The registry is immutable once built and is shared between loader threads
/// behind an `Arc`.
pub struct ModelLoaderRegistry {
    lanes: HashMap<String, Arc<dyn ModelLoaderLane>>,
}

impl ModelLoaderRegistry {
    /// Creates a registry with no lanes.
    pub fn empty() -> Self {
        Self {
            lanes: HashMap::new(),
        }
    }

    /// Registers `lane` for every extension it reports, replacing earlier lanes.
    pub fn register(&mut self, lane: impl ModelLoaderLane) {
        let lane: Arc<dyn ModelLoaderLane> = Arc::new(lane);
        for ext in lane.extensions() {
            if self
                .lanes
                .insert(ext.to_ascii_lowercase(), Arc::clone(&lane))
                .is_some()
            {
                log::debug!("Replaced model loader for '.{ext}'");
            }
        }
    }

    /// Returns `true` if some lane handles `path`'s extension.
    pub fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.lanes.contains_key(&ext))
    }

    /// All registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.lanes.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// Parses the model at `path` with the lane registered for its extension.
    pub fn load(&self, path: &Path) -> Result<ModelData> {
        let ext = extension_of(path)
            .ok_or_else(|| anyhow!("Model path '{}' has no file extension", path.display()))?;
        let lane = self
            .lanes
            .get(&ext)
            .ok_or_else(|| anyhow!("No model loader registered for extension '.{ext}'"))?;
        lane.load_model(path)
    }
}

impl Default for ModelLoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ObjLoaderLane::default());
        registry
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct StubLane;

    impl ModelLoaderLane for StubLane {
        fn extensions(&self) -> &[&'static str] {
            &["stub", "STB"]
        }

        fn load_model(&self, path: &Path) -> Result<ModelData> {
            if path.file_stem().is_some_and(|s| s == "broken") {
                bail!("stub parse failure");
            }
            Ok(ModelData {
                source: path.to_path_buf(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn default_registry_handles_obj() {
        let registry = ModelLoaderRegistry::default();
        assert!(registry.supports(Path::new("models/teapot.OBJ")));
        assert!(!registry.supports(Path::new("models/teapot.fbx")));
        assert_eq!(registry.extensions(), vec!["obj"]);
    }

    #[test]
    fn dispatches_on_lowercased_extension() {
        let mut registry = ModelLoaderRegistry::empty();
        registry.register(StubLane);

        let model = registry.load(Path::new("a.STUB")).unwrap();
        assert_eq!(model.source, Path::new("a.STUB"));
        assert!(registry.load(Path::new("b.stb")).is_ok());
        assert!(registry.load(Path::new("broken.stub")).is_err());
    }

    #[test]
    fn unknown_or_missing_extension_is_an_error() {
        let registry = ModelLoaderRegistry::default();
        let err = registry.load(Path::new("mesh.ply")).unwrap_err();
        assert!(err.to_string().contains(".ply"));
        assert!(registry.load(Path::new("no_extension")).is_err());
    }
}
