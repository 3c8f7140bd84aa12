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

//! CPU-side asset lanes: parsing model files into [`ModelData`].

mod loading;
mod registry;

pub use loading::*;
pub use registry::*;

use anyhow::Result;
use std::path::Path;
use wthr_core::asset::ModelData;

/// A parser that turns a model file on disk into its CPU representation.
///
/// This is the expensive, GPU-independent half of a load. Implementors must
/// not call into any graphics API: they run on short-lived loader threads
/// that never have a context current.
pub trait ModelLoaderLane: Send + Sync + 'static {
    /// Lowercase file extensions (without the dot) this lane understands.
    fn extensions(&self) -> &[&'static str];

    /// Parses the model at `path`, resolving any side files relative to it.
    fn load_model(&self, path: &Path) -> Result<ModelData>;
}
