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

//! The public-facing SDK for WTHR.
//!
//! [`ModelScene`] is the entry point: it owns a [`RenderContextWorker`] bound
//! to the application's primary context, spawns model and shape entities whose
//! GPU data is produced in the background, and draws whatever is ready once
//! per frame.

mod model_scene;
mod scene_file;

pub use model_scene::{EntityId, FrameStats, GroupId, ModelScene, Renderable, Transform};
pub use scene_file::{EntityDescription, EntitySource, SceneDescription};

pub use wthr_control::{RenderContextWorker, WorkerConfig, WorkerError};

pub mod prelude {
    //! The types most applications need, in one import.
    pub use crate::{
        EntityId, FrameStats, GroupId, ModelScene, SceneDescription, Transform,
    };
    pub use wthr_control::{Job, RenderContextWorker, WorkerConfig, WorkerError};
    pub use wthr_core::asset::{AssetStatus, SharedAsset};
    pub use wthr_core::renderer::{ContextAttributes, GraphicsContext};
    pub use wthr_core::scene::PrimitiveShape;
    pub use wthr_infra::{HeadlessDisplay, HeadlessOptions};
    pub use wthr_lanes::GpuModel;
}
