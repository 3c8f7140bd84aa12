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

//! # WTHR Lanes
//!
//! Execution pipelines for model assets.
//!
//! The crate is split in two halves that must never be mixed up:
//! - [`asset_lane`]: CPU-only parsing and decoding. Safe on any thread,
//!   never touches a graphics context.
//! - [`upload_lane`]: turns parsed data into GPU objects. Must run on a thread
//!   with a current graphics context.

#![warn(missing_docs)]

pub mod asset_lane;
pub mod upload_lane;

pub use asset_lane::{ModelLoaderLane, ModelLoaderRegistry, ObjLoaderLane, TextureLoaderLane};
pub use upload_lane::{GpuMesh, GpuModel, GpuTexture, ModelUploadLane};
