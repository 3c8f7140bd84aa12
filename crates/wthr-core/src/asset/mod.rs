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

//! Provides the foundational traits and primitive types for the asset system.
//!
//! The key components are:
//! - The [`Asset`] trait: A marker for all types that can be treated as assets.
//! - [`SharedAsset`]: the cross-thread slot a background load publishes into
//!   and the render loop polls every frame.
//! - The CPU-side model representation produced by parsers and consumed by
//!   the GPU upload.

mod model;
mod shared;

pub use model::*;
pub use shared::*;

use crate::renderer::{GpuDevice, ResourceError};

/// A marker trait for types that can be managed by the asset system.
///
/// The supertraits enforce critical safety guarantees:
/// - `Send` + `Sync`: The asset type can be safely shared and sent between threads.
///   This is essential for background loading.
/// - `'static`: The asset type does not contain any non-static references, ensuring
///   it can be stored for the lifetime of the application.
///
/// # Examples
///
/// ```
/// use wthr_core::asset::Asset;
///
/// struct Texture {
///     // ... fields
/// }
///
/// impl Asset for Texture {}
/// ```
pub trait Asset: Send + Sync + 'static {}

/// An asset that knows how to issue its own draw calls.
pub trait Drawable: Asset {
    /// Draws the asset using whichever context is current on the calling thread.
    fn draw(&self, device: &dyn GpuDevice) -> Result<(), ResourceError>;
}
