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

//! Texture decoding on the CPU.

use anyhow::{Context, Result};
use std::path::Path;
use wthr_core::asset::ImageData;

/// A lane dedicated to loading and decoding texture files on the CPU.
#[derive(Debug, Clone, Copy)]
pub struct TextureLoaderLane {
    /// Flip rows so the first row in memory is the bottom of the image,
    /// which is what OpenGL texture coordinates expect.
    pub flip_vertically: bool,
}

impl Default for TextureLoaderLane {
    fn default() -> Self {
        Self {
            flip_vertically: true,
        }
    }
}

impl TextureLoaderLane {
    /// Reads and decodes the image at `path`.
    pub fn load(&self, path: &Path) -> Result<ImageData> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read texture '{}'", path.display()))?;
        self.decode(&bytes)
            .with_context(|| format!("Failed to decode texture '{}'", path.display()))
    }

    /// Decodes an encoded image held in memory into RGBA8.
    pub fn decode(&self, bytes: &[u8]) -> Result<ImageData> {
        let mut img =
            image::load_from_memory(bytes).context("Failed to decode image from memory")?;
        if self.flip_vertically {
            img = img.flipv();
        }

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();
        Ok(ImageData {
            width,
            height,
            pixels: rgba_img.into_raw(),
        })
    }
}
