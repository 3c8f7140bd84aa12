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

use std::time::Duration;

/// Driver identity and fault injection for a [`HeadlessDisplay`](super::HeadlessDisplay).
///
/// Fields prefixed `shared_` only affect contexts created through
/// `create_shared_context`, leaving the primary context healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessOptions {
    /// Reported `GL_VENDOR`.
    pub vendor: String,
    /// Reported `GL_RENDERER`.
    pub renderer: String,
    /// Highest `(major, minor)` version a context may request.
    pub max_version: (u8, u8),
    /// When `false`, shared contexts get a fresh object namespace, as if the
    /// platform silently ignored the share request.
    pub share_objects: bool,
    /// Largest buffer the driver will allocate.
    pub max_buffer_bytes: Option<usize>,
    /// Refuse to create shared contexts.
    pub fail_shared_context_creation: bool,
    /// Vendor string reported by shared contexts, if different.
    pub shared_vendor: Option<String>,
    /// Sleep this long inside `make_current` on shared contexts.
    pub shared_make_current_delay: Option<Duration>,
    /// Make vertex array creation fail on shared contexts.
    pub fail_shared_vertex_arrays: bool,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            vendor: "WTHR".to_string(),
            renderer: "Headless Software Rasterizer".to_string(),
            max_version: (4, 6),
            share_objects: true,
            max_buffer_bytes: None,
            fail_shared_context_creation: false,
            shared_vendor: None,
            shared_make_current_delay: None,
            fail_shared_vertex_arrays: false,
        }
    }
}
