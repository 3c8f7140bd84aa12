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

//! A software graphics backend with OpenGL-style context semantics.
//!
//! No pixels are produced. What the backend does model faithfully is the part
//! of OpenGL that makes multi-threaded loading hard:
//! - a context is current on at most one thread, and each thread has at most
//!   one current context;
//! - every command targets the calling thread's current context;
//! - buffers and textures live in a share group visible to all its contexts,
//!   while vertex arrays belong to the single context that created them;
//! - errors queue up per context until drained with `take_error`.
//!
//! [`HeadlessOptions`] injects driver failures so callers can exercise their
//! error paths.

mod context;
mod device;
mod options;
mod state;

pub use context::*;
pub use device::*;
pub use options::*;
