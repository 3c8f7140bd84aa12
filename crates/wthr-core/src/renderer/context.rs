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

use super::device::GpuDevice;
use super::error::ContextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies a graphics context for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// The OpenGL profile requested for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlProfile {
    /// Core profile, no deprecated functionality.
    #[default]
    Core,
    /// Compatibility profile.
    Compatibility,
}

/// Creation hints for a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAttributes {
    /// Requested major version.
    pub major: u8,
    /// Requested minor version.
    pub minor: u8,
    /// Requested profile.
    pub profile: GlProfile,
    /// Whether the backing surface is shown. Worker contexts are hidden.
    pub visible: bool,
    /// Request a forward-compatible context (required on macOS).
    pub forward_compat: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            major: 4,
            minor: 6,
            profile: GlProfile::Core,
            visible: false,
            forward_compat: cfg!(target_os = "macos"),
        }
    }
}

/// Driver-reported identification strings for a context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextInfo {
    /// The `GL_VERSION` string.
    pub version: String,
    /// The `GL_VENDOR` string.
    pub vendor: String,
    /// The `GL_RENDERER` string.
    pub renderer: String,
}

impl fmt::Display for ContextInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.vendor, self.version, self.renderer)
    }
}

/// A stateful connection to the GPU that is current on at most one thread at a time.
///
/// Implementors are `Send` so a context can be moved to the thread that will
/// own it, but deliberately not required to be `Sync`: sharing a context
/// between threads is prevented by ownership rather than checked at run time.
pub trait GraphicsContext: Send {
    /// Returns this context's identity.
    fn id(&self) -> ContextId;

    /// Makes this context current on the calling thread.
    ///
    /// Whatever context was current on the thread before is released.
    /// Fails if the context is current on another thread.
    fn make_current(&self) -> Result<(), ContextError>;

    /// Releases this context from the calling thread.
    fn make_not_current(&self) -> Result<(), ContextError>;

    /// Returns `true` if this context is current on the calling thread.
    fn is_current(&self) -> bool;

    /// Queries version and vendor strings. The context must be current.
    fn info(&self) -> Result<ContextInfo, ContextError>;

    /// Returns the attributes the context was created with.
    fn attributes(&self) -> &ContextAttributes;

    /// Creates an off-screen context that shares this context's object namespace.
    fn create_shared_context(
        &self,
        attributes: &ContextAttributes,
    ) -> Result<Box<dyn GraphicsContext>, ContextError>;

    /// Returns the function table used to issue GPU commands.
    ///
    /// Commands always target whichever context is current on the calling thread.
    fn device(&self) -> Arc<dyn GpuDevice>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attributes_request_hidden_core_46() {
        let attrs = ContextAttributes::default();
        assert_eq!((attrs.major, attrs.minor), (4, 6));
        assert_eq!(attrs.profile, GlProfile::Core);
        assert!(!attrs.visible);
    }

    #[test]
    fn context_info_display() {
        let info = ContextInfo {
            version: "4.6.0".into(),
            vendor: "ACME".into(),
            renderer: "Rasterizer".into(),
        };
        assert_eq!(info.to_string(), "ACME - 4.6.0 (Rasterizer)");
        assert_eq!(ContextId(3).to_string(), "ctx#3");
    }
}
