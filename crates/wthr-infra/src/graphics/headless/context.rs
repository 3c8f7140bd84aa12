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

use super::state::{self, ContextState, DisplayCounters, ShareGroup};
use super::{HeadlessDevice, HeadlessOptions};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use wthr_core::renderer::{
    ContextAttributes, ContextError, ContextId, ContextInfo, GpuDevice, GraphicsContext,
};

/// The headless "display server": creates primary contexts.
///
/// All contexts created from one display, directly or through sharing, use the
/// same [`HeadlessDevice`].
#[derive(Debug, Clone)]
pub struct HeadlessDisplay {
    options: Arc<HeadlessOptions>,
    device: Arc<HeadlessDevice>,
    counters: Arc<DisplayCounters>,
}

impl HeadlessDisplay {
    /// Creates a display with the given driver behaviour.
    pub fn new(options: HeadlessOptions) -> Self {
        Self {
            options: Arc::new(options),
            device: Arc::new(HeadlessDevice::new()),
            counters: DisplayCounters::new(),
        }
    }

    /// The device shared by every context of this display.
    pub fn device(&self) -> Arc<HeadlessDevice> {
        Arc::clone(&self.device)
    }

    /// Creates a context with its own, fresh object namespace.
    pub fn create_context(
        &self,
        attributes: &ContextAttributes,
    ) -> Result<HeadlessContext, ContextError> {
        check_version(&self.options, attributes)?;
        let info = driver_info(&self.options, attributes, &self.options.vendor);
        let state = ContextState::new(
            Arc::clone(&self.counters),
            ShareGroup::new(&self.counters),
            attributes.clone(),
            info,
            Arc::clone(&self.options),
            false,
        );
        log::debug!("Created headless context {} (share group {})", state.id, state.group.id);
        Ok(HeadlessContext {
            state,
            device: Arc::clone(&self.device),
        })
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new(HeadlessOptions::default())
    }
}

fn check_version(
    options: &HeadlessOptions,
    attributes: &ContextAttributes,
) -> Result<(), ContextError> {
    if (attributes.major, attributes.minor) > options.max_version {
        return Err(ContextError::CreationFailed(format!(
            "OpenGL {}.{} requested but the driver supports up to {}.{}",
            attributes.major, attributes.minor, options.max_version.0, options.max_version.1
        )));
    }
    Ok(())
}

fn driver_info(options: &HeadlessOptions, attributes: &ContextAttributes, vendor: &str) -> ContextInfo {
    ContextInfo {
        version: format!(
            "{}.{}.0 {:?} Profile",
            attributes.major, attributes.minor, attributes.profile
        ),
        vendor: vendor.to_string(),
        renderer: options.renderer.clone(),
    }
}

/// A headless graphics context.
///
/// Dropping the context destroys it. Objects owned by its share group survive
/// as long as another context of the group is alive.
pub struct HeadlessContext {
    state: Arc<ContextState>,
    device: Arc<HeadlessDevice>,
}

impl HeadlessContext {
    /// Number of live buffers in this context's share group.
    pub fn live_buffers(&self) -> usize {
        self.state.group.buffers.lock().len()
    }

    /// Number of live textures in this context's share group.
    pub fn live_textures(&self) -> usize {
        self.state.group.textures.lock().len()
    }

    /// Number of vertex arrays owned by this context.
    pub fn live_vertex_arrays(&self) -> usize {
        self.state.vertex_arrays.lock().len()
    }

    /// Bytes held by buffers and textures of the share group.
    pub fn allocated_bytes(&self) -> usize {
        self.state.group.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Returns `true` if objects created in `other` are visible here.
    pub fn shares_objects_with(&self, other: &HeadlessContext) -> bool {
        Arc::ptr_eq(&self.state.group, &other.state.group)
    }

    fn owner_matches_current_thread(&self) -> bool {
        *self.state.owner.lock() == Some(thread::current().id())
    }
}

impl GraphicsContext for HeadlessContext {
    fn id(&self) -> ContextId {
        self.state.id
    }

    fn make_current(&self) -> Result<(), ContextError> {
        if self.state.destroyed.load(Ordering::Acquire) {
            return Err(ContextError::ContextLost(self.state.id));
        }
        if self.state.is_shared {
            if let Some(delay) = self.state.options.shared_make_current_delay {
                thread::sleep(delay);
            }
        }

        let me = thread::current().id();
        {
            let mut owner = self.state.owner.lock();
            match *owner {
                Some(other) if other != me => {
                    return Err(ContextError::CurrentOnOtherThread(self.state.id))
                }
                _ => *owner = Some(me),
            }
        }

        if let Some(previous) = state::set_current(Some(Arc::clone(&self.state))) {
            if !Arc::ptr_eq(&previous, &self.state) {
                *previous.owner.lock() = None;
            }
        }
        log::trace!("{} made current on {:?}", self.state.id, me);
        Ok(())
    }

    fn make_not_current(&self) -> Result<(), ContextError> {
        if !self.is_current() {
            return Err(ContextError::NotCurrent(self.state.id));
        }
        *self.state.owner.lock() = None;
        state::set_current(None);
        Ok(())
    }

    fn is_current(&self) -> bool {
        state::current().is_some_and(|c| Arc::ptr_eq(&c, &self.state))
    }

    fn info(&self) -> Result<ContextInfo, ContextError> {
        if !self.is_current() {
            return Err(ContextError::NotCurrent(self.state.id));
        }
        Ok(self.state.info.clone())
    }

    fn attributes(&self) -> &ContextAttributes {
        &self.state.attributes
    }

    fn create_shared_context(
        &self,
        attributes: &ContextAttributes,
    ) -> Result<Box<dyn GraphicsContext>, ContextError> {
        let options = &self.state.options;
        if options.fail_shared_context_creation {
            return Err(ContextError::CreationFailed(
                "the platform refused to create a shared context".to_string(),
            ));
        }
        check_version(options, attributes)?;

        let group = if options.share_objects {
            Arc::clone(&self.state.group)
        } else {
            ShareGroup::new(&self.state.counters)
        };
        let vendor = options.shared_vendor.as_deref().unwrap_or(&options.vendor);
        let info = driver_info(options, attributes, vendor);
        let state = ContextState::new(
            Arc::clone(&self.state.counters),
            group,
            attributes.clone(),
            info,
            Arc::clone(options),
            true,
        );
        log::debug!(
            "Created headless context {} sharing with {} (share group {})",
            state.id,
            self.state.id,
            state.group.id
        );

        Ok(Box::new(HeadlessContext {
            state,
            device: Arc::clone(&self.device),
        }))
    }

    fn device(&self) -> Arc<dyn GpuDevice> {
        self.device.clone()
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        self.state.destroyed.store(true, Ordering::Release);
        if self.is_current() {
            state::set_current(None);
        } else if self.state.owner.lock().is_some() && !self.owner_matches_current_thread() {
            log::warn!("{} destroyed while current on another thread", self.state.id);
        }
        *self.state.owner.lock() = None;
        self.state.vertex_arrays.lock().clear();
        log::debug!("Destroyed headless context {}", self.state.id);
    }
}

impl fmt::Debug for HeadlessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessContext")
            .field("id", &self.state.id)
            .field("share_group", &self.state.group.id)
            .field("shared", &self.state.is_shared)
            .finish()
    }
}
