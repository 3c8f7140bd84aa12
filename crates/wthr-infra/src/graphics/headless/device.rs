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

use super::state::{self, BufferObject, ContextState, TextureObject, VertexArrayObject};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use wthr_core::renderer::{
    BufferId, BufferTarget, ContextId, GpuDevice, ResourceError, TextureDescriptor, TextureId,
    VertexArrayId, VertexAttribute, ERROR_INVALID_OPERATION, ERROR_INVALID_VALUE,
    ERROR_OUT_OF_MEMORY,
};

/// A snapshot of the work a [`HeadlessDevice`] has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Successful `draw_indexed` calls.
    pub draw_calls: u64,
    /// Indices submitted across all draws.
    pub indices_drawn: u64,
    /// Buffers created since the device was made.
    pub buffers_created: u64,
    /// Textures created since the device was made.
    pub textures_created: u64,
}

/// The command interface of the headless backend.
///
/// Stateless apart from counters: every call resolves the calling thread's
/// current context and operates on it.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    draw_calls: AtomicU64,
    indices_drawn: AtomicU64,
    buffers_created: AtomicU64,
    textures_created: AtomicU64,
}

impl HeadlessDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            indices_drawn: self.indices_drawn.load(Ordering::Relaxed),
            buffers_created: self.buffers_created.load(Ordering::Relaxed),
            textures_created: self.textures_created.load(Ordering::Relaxed),
        }
    }

    fn current(&self) -> Result<Arc<ContextState>, ResourceError> {
        let ctx = state::current().ok_or(ResourceError::NoCurrentContext)?;
        if ctx.destroyed.load(Ordering::Acquire) {
            return Err(ResourceError::NoCurrentContext);
        }
        Ok(ctx)
    }
}

fn fail(ctx: &ContextState, code: u32, err: ResourceError) -> ResourceError {
    ctx.record_error(code);
    err
}

impl GpuDevice for HeadlessDevice {
    fn current_context(&self) -> Option<ContextId> {
        self.current().ok().map(|c| c.id)
    }

    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> Result<BufferId, ResourceError> {
        let ctx = self.current()?;
        if let Some(max) = ctx.options.max_buffer_bytes {
            if data.len() > max {
                return Err(fail(&ctx, ERROR_OUT_OF_MEMORY, ResourceError::OutOfMemory));
            }
        }

        let name = ctx.group.gen_name();
        ctx.group.buffers.lock().insert(
            name,
            BufferObject {
                target,
                size: data.len(),
            },
        );
        ctx.group
            .allocated_bytes
            .fetch_add(data.len(), Ordering::Relaxed);
        self.buffers_created.fetch_add(1, Ordering::Relaxed);

        log::trace!(
            "HeadlessDevice: Created {target:?} buffer {name} ({} bytes) in {}",
            data.len(),
            ctx.id
        );
        Ok(BufferId(name))
    }

    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let ctx = self.current()?;
        let removed = ctx.group.buffers.lock().remove(&id.0);
        match removed {
            Some(buffer) => {
                ctx.group
                    .allocated_bytes
                    .fetch_sub(buffer.size, Ordering::Relaxed);
                log::trace!("HeadlessDevice: Deleted buffer {}", id.0);
                Ok(())
            }
            None => Err(ResourceError::InvalidHandle),
        }
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: &[u8],
    ) -> Result<TextureId, ResourceError> {
        let ctx = self.current()?;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(fail(
                &ctx,
                ERROR_INVALID_VALUE,
                ResourceError::InvalidData("texture has zero extent".to_string()),
            ));
        }
        if pixels.len() != descriptor.byte_len() {
            return Err(fail(
                &ctx,
                ERROR_INVALID_VALUE,
                ResourceError::InvalidData(format!(
                    "expected {} bytes of pixel data, got {}",
                    descriptor.byte_len(),
                    pixels.len()
                )),
            ));
        }

        let name = ctx.group.gen_name();
        ctx.group.textures.lock().insert(
            name,
            TextureObject {
                descriptor: descriptor.clone(),
            },
        );
        ctx.group
            .allocated_bytes
            .fetch_add(pixels.len(), Ordering::Relaxed);
        self.textures_created.fetch_add(1, Ordering::Relaxed);

        log::trace!(
            "HeadlessDevice: Created texture {name} '{}' ({}x{}) in {}",
            descriptor.label.as_deref().unwrap_or_default(),
            descriptor.width,
            descriptor.height,
            ctx.id
        );
        Ok(TextureId(name))
    }

    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let ctx = self.current()?;
        let removed = ctx.group.textures.lock().remove(&id.0);
        match removed {
            Some(texture) => {
                ctx.group
                    .allocated_bytes
                    .fetch_sub(texture.descriptor.byte_len(), Ordering::Relaxed);
                Ok(())
            }
            None => Err(ResourceError::InvalidHandle),
        }
    }

    fn create_vertex_array(
        &self,
        layout: &[VertexAttribute],
        vertex_buffer: Option<BufferId>,
        index_buffer: Option<BufferId>,
    ) -> Result<VertexArrayId, ResourceError> {
        let ctx = self.current()?;
        if ctx.is_shared && ctx.options.fail_shared_vertex_arrays {
            return Err(fail(
                &ctx,
                ERROR_INVALID_OPERATION,
                ResourceError::BackendError("vertex arrays are unavailable".to_string()),
            ));
        }

        let missing = {
            let buffers = ctx.group.buffers.lock();
            [vertex_buffer, index_buffer]
                .into_iter()
                .flatten()
                .any(|b| !buffers.contains_key(&b.0))
        };
        if missing {
            return Err(fail(&ctx, ERROR_INVALID_OPERATION, ResourceError::InvalidHandle));
        }

        let name = ctx.gen_vertex_array_name();
        ctx.vertex_arrays.lock().insert(
            name,
            VertexArrayObject {
                layout: layout.to_vec(),
                vertex_buffer,
                index_buffer,
            },
        );
        log::trace!("HeadlessDevice: Created vertex array {name} in {}", ctx.id);
        Ok(VertexArrayId(name))
    }

    fn delete_vertex_array(&self, id: VertexArrayId) -> Result<(), ResourceError> {
        let ctx = self.current()?;
        let removed = ctx.vertex_arrays.lock().remove(&id.0);
        removed.map(|_| ()).ok_or(ResourceError::InvalidHandle)
    }

    fn bind_texture(&self, _unit: u32, texture: TextureId) -> Result<(), ResourceError> {
        let ctx = self.current()?;
        if !ctx.group.textures.lock().contains_key(&texture.0) {
            return Err(fail(&ctx, ERROR_INVALID_OPERATION, ResourceError::InvalidHandle));
        }
        Ok(())
    }

    fn draw_indexed(
        &self,
        vertex_array: VertexArrayId,
        index_count: u32,
    ) -> Result<(), ResourceError> {
        let ctx = self.current()?;

        // Vertex arrays are per context: a name from another context is invalid here.
        let found = ctx
            .vertex_arrays
            .lock()
            .get(&vertex_array.0)
            .map(|vao| (vao.vertex_buffer, vao.index_buffer, !vao.layout.is_empty()));
        let Some((vertex_buffer, index_buffer, has_layout)) = found else {
            return Err(fail(&ctx, ERROR_INVALID_OPERATION, ResourceError::InvalidHandle));
        };
        if !has_layout {
            return Err(fail(
                &ctx,
                ERROR_INVALID_OPERATION,
                ResourceError::InvalidData("vertex array has no attributes".to_string()),
            ));
        }

        let index_bytes = {
            let buffers = ctx.group.buffers.lock();
            let vertex_ok = vertex_buffer.is_some_and(|b| buffers.contains_key(&b.0));
            let index = index_buffer
                .and_then(|b| buffers.get(&b.0))
                .filter(|b| b.target == BufferTarget::ElementArray)
                .map(|b| b.size);
            index.filter(|_| vertex_ok)
        };
        let Some(index_bytes) = index_bytes else {
            return Err(fail(&ctx, ERROR_INVALID_OPERATION, ResourceError::InvalidHandle));
        };
        if index_count as usize * std::mem::size_of::<u32>() > index_bytes {
            return Err(fail(
                &ctx,
                ERROR_INVALID_OPERATION,
                ResourceError::InvalidData(format!(
                    "{index_count} indices exceed the bound index buffer"
                )),
            ));
        }

        self.draw_calls.fetch_add(1, Ordering::Relaxed);
        self.indices_drawn
            .fetch_add(index_count as u64, Ordering::Relaxed);
        Ok(())
    }

    fn take_error(&self) -> Option<u32> {
        self.current().ok()?.take_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessDisplay, HeadlessOptions};
    use wthr_core::renderer::{AttributeKind, ContextAttributes, GraphicsContext};

    const LAYOUT: [VertexAttribute; 1] = [VertexAttribute::new(0, 3, AttributeKind::Float, 0, 12)];

    fn quad(device: &HeadlessDevice) -> (BufferId, BufferId) {
        let vbo = device
            .create_buffer(BufferTarget::Array, &[0u8; 48])
            .unwrap();
        let ebo = device
            .create_buffer(BufferTarget::ElementArray, &[0u8; 24])
            .unwrap();
        (vbo, ebo)
    }

    #[test]
    fn commands_need_a_current_context() {
        let display = HeadlessDisplay::default();
        let device = display.device();
        assert_eq!(device.current_context(), None);
        assert_eq!(
            device.create_buffer(BufferTarget::Array, &[1, 2, 3]),
            Err(ResourceError::NoCurrentContext)
        );
        assert_eq!(device.take_error(), None);
    }

    #[test]
    fn buffers_are_shared_but_vertex_arrays_are_not() {
        let display = HeadlessDisplay::default();
        let device = display.device();
        let main = display.create_context(&ContextAttributes::default()).unwrap();
        let worker = main
            .create_shared_context(&ContextAttributes::default())
            .unwrap();

        worker.make_current().unwrap();
        let (vbo, ebo) = quad(&device);
        let worker_vao = device
            .create_vertex_array(&LAYOUT, Some(vbo), Some(ebo))
            .unwrap();
        device.draw_indexed(worker_vao, 6).unwrap();

        main.make_current().unwrap();
        // The worker's vertex array name means nothing here.
        assert_eq!(
            device.draw_indexed(worker_vao, 6),
            Err(ResourceError::InvalidHandle)
        );
        assert_eq!(device.take_error(), Some(ERROR_INVALID_OPERATION));

        // The buffers, however, are visible.
        let main_vao = device
            .create_vertex_array(&LAYOUT, Some(vbo), Some(ebo))
            .unwrap();
        device.draw_indexed(main_vao, 6).unwrap();
        assert_eq!(device.stats().draw_calls, 2);
        assert_eq!(main.live_buffers(), 2);
    }

    #[test]
    fn unshared_namespace_hides_buffers() {
        let display = HeadlessDisplay::new(HeadlessOptions {
            share_objects: false,
            ..Default::default()
        });
        let device = display.device();
        let main = display.create_context(&ContextAttributes::default()).unwrap();
        let worker = main
            .create_shared_context(&ContextAttributes::default())
            .unwrap();

        worker.make_current().unwrap();
        let (vbo, ebo) = quad(&device);

        main.make_current().unwrap();
        assert_eq!(
            device.create_vertex_array(&LAYOUT, Some(vbo), Some(ebo)),
            Err(ResourceError::InvalidHandle)
        );
    }

    #[test]
    fn texture_size_mismatch_records_error() {
        let display = HeadlessDisplay::default();
        let device = display.device();
        let ctx = display.create_context(&ContextAttributes::default()).unwrap();
        ctx.make_current().unwrap();

        let desc = TextureDescriptor {
            width: 2,
            height: 2,
            ..Default::default()
        };
        assert!(matches!(
            device.create_texture(&desc, &[0u8; 3]),
            Err(ResourceError::InvalidData(_))
        ));
        assert_eq!(device.take_error(), Some(ERROR_INVALID_VALUE));
        assert_eq!(device.take_error(), None);

        let tex = device.create_texture(&desc, &[0u8; 16]).unwrap();
        assert_eq!(ctx.allocated_bytes(), 16);
        device.delete_texture(tex).unwrap();
        assert_eq!(ctx.allocated_bytes(), 0);
    }

    #[test]
    fn buffer_limit_reports_out_of_memory() {
        let display = HeadlessDisplay::new(HeadlessOptions {
            max_buffer_bytes: Some(8),
            ..Default::default()
        });
        let device = display.device();
        let ctx = display.create_context(&ContextAttributes::default()).unwrap();
        ctx.make_current().unwrap();

        assert_eq!(
            device.create_buffer(BufferTarget::Array, &[0u8; 9]),
            Err(ResourceError::OutOfMemory)
        );
        assert_eq!(device.take_error(), Some(ERROR_OUT_OF_MEMORY));
    }

    #[test]
    fn overlong_draw_is_rejected() {
        let display = HeadlessDisplay::default();
        let device = display.device();
        let ctx = display.create_context(&ContextAttributes::default()).unwrap();
        ctx.make_current().unwrap();

        let (vbo, ebo) = quad(&device);
        let vao = device
            .create_vertex_array(&LAYOUT, Some(vbo), Some(ebo))
            .unwrap();
        assert!(matches!(
            device.draw_indexed(vao, 7),
            Err(ResourceError::InvalidData(_))
        ));
        device.delete_buffer(ebo).unwrap();
        assert_eq!(device.draw_indexed(vao, 6), Err(ResourceError::InvalidHandle));
    }
}
