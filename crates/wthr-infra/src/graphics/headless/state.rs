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

//! Driver-side bookkeeping shared by contexts and the device.

use super::HeadlessOptions;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use wthr_core::renderer::{
    BufferId, BufferTarget, ContextAttributes, ContextId, ContextInfo, TextureDescriptor,
    VertexAttribute,
};

thread_local! {
    static CURRENT: RefCell<Option<Arc<ContextState>>> = const { RefCell::new(None) };
}

pub(crate) struct BufferObject {
    pub target: BufferTarget,
    pub size: usize,
}

pub(crate) struct TextureObject {
    pub descriptor: TextureDescriptor,
}

pub(crate) struct VertexArrayObject {
    pub layout: Vec<VertexAttribute>,
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
}

/// Context and share group numbering for one display.
#[derive(Debug)]
pub(crate) struct DisplayCounters {
    next_context: AtomicU64,
    next_group: AtomicU64,
}

impl DisplayCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_context: AtomicU64::new(1),
            next_group: AtomicU64::new(1),
        })
    }

    fn context_id(&self) -> ContextId {
        ContextId(self.next_context.fetch_add(1, Ordering::Relaxed))
    }

    fn group_id(&self) -> u64 {
        self.next_group.fetch_add(1, Ordering::Relaxed)
    }
}

/// The object namespace shared by a set of contexts.
pub(crate) struct ShareGroup {
    pub id: u64,
    next_name: AtomicU32,
    pub buffers: Mutex<HashMap<u32, BufferObject>>,
    pub textures: Mutex<HashMap<u32, TextureObject>>,
    pub allocated_bytes: AtomicUsize,
}

impl ShareGroup {
    pub fn new(counters: &DisplayCounters) -> Arc<Self> {
        Arc::new(Self {
            id: counters.group_id(),
            next_name: AtomicU32::new(1),
            buffers: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            allocated_bytes: AtomicUsize::new(0),
        })
    }

    /// Object names start at 1; 0 is never a valid name.
    pub fn gen_name(&self) -> u32 {
        self.next_name.fetch_add(1, Ordering::Relaxed)
    }
}

pub(crate) struct ContextState {
    pub id: ContextId,
    pub counters: Arc<DisplayCounters>,
    pub group: Arc<ShareGroup>,
    pub attributes: ContextAttributes,
    pub info: ContextInfo,
    pub options: Arc<HeadlessOptions>,
    pub is_shared: bool,
    pub owner: Mutex<Option<ThreadId>>,
    pub destroyed: AtomicBool,
    next_vertex_array: AtomicU32,
    pub vertex_arrays: Mutex<HashMap<u32, VertexArrayObject>>,
    errors: Mutex<VecDeque<u32>>,
}

impl ContextState {
    pub fn new(
        counters: Arc<DisplayCounters>,
        group: Arc<ShareGroup>,
        attributes: ContextAttributes,
        info: ContextInfo,
        options: Arc<HeadlessOptions>,
        is_shared: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: counters.context_id(),
            counters,
            group,
            attributes,
            info,
            options,
            is_shared,
            owner: Mutex::new(None),
            destroyed: AtomicBool::new(false),
            next_vertex_array: AtomicU32::new(1),
            vertex_arrays: Mutex::new(HashMap::new()),
            errors: Mutex::new(VecDeque::new()),
        })
    }

    pub fn gen_vertex_array_name(&self) -> u32 {
        self.next_vertex_array.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_error(&self, code: u32) {
        log::trace!("{}: recorded error 0x{code:04X}", self.id);
        self.errors.lock().push_back(code);
    }

    pub fn take_error(&self) -> Option<u32> {
        self.errors.lock().pop_front()
    }
}

/// Returns the context current on the calling thread.
pub(crate) fn current() -> Option<Arc<ContextState>> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Binds `state` to the calling thread, returning the previously bound context.
pub(crate) fn set_current(state: Option<Arc<ContextState>>) -> Option<Arc<ContextState>> {
    CURRENT.with(|c| std::mem::replace(&mut *c.borrow_mut(), state))
}
