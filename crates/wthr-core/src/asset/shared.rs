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

//! A thread-safe slot for an asset that is produced on one thread and drawn on another.

use super::{Asset, Drawable};
use crate::renderer::GpuDevice;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observable lifecycle of a [`SharedAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetStatus {
    /// Nothing has been requested, or the slot was reset.
    Empty,
    /// A load request is in flight.
    Loading,
    /// The slot holds a fully constructed value.
    Ready,
    /// The most recent load request failed; the slot is empty.
    Failed,
}

/// Identifies one load request against a [`SharedAsset`].
///
/// Tickets are strictly increasing per asset. Only the holder of the newest
/// ticket may publish into the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Returns the raw request number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

struct Slot<T> {
    value: Option<T>,
    status: AssetStatus,
    latest_request: u64,
}

struct SharedAssetInner<T> {
    slot: Mutex<Slot<T>>,
    // Mirrors `slot.value.is_some()`; written only while the lock is held.
    ready: AtomicBool,
}

/// A reference-counted, mutually-exclusive wrapper around an optional loaded asset.
///
/// Cloning is cheap and every clone refers to the same slot. A background
/// thread publishes with [`set_asset`](Self::set_asset) (or
/// [`publish`](Self::publish)) while the render thread polls
/// [`is_ready`](Self::is_ready) and calls [`draw`](Self::draw) once per frame.
///
/// The ready flag is `true` if and only if the slot holds a value.
pub struct SharedAsset<T: Asset> {
    inner: Arc<SharedAssetInner<T>>,
}

impl<T: Asset> SharedAsset<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SharedAssetInner {
                slot: Mutex::new(Slot {
                    value: None,
                    status: AssetStatus::Empty,
                    latest_request: 0,
                }),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Takes ownership of `value`, replacing whatever the slot held, and marks it ready.
    pub fn set_asset(&self, value: T) {
        let previous = {
            let mut slot = self.inner.slot.lock();
            let previous = slot.value.replace(value);
            slot.status = AssetStatus::Ready;
            self.inner.ready.store(true, Ordering::Release);
            previous
        };
        // The old value may own GPU objects; release it outside the lock.
        drop(previous);
    }

    /// Returns `true` once a value has been published and not reset since.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Returns the current lifecycle state.
    pub fn status(&self) -> AssetStatus {
        self.inner.slot.lock().status
    }

    /// Clears the held value and marks the slot [`AssetStatus::Empty`].
    ///
    /// Outstanding load requests are not cancelled: a later publish with the
    /// newest ticket still lands.
    pub fn reset(&self) {
        let previous = {
            let mut slot = self.inner.slot.lock();
            slot.status = AssetStatus::Empty;
            self.inner.ready.store(false, Ordering::Release);
            slot.value.take()
        };
        drop(previous);
    }

    /// Registers a new load request and marks the slot [`AssetStatus::Loading`].
    ///
    /// Any previously issued ticket becomes stale. The current value, if any,
    /// stays visible until the new request publishes or fails.
    pub fn begin_load(&self) -> LoadTicket {
        let mut slot = self.inner.slot.lock();
        slot.latest_request += 1;
        slot.status = AssetStatus::Loading;
        LoadTicket(slot.latest_request)
    }

    /// Returns `true` if `ticket` is the newest request issued for this slot.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.inner.slot.lock().latest_request == ticket.0
    }

    /// Publishes `value` on behalf of `ticket`.
    ///
    /// If a newer request has been issued since, the slot is left untouched and
    /// the value is handed back to the caller.
    pub fn publish(&self, ticket: LoadTicket, value: T) -> Result<(), T> {
        let previous = {
            let mut slot = self.inner.slot.lock();
            if slot.latest_request != ticket.0 {
                return Err(value);
            }
            let previous = slot.value.replace(value);
            slot.status = AssetStatus::Ready;
            self.inner.ready.store(true, Ordering::Release);
            previous
        };
        drop(previous);
        Ok(())
    }

    /// Records that the request identified by `ticket` failed.
    ///
    /// Clears the slot and marks it [`AssetStatus::Failed`]. Returns `false`
    /// (and changes nothing) when the ticket is stale.
    pub fn fail(&self, ticket: LoadTicket) -> bool {
        let previous = {
            let mut slot = self.inner.slot.lock();
            if slot.latest_request != ticket.0 {
                return false;
            }
            slot.status = AssetStatus::Failed;
            self.inner.ready.store(false, Ordering::Release);
            slot.value.take()
        };
        drop(previous);
        true
    }

    /// Runs `f` against the held value while the lock is held.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slot = self.inner.slot.lock();
        slot.value.as_ref().map(f)
    }

    /// Returns `true` if both handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Drawable> SharedAsset<T> {
    /// Draws the held value if it is ready.
    ///
    /// Returns `false` without blocking beyond the lock hold time when the
    /// slot is empty or the draw itself failed.
    pub fn draw(&self, device: &dyn GpuDevice) -> bool {
        let slot = self.inner.slot.lock();
        match slot.value.as_ref() {
            Some(value) if self.inner.ready.load(Ordering::Acquire) => match value.draw(device) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Draw of a ready asset failed: {e}");
                    false
                }
            },
            _ => false,
        }
    }
}

impl<T: Asset> Clone for SharedAsset<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Asset> Default for SharedAsset<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Asset> fmt::Debug for SharedAsset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("SharedAsset")
            .field("status", &slot.status)
            .field("latest_request", &slot.latest_request)
            .finish()
    }
}
