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

//! The two-phase model load: CPU parse on a loader thread, GPU upload on the worker.

use crate::job::{panic_message, Job, JobQueue};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wthr_core::asset::{LoadTicket, ModelData, SharedAsset};
use wthr_core::renderer::GpuDevice;
use wthr_lanes::asset_lane::ModelLoaderRegistry;
use wthr_lanes::upload_lane::{GpuModel, ModelUploadLane};

/// Orchestrates asynchronous model loads into [`SharedAsset`]s.
///
/// Each request gets its own CPU thread. The handles are kept so that
/// [`join_all`](Self::join_all) can wait for every outstanding parse during
/// shutdown.
///
/// Concurrent requests against the same asset are resolved by request order:
/// only the most recent request may publish, older results are discarded.
pub struct AsyncAssetLoader {
    registry: Arc<ModelLoaderRegistry>,
    upload: ModelUploadLane,
    queue: Arc<JobQueue>,
    device: Arc<dyn GpuDevice>,
    cpu_phase_delay: Duration,
    accepting: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything a loader thread carries for one request.
struct LoadRequest {
    asset: SharedAsset<GpuModel>,
    ticket: LoadTicket,
    path: PathBuf,
    registry: Arc<ModelLoaderRegistry>,
    upload: ModelUploadLane,
    queue: Arc<JobQueue>,
    device: Arc<dyn GpuDevice>,
    delay: Duration,
}

impl AsyncAssetLoader {
    pub(crate) fn new(
        registry: Arc<ModelLoaderRegistry>,
        queue: Arc<JobQueue>,
        device: Arc<dyn GpuDevice>,
        cpu_phase_delay: Duration,
    ) -> Self {
        Self {
            registry,
            upload: ModelUploadLane::default(),
            queue,
            device,
            cpu_phase_delay,
            accepting: AtomicBool::new(true),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Starts loading `path` into `asset` without blocking the caller.
    ///
    /// The asset is reset first, then marked loading. It becomes ready once the
    /// upload job has run on the worker, or failed if parsing or uploading fails.
    pub fn request_load(&self, asset: &SharedAsset<GpuModel>, path: &Path) {
        asset.reset();
        let ticket = asset.begin_load();

        if path.as_os_str().is_empty() {
            log::error!("Empty path provided for model loading");
            asset.fail(ticket);
            return;
        }
        if !self.accepting.load(Ordering::Acquire) {
            log::warn!(
                "Model load of '{}' requested after shutdown; ignoring it",
                path.display()
            );
            asset.fail(ticket);
            return;
        }

        log::info!("Starting async model load: {}", path.display());
        let request = LoadRequest {
            asset: asset.clone(),
            ticket,
            path: path.to_path_buf(),
            registry: Arc::clone(&self.registry),
            upload: self.upload,
            queue: Arc::clone(&self.queue),
            device: Arc::clone(&self.device),
            delay: self.cpu_phase_delay,
        };

        let spawned = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || request.run_cpu_phase());
        match spawned {
            Ok(handle) => {
                let mut tasks = self.tasks.lock();
                tasks.retain(|h| !h.is_finished());
                tasks.push(handle);
            }
            Err(e) => {
                log::error!(
                    "Failed to spawn loader thread for '{}': {e}",
                    path.display()
                );
                asset.fail(ticket);
            }
        }
    }

    /// Number of CPU-phase threads that have not finished yet.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.len()
    }

    /// Stops accepting requests and waits for every CPU-phase thread.
    ///
    /// Threads that finish after the job queue was shut down have their upload
    /// rejected and mark their asset failed.
    pub fn join_all(&self) {
        self.accepting.store(false, Ordering::Release);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if !tasks.is_empty() {
            log::debug!("Waiting for {} loader thread(s)", tasks.len());
        }
        for handle in tasks {
            if handle.join().is_err() {
                log::error!("A model loader thread panicked");
            }
        }
    }
}

impl LoadRequest {
    fn run_cpu_phase(self) {
        log::debug!(
            "CPU loading of '{}' started on {:?}",
            self.path.display(),
            thread::current().id()
        );
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if !self.asset.is_current(self.ticket) {
            log::debug!(
                "Load of '{}' superseded before parsing; skipping",
                self.path.display()
            );
            return;
        }

        let parsed = panic::catch_unwind(AssertUnwindSafe(|| self.registry.load(&self.path)));
        let model = match parsed {
            Ok(Ok(model)) => model,
            Ok(Err(e)) => {
                log::error!("Failed to load model '{}': {e:#}", self.path.display());
                self.asset.fail(self.ticket);
                return;
            }
            Err(payload) => {
                log::error!(
                    "Parser panicked while loading '{}': {}",
                    self.path.display(),
                    panic_message(payload.as_ref())
                );
                self.asset.fail(self.ticket);
                return;
            }
        };

        log::debug!(
            "CPU work completed for '{}', queuing GPU upload",
            self.path.display()
        );
        let asset = self.asset.clone();
        let ticket = self.ticket;
        let path = self.path.clone();
        let queue = Arc::clone(&self.queue);
        let job = Job::named(format!("upload {}", self.path.display()), move || {
            self.run_gpu_phase(model)
        });
        if queue.push(job).is_err() {
            log::error!(
                "GPU upload of '{}' was rejected; the model will not load",
                path.display()
            );
            asset.fail(ticket);
        }
    }

    /// Runs on the worker thread with its context current.
    fn run_gpu_phase(self, model: ModelData) {
        let display = self.path.display();
        log::debug!("GPU upload of '{display}' starting on {:?}", thread::current().id());
        self.drain_errors("before model creation");

        if !self.asset.is_current(self.ticket) {
            log::debug!("Discarding stale load of '{display}' before upload");
            return;
        }

        let uploaded =
            panic::catch_unwind(AssertUnwindSafe(|| self.upload.upload(&self.device, &model)));
        match uploaded {
            Ok(Ok(gpu)) => {
                self.drain_errors("during model creation");
                match self.asset.publish(self.ticket, gpu) {
                    Ok(()) => log::info!("Async model '{display}' uploaded successfully"),
                    // Dropped here, while the worker context is current.
                    Err(_stale) => log::debug!(
                        "Discarding upload of '{display}': a newer request superseded it"
                    ),
                }
            }
            Ok(Err(e)) => {
                log::error!("Failed to upload model '{display}': {e}");
                self.asset.fail(self.ticket);
            }
            Err(payload) => {
                log::error!(
                    "GPU upload of '{display}' panicked: {}",
                    panic_message(payload.as_ref())
                );
                self.asset.fail(self.ticket);
            }
        }
        self.drain_errors("after async load");
    }

    fn drain_errors(&self, when: &str) {
        while let Some(code) = self.device.take_error() {
            log::error!("Graphics error 0x{code:04X} {when} of '{}'", self.path.display());
        }
    }
}
