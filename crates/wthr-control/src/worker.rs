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

//! The render-context worker: a thread that owns a shared graphics context.

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::job::{Job, JobOutcome, JobQueue};
use crate::loader::AsyncAssetLoader;
use crossbeam_channel::RecvTimeoutError;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use wthr_core::asset::SharedAsset;
use wthr_core::renderer::{ContextId, ContextInfo, GpuDevice, GraphicsContext};
use wthr_lanes::asset_lane::ModelLoaderRegistry;
use wthr_lanes::upload_lane::GpuModel;

/// Lifecycle of a [`RenderContextWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Nothing allocated yet.
    Created = 0,
    /// The shared context exists.
    ContextCreated = 1,
    /// Comparing driver strings of both contexts.
    VerifyingSharing = 2,
    /// The thread is making its context current and probing it.
    Initializing = 3,
    /// Executing jobs.
    Running = 4,
    /// Shutdown requested; the thread finishes what is queued.
    Draining = 5,
    /// The thread has exited.
    Stopped = 6,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::ContextCreated,
            2 => WorkerState::VerifyingSharing,
            3 => WorkerState::Initializing,
            4 => WorkerState::Running,
            5 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// State observed by both the owner and the worker thread.
struct Shared {
    state: AtomicU8,
    jobs_completed: AtomicU64,
    jobs_panicked: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Owns a secondary graphics context and the thread that keeps it current.
///
/// The context shares its object namespace with the primary context it was
/// created from, so buffers and textures created by jobs are directly usable
/// by the render thread.
///
/// Jobs run in submission order, one at a time, with the worker context
/// current. A job that panics is logged and the worker carries on.
///
/// Dropping the worker stops it, waits for outstanding loader threads, then
/// joins the worker thread, which releases the context on its way out.
pub struct RenderContextWorker {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    shared: Arc<Shared>,
    loader: AsyncAssetLoader,
    context_id: ContextId,
    device: Arc<dyn GpuDevice>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl RenderContextWorker {
    /// Creates a worker whose context shares objects with `primary`, using the
    /// default model loaders.
    ///
    /// Blocks until the worker thread is ready or
    /// [`init_timeout_ms`](WorkerConfig::init_timeout_ms) elapses.
    pub fn new(primary: &dyn GraphicsContext, config: WorkerConfig) -> Result<Self, WorkerError> {
        Self::with_registry(primary, config, Arc::new(ModelLoaderRegistry::default()))
    }

    /// Creates a worker that parses models with `registry`.
    pub fn with_registry(
        primary: &dyn GraphicsContext,
        config: WorkerConfig,
        registry: Arc<ModelLoaderRegistry>,
    ) -> Result<Self, WorkerError> {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(WorkerState::Created as u8),
            jobs_completed: AtomicU64::new(0),
            jobs_panicked: AtomicU64::new(0),
        });

        let attributes = config.worker_context_attributes(primary.attributes());
        log::info!(
            "Creating shared context for the GPU worker (OpenGL {}.{} {:?})...",
            attributes.major,
            attributes.minor,
            attributes.profile
        );
        let context = primary
            .create_shared_context(&attributes)
            .map_err(WorkerError::ContextCreation)?;
        let context_id = context.id();
        let device = context.device();
        shared.set_state(WorkerState::ContextCreated);
        log::info!("Worker context {context_id} created, sharing with {}", primary.id());

        if config.verify_sharing {
            shared.set_state(WorkerState::VerifyingSharing);
            verify_sharing(primary, context.as_ref());
        }

        shared.set_state(WorkerState::Initializing);
        let queue = Arc::new(JobQueue::with_capacity_limit(config.effective_queue_capacity()));
        let (init_tx, init_rx) = crossbeam_channel::bounded(1);
        let handle = {
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || run_worker(context, queue, shared, init_tx))
                .map_err(WorkerError::ThreadSpawn)?
        };
        let thread_id = handle.thread().id();

        match init_rx.recv_timeout(config.init_timeout()) {
            Ok(Ok(info)) => {
                log::info!("GPU worker thread initialized successfully - {info}");
            }
            Ok(Err(reason)) => {
                log::error!("GPU worker thread failed to initialize: {reason}");
                if handle.join().is_err() {
                    log::debug!("GPU worker thread panicked after failing to initialize");
                }
                return Err(WorkerError::InitializationFailed(reason));
            }
            Err(RecvTimeoutError::Timeout) => {
                log::error!(
                    "GPU worker thread failed to initialize within {:?}",
                    config.init_timeout()
                );
                // The thread exits on its own once it sees the shutdown; it is not joined.
                queue.shutdown();
                return Err(WorkerError::InitializationTimeout(config.init_timeout()));
            }
            Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    log::debug!("GPU worker thread panicked before signalling readiness");
                }
                return Err(WorkerError::InitializationFailed(
                    "worker thread exited before signalling readiness".to_string(),
                ));
            }
        }

        let loader = AsyncAssetLoader::new(
            registry,
            Arc::clone(&queue),
            Arc::clone(&device),
            config.cpu_phase_delay(),
        );

        Ok(Self {
            config,
            queue,
            shared,
            loader,
            context_id,
            device,
            thread_id,
            handle: Some(handle),
        })
    }

    /// Queues `job` for execution on the worker thread.
    ///
    /// Callable from any thread. Empty jobs and jobs submitted after
    /// [`stop`](Self::stop) are rejected; the worker is unaffected.
    pub fn add_job(&self, job: Job) -> Result<(), WorkerError> {
        if job.is_empty() {
            log::warn!("Attempted to add an empty job");
            return Err(WorkerError::EmptyJob);
        }
        self.queue.push(job).map_err(|_| WorkerError::ShuttingDown)
    }

    /// Starts loading the model at `path` into `asset` and returns immediately.
    ///
    /// Readiness is observed by polling [`SharedAsset::is_ready`] or
    /// [`SharedAsset::status`]. If the same asset is requested again before
    /// this load finishes, the later request wins.
    pub fn async_load_model(&self, asset: &SharedAsset<GpuModel>, path: impl AsRef<Path>) {
        self.loader.request_load(asset, path.as_ref());
    }

    /// Stops accepting jobs. Already queued jobs still run.
    ///
    /// Idempotent. The thread is joined when the worker is dropped.
    pub fn stop(&self) {
        if self.queue.shutdown() {
            log::info!("Stopping GPU worker ({} job(s) left to drain)", self.queue.len());
            if self.shared.state() == WorkerState::Running {
                self.shared.set_state(WorkerState::Draining);
            }
        }
    }

    /// Number of queued jobs. An eventually consistent snapshot.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` while the worker accepts and executes jobs.
    pub fn is_running(&self) -> bool {
        !self.queue.is_shut_down() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// The current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Identity of the worker thread.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Identity of the worker's context.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// The command interface jobs should use.
    pub fn device(&self) -> Arc<dyn GpuDevice> {
        Arc::clone(&self.device)
    }

    /// The loader behind [`async_load_model`](Self::async_load_model).
    pub fn loader(&self) -> &AsyncAssetLoader {
        &self.loader
    }

    /// Jobs that ran to completion.
    pub fn jobs_completed(&self) -> u64 {
        self.shared.jobs_completed.load(Ordering::Relaxed)
    }

    /// Jobs that panicked.
    pub fn jobs_panicked(&self) -> u64 {
        self.shared.jobs_panicked.load(Ordering::Relaxed)
    }

    /// The configuration the worker was built with.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

impl fmt::Debug for RenderContextWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContextWorker")
            .field("config", &self.config)
            .field("context_id", &self.context_id)
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}

impl Drop for RenderContextWorker {
    fn drop(&mut self) {
        self.stop();
        self.loader.join_all();

        let Some(handle) = self.handle.take() else {
            return;
        };
        if thread::current().id() == self.thread_id {
            log::error!("GPU worker dropped from its own thread; not joining");
            return;
        }
        if handle.join().is_err() {
            log::error!("GPU worker thread panicked");
        }
        log::info!("GPU worker destroyed");
    }
}

/// Compares driver strings of both contexts. Advisory: a mismatch only warns.
fn verify_sharing(primary: &dyn GraphicsContext, worker: &dyn GraphicsContext) {
    log::info!("Verifying context sharing...");
    let primary_was_current = primary.is_current();

    let primary_info = query_info(primary);
    let worker_info = query_info(worker);
    if let Err(e) = worker.make_not_current() {
        log::debug!("Could not release worker context after verification: {e}");
    }
    if primary_was_current {
        if let Err(e) = primary.make_current() {
            log::warn!("Could not restore the primary context: {e}");
        }
    } else if primary.is_current() {
        if let Err(e) = primary.make_not_current() {
            log::debug!("Could not release the primary context after verification: {e}");
        }
    }

    match (primary_info, worker_info) {
        (Some(main), Some(worker)) => {
            log::info!("Main context: {} - {}", main.vendor, main.version);
            log::info!("Worker context: {} - {}", worker.vendor, worker.version);
            if main.version != worker.version || main.vendor != worker.vendor {
                log::warn!(
                    "Context version/vendor mismatch - sharing may not work properly"
                );
            } else {
                log::info!("Context sharing verified successfully");
            }
        }
        _ => log::warn!("Could not query both contexts; context sharing is unverified"),
    }
}

fn query_info(context: &dyn GraphicsContext) -> Option<ContextInfo> {
    let result = context.make_current().and_then(|()| context.info());
    match result {
        Ok(info) => Some(info),
        Err(e) => {
            log::debug!("Could not query {}: {e}", context.id());
            None
        }
    }
}

type InitSignal = crossbeam_channel::Sender<Result<ContextInfo, String>>;

fn run_worker(
    context: Box<dyn GraphicsContext>,
    queue: Arc<JobQueue>,
    shared: Arc<Shared>,
    init_tx: InitSignal,
) {
    let info = match initialize(context.as_ref()) {
        Ok(info) => info,
        Err(reason) => {
            shared.set_state(WorkerState::Stopped);
            if let Err(e) = init_tx.send(Err(reason)) {
                log::debug!("Nobody is waiting for the worker anymore: {:?}", e.into_inner());
            }
            return;
        }
    };
    shared.set_state(WorkerState::Running);
    if init_tx.send(Ok(info)).is_err() {
        // The constructor timed out and shut the queue down; the loop below exits at once.
        log::debug!("Worker owner stopped waiting for initialization");
    }
    drop(init_tx);

    log::info!("GPU worker thread started on {:?}", thread::current().id());

    while let Some(job) = queue.pop() {
        let label = job.label().to_string();
        match job.execute() {
            JobOutcome::Completed => {
                shared.jobs_completed.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Panicked(message) => {
                shared.jobs_panicked.fetch_add(1, Ordering::Relaxed);
                log::error!("Exception in job execution ('{label}'): {message}");
            }
            JobOutcome::Empty => {}
        }
    }

    if let Err(e) = context.make_not_current() {
        log::debug!("Worker context was not current at exit: {e}");
    }
    shared.set_state(WorkerState::Stopped);
    log::info!("GPU worker thread exiting");
}

/// Makes the context current on this thread and checks that it can create objects.
fn initialize(context: &dyn GraphicsContext) -> Result<ContextInfo, String> {
    context
        .make_current()
        .map_err(|e| format!("could not make worker context current: {e}"))?;
    let info = context
        .info()
        .map_err(|e| format!("could not query worker context: {e}"))?;

    let device = context.device();
    while device.take_error().is_some() {}
    let probe = device
        .create_vertex_array(&[], None, None)
        .map_err(|e| format!("OpenGL functionality test failed: {e}"))?;
    if let Err(e) = device.delete_vertex_array(probe) {
        log::debug!("Could not delete the test vertex array {probe:?}: {e}");
    }
    if let Some(code) = device.take_error() {
        return Err(format!(
            "OpenGL functionality test raised error 0x{code:04X}"
        ));
    }
    Ok(info)
}
