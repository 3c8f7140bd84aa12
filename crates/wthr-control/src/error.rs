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
use thiserror::Error;
use wthr_core::renderer::ContextError;

/// Errors reported by the [`RenderContextWorker`](crate::RenderContextWorker).
///
/// The first four variants are returned from construction and mean the worker
/// does not exist. The last two reject a single job; the worker keeps running.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The secondary context could not be created.
    #[error("failed to create the worker context: {0}")]
    ContextCreation(#[source] ContextError),

    /// The worker thread could not make its context current or the capability
    /// probe failed.
    #[error("worker thread failed to initialize: {0}")]
    InitializationFailed(String),

    /// The worker thread did not report readiness in time.
    #[error("worker thread did not initialize within {0:?}")]
    InitializationTimeout(Duration),

    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn the worker thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// An empty job was submitted.
    #[error("attempted to add an empty job")]
    EmptyJob,

    /// A job was submitted after shutdown was requested.
    #[error("job rejected: the worker is shutting down")]
    ShuttingDown,
}

impl WorkerError {
    /// Returns `true` for errors that abort worker construction.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkerError::EmptyJob | WorkerError::ShuttingDown)
    }
}
