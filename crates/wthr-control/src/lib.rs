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

//! # WTHR Control
//!
//! Background GPU work for the render loop.
//!
//! A [`RenderContextWorker`] owns a graphics context that shares its object
//! namespace with the application's primary context. It runs a dedicated
//! thread that keeps that context current and executes [`Job`]s pulled from a
//! FIFO [`JobQueue`]. The [`AsyncAssetLoader`] builds on top of it: it parses
//! model files on short-lived CPU threads, then queues the GPU upload on the
//! worker and publishes the result into a [`SharedAsset`](wthr_core::SharedAsset).

#![warn(missing_docs)]

mod config;
mod error;
mod job;
mod loader;
mod worker;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use job::{Job, JobOutcome, JobQueue};
pub use loader::AsyncAssetLoader;
pub use worker::{RenderContextWorker, WorkerState};
