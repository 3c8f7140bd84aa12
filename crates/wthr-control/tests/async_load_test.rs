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

mod common;

use anyhow::Result;
use common::{capture_logs, logged, primary, wait_until, write_obj};
use log::Level;
use std::path::PathBuf;
use tempfile::tempdir;
use wthr_control::{RenderContextWorker, WorkerConfig};
use wthr_core::asset::{AssetStatus, SharedAsset};
use wthr_infra::HeadlessOptions;
use wthr_lanes::upload_lane::GpuModel;

fn source_of(asset: &SharedAsset<GpuModel>) -> Option<PathBuf> {
    asset.with(|m| m.source().to_path_buf())
}

fn settled(asset: &SharedAsset<GpuModel>) -> bool {
    matches!(asset.status(), AssetStatus::Ready | AssetStatus::Failed)
}

#[test]
fn valid_model_becomes_ready_and_draws() -> Result<()> {
    let dir = tempdir()?;
    let path = write_obj(dir.path(), "valid_model.obj", 1);
    let (display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);

    assert!(wait_until(|| asset.is_ready()));
    assert_eq!(asset.status(), AssetStatus::Ready);
    assert_eq!(asset.with(|m| m.index_count()), Some(6));
    assert!(asset.draw(&*display.device()));
    assert_eq!(display.device().stats().draw_calls, 1);
    Ok(())
}

#[test]
fn nonexistent_path_fails_without_crashing() -> Result<()> {
    capture_logs();
    let dir = tempdir()?;
    let path = dir.path().join("nonexistent_path.obj");
    let (display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);

    assert!(wait_until(|| settled(&asset)));
    assert_eq!(asset.status(), AssetStatus::Failed);
    assert!(!asset.is_ready());
    assert!(!asset.draw(&*display.device()));
    assert!(logged(
        Level::Error,
        &["Failed to load model", &path.display().to_string()]
    ));
    assert!(worker.is_running());
    Ok(())
}

#[test]
fn concurrent_loads_of_different_assets_do_not_mix() -> Result<()> {
    let dir = tempdir()?;
    let small = write_obj(dir.path(), "small.obj", 0);
    let large = write_obj(dir.path(), "large.obj", 4);
    let (_display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let a = SharedAsset::<GpuModel>::new();
    let b = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&a, &small);
    worker.async_load_model(&b, &large);

    assert!(wait_until(|| a.is_ready() && b.is_ready()));
    assert_eq!(source_of(&a), Some(small));
    assert_eq!(source_of(&b), Some(large));
    assert_eq!(a.with(|m| m.index_count()), Some(3));
    assert_eq!(b.with(|m| m.index_count()), Some(15));
    Ok(())
}

#[test]
fn second_request_for_same_asset_wins() -> Result<()> {
    capture_logs();
    let dir = tempdir()?;
    let first = write_obj(dir.path(), "race_first.obj", 0);
    let second = write_obj(dir.path(), "race_second.obj", 2);
    let (display, main) = primary(HeadlessOptions::default());
    let config = WorkerConfig {
        cpu_phase_delay_ms: 30,
        ..Default::default()
    };
    let worker = RenderContextWorker::new(&main, config)?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &first);
    worker.async_load_model(&asset, &second);

    assert!(wait_until(|| asset.is_ready()));
    assert!(wait_until(|| worker.loader().in_flight() == 0));
    assert_eq!(source_of(&asset), Some(second));
    assert!(asset.draw(&*display.device()));
    assert!(logged(Level::Debug, &["superseded", "race_first.obj"]));
    Ok(())
}

#[test]
fn empty_path_is_rejected_immediately() -> Result<()> {
    capture_logs();
    let (_display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, "");
    assert_eq!(asset.status(), AssetStatus::Failed);
    assert_eq!(worker.loader().in_flight(), 0);
    assert!(logged(Level::Error, &["Empty path"]));
    Ok(())
}

#[test]
fn load_requested_after_stop_fails() -> Result<()> {
    let dir = tempdir()?;
    let path = write_obj(dir.path(), "after_stop.obj", 0);
    let (_display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    worker.stop();
    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);
    assert!(wait_until(|| settled(&asset)));
    assert_eq!(asset.status(), AssetStatus::Failed);
    Ok(())
}

#[test]
fn shutdown_waits_for_loader_threads() -> Result<()> {
    capture_logs();
    let dir = tempdir()?;
    let path = write_obj(dir.path(), "in_flight_at_shutdown.obj", 0);
    let (_display, main) = primary(HeadlessOptions::default());
    let config = WorkerConfig {
        cpu_phase_delay_ms: 100,
        ..Default::default()
    };
    let worker = RenderContextWorker::new(&main, config)?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);
    assert_eq!(worker.loader().in_flight(), 1);
    assert_eq!(asset.status(), AssetStatus::Loading);

    // The loader thread finishes parsing after the queue closed.
    drop(worker);
    assert_eq!(asset.status(), AssetStatus::Failed);
    assert!(logged(
        Level::Error,
        &["rejected", "in_flight_at_shutdown.obj"]
    ));
    Ok(())
}

#[test]
fn upload_failure_marks_asset_failed() -> Result<()> {
    capture_logs();
    let dir = tempdir()?;
    let path = write_obj(dir.path(), "too_big.obj", 10);
    let (_display, main) = primary(HeadlessOptions {
        max_buffer_bytes: Some(128),
        ..Default::default()
    });
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);
    assert!(wait_until(|| settled(&asset)));
    assert_eq!(asset.status(), AssetStatus::Failed);
    assert!(logged(Level::Error, &["Failed to upload model", "too_big.obj"]));
    assert!(logged(Level::Error, &["Graphics error 0x0505"]));
    Ok(())
}

#[test]
fn unshared_namespace_loads_but_cannot_draw() -> Result<()> {
    let dir = tempdir()?;
    let path = write_obj(dir.path(), "isolated.obj", 0);
    let (display, main) = primary(HeadlessOptions {
        share_objects: false,
        ..Default::default()
    });
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &path);
    assert!(wait_until(|| asset.is_ready()));
    // The buffers live in the worker's namespace only.
    assert!(!asset.draw(&*display.device()));
    Ok(())
}

#[test]
fn reloading_replaces_previous_model() -> Result<()> {
    let dir = tempdir()?;
    let first = write_obj(dir.path(), "reload_a.obj", 0);
    let second = write_obj(dir.path(), "reload_b.obj", 1);
    let (_display, main) = primary(HeadlessOptions::default());
    let worker = RenderContextWorker::new(&main, WorkerConfig::default())?;

    let asset = SharedAsset::<GpuModel>::new();
    worker.async_load_model(&asset, &first);
    assert!(wait_until(|| asset.is_ready()));

    worker.async_load_model(&asset, &second);
    assert!(wait_until(|| source_of(&asset).as_deref() == Some(second.as_path())));
    // The first model's buffers were released when the slot was reset.
    assert!(wait_until(|| main.live_buffers() == 2));
    Ok(())
}
