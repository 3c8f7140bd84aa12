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

// WTHR Sandbox
// Drives a ModelScene against the headless backend until every load settles.
//
// Usage: sandbox [--config worker.toml] [--frames N] [--save scene.json] [MODEL...]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use wthr_sdk::prelude::*;

const FRAME_TIME: Duration = Duration::from_millis(16);

const DEMO_OBJ: &str = "\
o Quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

/// Headless sandbox loading models through the background GPU worker.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Worker configuration (TOML).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
    /// Stop after this many frames even if loads are still pending.
    #[arg(short = 'f', long = "frames")]
    frames: Option<u32>,
    /// Save the scene as JSON before exiting.
    #[arg(short = 's', long = "save")]
    save: Option<PathBuf>,
    /// OBJ files to load; a generated quad when empty.
    models: Vec<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<WorkerConfig> {
    let Some(path) = path else {
        return Ok(WorkerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config '{}'", path.display()))?;
    WorkerConfig::from_toml_str(&text)
        .with_context(|| format!("Invalid worker config '{}'", path.display()))
}

fn demo_model() -> Result<PathBuf> {
    let path = std::env::temp_dir().join("wthr-sandbox-quad.obj");
    std::fs::write(&path, DEMO_OBJ)
        .with_context(|| format!("Failed to write demo model '{}'", path.display()))?;
    Ok(path)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    log::info!("Worker config: {config:?}");

    let display = HeadlessDisplay::new(HeadlessOptions::default());
    let primary = display.create_context(&ContextAttributes {
        visible: true,
        ..Default::default()
    })?;
    primary.make_current()?;
    log::info!("Primary context: {}", primary.info()?);

    let mut scene = ModelScene::new(&primary, config)?;

    let models = if args.models.is_empty() {
        vec![demo_model()?]
    } else {
        args.models
    };
    for (i, path) in models.iter().enumerate() {
        scene.spawn_model(path, Transform::from_position([i as f32 * 3.0, 0.0, -5.0]));
    }
    let grid = scene.spawn_cube_grid(3, 3, 1, [-5.0, 0.0, 0.0]);
    scene.spawn_shape(
        PrimitiveShape::Pyramid {
            base: 1.0,
            height: 1.5,
        },
        Transform::from_position([0.0, 3.0, 0.0]),
    );
    log::info!(
        "Spawned {} entities ({} in cube grid)",
        scene.len(),
        scene.group_members(grid).len()
    );

    let started = Instant::now();
    let mut frame = 0u32;
    let stats = loop {
        let stats = scene.render();
        frame += 1;
        if stats.pending == 0 || args.frames.is_some_and(|max| frame >= max) {
            break stats;
        }
        std::thread::sleep(FRAME_TIME);
    };

    log::info!(
        "Frame {frame} after {:?}: {} drawn, {} pending, {} failed",
        started.elapsed(),
        stats.drawn,
        stats.pending,
        stats.failed
    );
    let device = display.device().stats();
    log::info!(
        "Device: {} draw call(s), {} buffer(s), {} texture(s) created",
        device.draw_calls,
        device.buffers_created,
        device.textures_created
    );
    log::info!(
        "Worker ran {} job(s), {} panicked",
        scene.worker().jobs_completed(),
        scene.worker().jobs_panicked()
    );

    if let Some(path) = &args.save {
        scene.save(path)?;
    }
    Ok(())
}
