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

//! Shared fixtures for the worker integration tests.

#![allow(dead_code)]

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use wthr_core::renderer::ContextAttributes;
use wthr_infra::{HeadlessContext, HeadlessDisplay, HeadlessOptions};

/// Upper bound for anything a test waits on.
pub const DEADLINE: Duration = Duration::from_secs(5);

struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: parking_lot::const_mutex(Vec::new()),
};
static INIT: Once = Once::new();

/// Installs the capturing logger for this test binary.
pub fn capture_logs() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("logger already installed");
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Returns `true` if a record at `level` containing every fragment was logged.
pub fn logged(level: Level, fragments: &[&str]) -> bool {
    LOGGER
        .records
        .lock()
        .iter()
        .any(|(l, msg)| *l == level && fragments.iter().all(|f| msg.contains(f)))
}

/// Polls `condition` until it holds or [`DEADLINE`] passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A display plus its primary context, current on the calling thread.
pub fn primary(options: HeadlessOptions) -> (HeadlessDisplay, HeadlessContext) {
    primary_with(options, &ContextAttributes::default())
}

/// Like [`primary`], with explicit creation hints for the primary context.
pub fn primary_with(
    options: HeadlessOptions,
    attributes: &ContextAttributes,
) -> (HeadlessDisplay, HeadlessContext) {
    use wthr_core::renderer::GraphicsContext;

    let display = HeadlessDisplay::new(options);
    let context = display.create_context(attributes).expect("primary context");
    context.make_current().expect("make primary current");
    (display, context)
}

/// Writes a triangle OBJ named `name` with `extra` additional triangles.
pub fn write_obj(dir: &Path, name: &str, extra: usize) -> PathBuf {
    let mut source = String::from("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    for i in 0..extra {
        let base = 4 + i * 3;
        source.push_str(&format!(
            "v 0 0 {z}\nv 1 0 {z}\nv 0 1 {z}\nf {} {} {}\n",
            base,
            base + 1,
            base + 2,
            z = i + 1
        ));
    }
    let path = dir.join(name);
    std::fs::write(&path, source).expect("write obj fixture");
    path
}
