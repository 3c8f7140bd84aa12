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

use std::sync::Arc;
use wthr_core::asset::{Drawable, ModelData};
use wthr_core::renderer::{ContextAttributes, GpuDevice, GraphicsContext, ResourceError};
use wthr_core::scene::PrimitiveShape;
use wthr_infra::{HeadlessDisplay, HeadlessOptions};
use wthr_lanes::upload_lane::ModelUploadLane;

fn pyramid() -> ModelData {
    PrimitiveShape::Pyramid {
        base: 1.0,
        height: 1.0,
    }
    .model_data()
}

#[test]
fn upload_requires_a_current_context() {
    let display = HeadlessDisplay::default();
    let device: Arc<dyn GpuDevice> = display.device();
    let err = ModelUploadLane::default()
        .upload(&device, &pyramid())
        .unwrap_err();
    assert_eq!(err, ResourceError::NoCurrentContext);
}

#[test]
fn model_uploaded_on_worker_draws_in_both_contexts() {
    let display = HeadlessDisplay::default();
    let device: Arc<dyn GpuDevice> = display.device();
    let main = display.create_context(&ContextAttributes::default()).unwrap();
    let worker = main
        .create_shared_context(&ContextAttributes::default())
        .unwrap();

    worker.make_current().unwrap();
    let model = ModelUploadLane::default().upload(&device, &pyramid()).unwrap();
    assert_eq!(model.index_count(), 18);
    model.draw(device.as_ref()).unwrap();

    main.make_current().unwrap();
    model.draw(device.as_ref()).unwrap();
    model.draw(device.as_ref()).unwrap();

    let mesh = &model.meshes()[0];
    assert_eq!(mesh.vertex_array_count(), 2);
    assert!(mesh.vertex_array(main.id()).is_some());
    assert_eq!(display.device().stats().draw_calls, 3);

    assert_eq!(main.live_buffers(), 2);
    drop(model);
    assert_eq!(main.live_buffers(), 0);
    assert_eq!(main.live_vertex_arrays(), 0);
}

#[test]
fn failed_upload_releases_partial_objects() {
    let display = HeadlessDisplay::new(HeadlessOptions {
        max_buffer_bytes: Some(64),
        ..Default::default()
    });
    let device: Arc<dyn GpuDevice> = display.device();
    let ctx = display.create_context(&ContextAttributes::default()).unwrap();
    ctx.make_current().unwrap();

    // 5 vertices of 56 bytes do not fit in 64 bytes.
    let err = ModelUploadLane::default()
        .upload(&device, &pyramid())
        .unwrap_err();
    assert_eq!(err, ResourceError::OutOfMemory);
    assert_eq!(ctx.live_buffers(), 0);
    assert!(device.take_error().is_some());
}

#[test]
fn empty_model_is_rejected() {
    let display = HeadlessDisplay::default();
    let device: Arc<dyn GpuDevice> = display.device();
    let ctx = display.create_context(&ContextAttributes::default()).unwrap();
    ctx.make_current().unwrap();

    let err = ModelUploadLane::default()
        .upload(&device, &ModelData::default())
        .unwrap_err();
    assert!(matches!(err, ResourceError::InvalidData(_)));
}
