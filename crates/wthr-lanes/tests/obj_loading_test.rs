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

use anyhow::Result;
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wthr_core::asset::TextureKind;
use wthr_lanes::asset_lane::{ModelLoaderLane, ModelLoaderRegistry, ObjLoaderLane};

const QUAD_OBJ: &str = "\
mtllib quad.mtl
o First
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
o Second
v 0 0 1
v 1 0 1
v 1 1 1
usemtl brick
f 5/1/1 6/2/1 7/3/1
";

const QUAD_MTL: &str = "\
newmtl brick
map_Kd brick.png
map_Ks missing_specular.png
";

fn write_fixture(dir: &Path, with_mtl: bool) -> Result<std::path::PathBuf> {
    let obj = dir.join("quad.obj");
    fs::write(&obj, QUAD_OBJ)?;
    if with_mtl {
        fs::write(dir.join("quad.mtl"), QUAD_MTL)?;
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([200, 10, 10, 255]));
        img.save(dir.join("brick.png"))?;
    }
    Ok(obj)
}

#[test]
fn loads_meshes_materials_and_tangents() -> Result<()> {
    let dir = tempdir()?;
    let obj = write_fixture(dir.path(), true)?;

    let model = ObjLoaderLane::default().load_model(&obj)?;

    assert_eq!(model.source, obj);
    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.meshes[0].name, "First");
    assert_eq!(model.meshes[0].vertices.len(), 4);
    assert_eq!(model.meshes[0].indices.len(), 6);
    assert_eq!(model.meshes[1].indices.len(), 3);

    // One decoded texture shared by both meshes; the missing specular map is skipped.
    assert_eq!(model.textures.len(), 1);
    assert_eq!(model.textures[0].kind, TextureKind::Diffuse);
    assert_eq!(model.textures[0].image.width, 2);
    assert_eq!(model.meshes[0].textures, vec![0]);
    assert_eq!(model.meshes[1].textures, vec![0]);

    let v = model.meshes[0].vertices[1];
    assert_eq!(v.normal, [0.0, 0.0, 1.0]);
    assert!((v.tangent[0] - 1.0).abs() < 1e-5);
    Ok(())
}

#[test]
fn missing_material_library_keeps_geometry() -> Result<()> {
    let dir = tempdir()?;
    let obj = write_fixture(dir.path(), false)?;

    let model = ObjLoaderLane::default().load_model(&obj)?;
    assert_eq!(model.meshes.len(), 2);
    assert!(model.textures.is_empty());
    assert!(model.meshes.iter().all(|m| m.textures.is_empty()));
    Ok(())
}

#[test]
fn nonexistent_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = ObjLoaderLane::default()
        .load_model(&dir.path().join("nonexistent.obj"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("nonexistent.obj"));
}

#[test]
fn file_without_faces_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let obj = dir.path().join("empty.obj");
    fs::write(&obj, "# nothing here\n")?;
    assert!(ObjLoaderLane::default().load_model(&obj).is_err());
    Ok(())
}

#[test]
fn registry_routes_obj_paths() -> Result<()> {
    let dir = tempdir()?;
    let obj = write_fixture(dir.path(), true)?;
    let model = ModelLoaderRegistry::default().load(&obj)?;
    assert_eq!(model.vertex_count(), 7);
    Ok(())
}
