use std::path::{Path, PathBuf};

pub mod bake;
pub mod bind_pose;
pub mod channel;
pub mod config;
pub mod error;
pub mod file_formats;
pub mod gltf_scene;
pub mod gltf_utils;
pub mod memory_scene;
pub mod mesh_export;
pub mod sampling;
pub mod scene_graph;
pub mod skeleton;

pub use bake::{bake_scene, bake_to_path, BakeContext};
pub use config::BakeConfig;
pub use error::{BakeError, Result};
pub use gltf_scene::{GltfNode, GltfScene};
pub use memory_scene::{MemoryScene, NodeId};
pub use mesh_export::{bake_mesh_to_path, extract_mesh};
pub use scene_graph::{Cluster, GeometricOffset, NodeAttribute, SceneGraph, Skin, TimeSpan};
pub use skeleton::{Joint, Skeleton};

pub fn strip_extension(path: &Path) -> PathBuf {
    let stem = path.file_stem();

    match (path.parent(), stem) {
        (Some(parent), Some(stem)) => parent.join(stem),
        (None, Some(stem)) => PathBuf::from(stem),
        _ => path.to_path_buf(),
    }
}

/// Appends `suffix` to the file stem of `path`, dropping its extension.
/// `assets/walk.glb` + `animData.json` becomes `assets/walkanimData.json`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut stripped = strip_extension(path).into_os_string();
    stripped.push(suffix);
    PathBuf::from(stripped)
}
