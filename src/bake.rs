//! The bake pipeline: build the joint hierarchy, resolve bind poses, sample
//! the active clip, then render the document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::bind_pose::resolve_bind_poses;
use crate::error::Result;
use crate::file_formats::animationfile::AnimationFile;
use crate::sampling::{sample_clip, AnimationClip, ClipInfo};
use crate::scene_graph::SceneGraph;
use crate::skeleton::{build_skeleton, Skeleton};

/// State threaded through the stages of one bake.
pub struct BakeContext<'a, S: SceneGraph> {
    scene: &'a S,
    skeleton: Skeleton<S::Node>,
    clip: Option<ClipInfo>,
}

impl<'a, S: SceneGraph> BakeContext<'a, S> {
    pub fn new(scene: &'a S) -> Self {
        Self {
            scene,
            skeleton: Skeleton::default(),
            clip: None,
        }
    }

    pub fn skeleton(&self) -> &Skeleton<S::Node> {
        &self.skeleton
    }

    pub fn build_hierarchy(&mut self) {
        self.skeleton = build_skeleton(self.scene);
    }

    pub fn resolve_bind_poses(&mut self) -> Result<()> {
        self.clip = resolve_bind_poses(self.scene, &mut self.skeleton)?;
        Ok(())
    }

    /// Samples the clip found while resolving bind poses. Without any bound
    /// joint no clip was looked up and an empty placeholder is returned.
    pub fn sample(&self) -> AnimationClip {
        match &self.clip {
            Some(info) => sample_clip(self.scene, &self.skeleton, info),
            None => AnimationClip::empty(),
        }
    }

    pub fn run(mut self) -> Result<AnimationFile> {
        self.build_hierarchy();
        if self.skeleton.is_empty() {
            log::warn!("scene has no skeleton, baking an empty document");
            return Ok(AnimationFile::from_model(&self.skeleton, &AnimationClip::empty()));
        }
        self.resolve_bind_poses()?;
        let clip = self.sample();
        Ok(AnimationFile::from_model(&self.skeleton, &clip))
    }
}

pub fn bake_scene<S: SceneGraph>(scene: &S) -> Result<AnimationFile> {
    BakeContext::new(scene).run()
}

/// Bakes `scene` and writes the document to `path`. Nothing is created on
/// disk unless the bake succeeds.
pub fn bake_to_path<S: SceneGraph>(scene: &S, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = bake_scene(scene)?.to_json()?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}
