use glam::Mat4;

use crate::error::{BakeError, Result};
use crate::scene_graph::{SceneGraph, TimeSpan};
use crate::skeleton::Skeleton;

/// Name and frame range of the clip being baked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInfo {
    pub name: String,
    pub span: TimeSpan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    pub frame: i64,
    pub global_transform: Mat4,
}

/// Keyframes of one joint, strictly increasing by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrack {
    pub joint: usize,
    pub keyframes: Vec<KeyFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub length_in_frames: i64,
    /// One track per bound joint, in joint order
    pub tracks: Vec<JointTrack>,
}

impl AnimationClip {
    /// Placeholder clip for scenes with nothing to sample.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            length_in_frames: 0,
            tracks: vec![],
        }
    }

    pub fn track(&self, joint: usize) -> Option<&JointTrack> {
        self.tracks.iter().find(|track| track.joint == joint)
    }
}

/// The first declared animation stack and its take span. Any further stacks
/// are ignored.
pub fn active_clip<S: SceneGraph>(scene: &S) -> Result<ClipInfo> {
    let stacks = scene.animation_stacks();
    let name = stacks
        .first()
        .ok_or_else(|| BakeError::NoAnimationClip("scene declares no animation stack".to_string()))?;
    if stacks.len() > 1 {
        log::debug!(
            "scene declares {} animation stacks, using '{}' only",
            stacks.len(),
            name
        );
    }

    let span = scene
        .take_info(name)
        .ok_or_else(|| BakeError::NoAnimationClip(format!("no take info for stack '{}'", name)))?;
    if !span.is_valid() {
        return Err(BakeError::InvalidTimeSpan {
            clip: name.clone(),
            start: span.start,
            stop: span.stop,
        });
    }

    Ok(ClipInfo {
        name: name.clone(),
        span,
    })
}

/// Samples every bound joint at every frame of `clip`, expressed relative to
/// the placement of the mesh it was bound through. Unbound joints get no
/// track.
pub fn sample_clip<S: SceneGraph>(
    scene: &S,
    skeleton: &Skeleton<S::Node>,
    clip: &ClipInfo,
) -> AnimationClip {
    let length_in_frames = clip.span.length_in_frames();
    let bound: Vec<_> = skeleton
        .joints()
        .iter()
        .enumerate()
        .filter_map(|(index, joint)| joint.binding.map(|binding| (index, binding)))
        .collect();

    let mut tracks: Vec<JointTrack> = bound
        .iter()
        .map(|(index, _)| JointTrack {
            joint: *index,
            keyframes: Vec::with_capacity(length_in_frames as usize),
        })
        .collect();

    for frame in clip.span.frames() {
        for (track, (_, binding)) in tracks.iter_mut().zip(&bound) {
            let mesh_offset =
                scene.evaluate_global_transform(binding.mesh, frame) * binding.geometric_offset;
            let joint_world = scene.evaluate_global_transform(binding.node, frame);
            track.keyframes.push(KeyFrame {
                frame,
                global_transform: mesh_offset.inverse() * joint_world,
            });
        }
    }

    log::info!(
        "sampled clip '{}' over frames {}..={} for {} joints",
        clip.name,
        clip.span.start,
        clip.span.stop,
        tracks.len()
    );

    AnimationClip {
        name: clip.name.clone(),
        length_in_frames,
        tracks,
    }
}
