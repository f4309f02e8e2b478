//! The baked skeleton + animation document.
//!
//! Matrices are written as 16 floats in row-major order. glam stores them
//! column-major, so every matrix goes through [`row_major`] on the way out and
//! [`from_row_major`] on the way back in.

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sampling::AnimationClip;
use crate::skeleton::Skeleton;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointEntry {
    pub id: usize,
    pub name: String,
    /// -1 for the root joint
    pub parent: i64,
    pub mat: [f32; 16],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkeletonSection {
    pub count: usize,
    pub joint: Vec<JointEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub num: i64,
    pub mat: [f32; 16],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackEntry {
    pub id: usize,
    pub name: String,
    pub frame: Vec<FrameEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipEntry {
    pub name: String,
    #[serde(rename = "animationLength")]
    pub animation_length: i64,
    pub track: Vec<TrackEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnimationFile {
    pub skeleton: SkeletonSection,
    /// Always exactly one clip
    pub animation: Vec<ClipEntry>,
}

pub fn row_major(m: &Mat4) -> [f32; 16] {
    m.transpose().to_cols_array()
}

pub fn from_row_major(a: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(a).transpose()
}

impl AnimationFile {
    pub fn from_model<N>(skeleton: &Skeleton<N>, clip: &AnimationClip) -> Self {
        let joints = skeleton.joints();

        let joint = joints
            .iter()
            .enumerate()
            .map(|(id, joint)| JointEntry {
                id,
                name: joint.name.clone(),
                parent: joint.parent_index(),
                mat: row_major(&joint.bind_pose_inverse),
            })
            .collect();

        let track = clip
            .tracks
            .iter()
            .filter(|track| !track.keyframes.is_empty())
            .map(|track| TrackEntry {
                id: track.joint,
                name: joints
                    .get(track.joint)
                    .map(|joint| joint.name.clone())
                    .unwrap_or_default(),
                frame: track
                    .keyframes
                    .iter()
                    .map(|key| FrameEntry {
                        num: key.frame,
                        mat: row_major(&key.global_transform),
                    })
                    .collect(),
            })
            .collect();

        Self {
            skeleton: SkeletonSection {
                count: joints.len(),
                joint,
            },
            animation: vec![ClipEntry {
                name: clip.name.clone(),
                animation_length: clip.length_in_frames,
                track,
            }],
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Renders the skeleton and its single clip as a pretty-printed JSON document.
pub fn serialize<N>(skeleton: &Skeleton<N>, clip: &AnimationClip) -> Result<String> {
    AnimationFile::from_model(skeleton, clip).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind_pose::resolve_bind_poses;
    use crate::memory_scene::{MemoryScene, NodeId};
    use crate::sampling::sample_clip;
    use crate::scene_graph::{NodeAttribute, SceneGraph, TimeSpan};
    use crate::skeleton::build_skeleton;
    use glam::{Quat, Vec3};
    use pretty_assertions::assert_eq;

    fn rig() -> (Skeleton<NodeId>, AnimationClip) {
        let mut scene = MemoryScene::new();
        let root = scene.root();
        let hips = scene.add_node(root, "hips", NodeAttribute::Skeleton);
        let knee = scene.add_node(hips, "knee", NodeAttribute::Skeleton);
        let mesh = scene.add_node(root, "legs", NodeAttribute::Mesh);
        scene.set_local_transform(knee, Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));
        scene.add_animation_stack("kick", Some(TimeSpan::new(0, 1)));
        scene.set_keyed_local_transform(knee, 1, Mat4::from_rotation_x(0.5));
        let cluster = scene.rest_cluster(mesh, knee);
        scene.add_skin(mesh, vec![cluster]);

        let mut skeleton = build_skeleton(&scene);
        let info = resolve_bind_poses(&scene, &mut skeleton).unwrap().unwrap();
        let clip = sample_clip(&scene, &skeleton, &info);
        (skeleton, clip)
    }

    #[test]
    fn matrices_are_written_row_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let a = row_major(&m);
        assert_eq!(&a[..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&a[4..8], &[0.0, 1.0, 0.0, 2.0]);
        assert_eq!(&a[8..12], &[0.0, 0.0, 1.0, 3.0]);
        assert_eq!(&a[12..], &[0.0, 0.0, 0.0, 1.0]);

        let r = Mat4::from_rotation_translation(Quat::from_rotation_y(0.3), Vec3::X);
        assert_eq!(from_row_major(&row_major(&r)), r);
    }

    #[test]
    fn output_is_deterministic() {
        let (skeleton, clip) = rig();
        assert_eq!(
            serialize(&skeleton, &clip).unwrap(),
            serialize(&skeleton, &clip).unwrap()
        );
    }

    #[test]
    fn document_reads_back() {
        let (skeleton, clip) = rig();
        let text = serialize(&skeleton, &clip).unwrap();
        let file = AnimationFile::from_json(&text).unwrap();

        assert_eq!(file.skeleton.count, 2);
        assert_eq!(file.skeleton.joint[0].parent, -1);
        assert_eq!(file.skeleton.joint[1].parent, 0);
        for (entry, joint) in file.skeleton.joint.iter().zip(skeleton.joints()) {
            assert_eq!(from_row_major(&entry.mat), joint.bind_pose_inverse);
        }

        let animation = &file.animation[0];
        assert_eq!(animation.name, "kick");
        assert_eq!(animation.animation_length, 2);
        assert_eq!(animation.track.len(), 1);
        assert_eq!(animation.track[0].name, "knee");
        let frames: Vec<i64> = animation.track[0].frame.iter().map(|f| f.num).collect();
        assert_eq!(frames, vec![0, 1]);
        let key = &clip.tracks[0].keyframes[1];
        assert_eq!(from_row_major(&animation.track[0].frame[1].mat), key.global_transform);
    }

    #[test]
    fn keys_appear_in_declaration_order() {
        let (skeleton, clip) = rig();
        let text = serialize(&skeleton, &clip).unwrap();
        let position = |key: &str| text.find(key).unwrap();

        assert!(position("\"skeleton\"") < position("\"animation\""));
        assert!(position("\"count\"") < position("\"joint\""));
        assert!(position("\"id\"") < position("\"name\""));
        assert!(position("\"name\"") < position("\"parent\""));
        assert!(position("\"parent\"") < position("\"mat\""));
        assert!(position("\"animationLength\"") < position("\"track\""));
        assert!(position("\"num\"") > position("\"frame\""));
    }

    #[test]
    fn empty_model_still_has_one_clip() {
        let skeleton: Skeleton<NodeId> = Skeleton::default();
        let text = serialize(&skeleton, &AnimationClip::empty()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "skeleton": { "count": 0, "joint": [] },
                "animation": [ { "name": "", "animationLength": 0, "track": [] } ]
            })
        );
    }
}
