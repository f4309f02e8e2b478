//! glTF files exposed through [`SceneGraph`].
//!
//! glTF has no skin clusters or take infos, so they are derived:
//!
//! * every skin joint (and every declared skin skeleton root) is a
//!   [`NodeAttribute::Skeleton`] node, nodes with a mesh are
//!   [`NodeAttribute::Mesh`] nodes;
//! * a skinned mesh node has one skin whose clusters pair the mesh's rest
//!   world transform with the joint's bind world transform, which is that
//!   mesh transform times the inverse of the joint's inverse bind matrix;
//! * each animation is a stack whose take span is the range of its keyframe
//!   times, quantized to frames at the scene frame rate;
//! * transforms are evaluated against the first animation only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};

use crate::channel::Channel;
use crate::error::{BakeError, Result};
use crate::gltf_utils::{read3f32, read4f32, read_index_buffer, read_mat4, read_position_buffer, readf32, transform_to_trs};
use crate::scene_graph::{Cluster, GeometricOffset, NodeAttribute, SceneGraph, Skin, TimeSpan};

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GltfNode {
    /// Synthetic parent of the scene's root nodes
    Root,
    Node(usize),
}

#[derive(Debug)]
struct NodeData {
    name: String,
    parent: Option<usize>,
    children: Vec<usize>,
    /// (translation, rotation, scale)
    rest: (Vec3, Quat, Vec3),
    attribute: NodeAttribute,
    mesh: Option<usize>,
    skin: Option<usize>,
}

#[derive(Debug)]
struct SkinData {
    joints: Vec<usize>,
    inverse_bind_matrices: Vec<Mat4>,
}

#[derive(Debug, Default)]
struct MeshData {
    control_points: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Default)]
struct NodeChannels {
    translation: Option<Channel<Vec3>>,
    rotation: Option<Channel<Quat>>,
    scale: Option<Channel<Vec3>>,
}

#[derive(Debug)]
struct ClipData {
    name: String,
    /// first and last key time in seconds, None without channels
    time_range: Option<(f32, f32)>,
    channels: HashMap<usize, NodeChannels>,
}

#[derive(Debug)]
pub struct GltfScene {
    nodes: Vec<NodeData>,
    roots: Vec<usize>,
    skins: Vec<SkinData>,
    meshes: Vec<MeshData>,
    clips: Vec<ClipData>,
    frame_rate: f64,
}

/// Frame index of a time in seconds. Times within a thousandth of a frame of
/// a whole frame snap to it, anything else truncates.
pub fn seconds_to_frame(seconds: f32, frame_rate: f64) -> i64 {
    let frames = seconds as f64 * frame_rate;
    let nearest = frames.round();
    if (frames - nearest).abs() < 1e-3 {
        nearest as i64
    } else {
        frames.floor() as i64
    }
}

impl GltfScene {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path).map_err(|source| BakeError::Import {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("imported {}", path.display());
        Self::from_document(&document, &buffers)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let (document, buffers, _images) = gltf::import_slice(bytes).map_err(|source| BakeError::Import {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        Self::from_document(&document, &buffers)
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn from_document(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<Self> {
        let mut nodes: Vec<NodeData> = document
            .nodes()
            .map(|node| NodeData {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                parent: None,
                children: node.children().map(|child| child.index()).collect(),
                rest: transform_to_trs(node.transform()),
                attribute: NodeAttribute::Null,
                mesh: node.mesh().map(|mesh| mesh.index()),
                skin: node.skin().map(|skin| skin.index()),
            })
            .collect();

        link_parents(&mut nodes)?;

        let mut skins = Vec::with_capacity(document.skins().len());
        for skin in document.skins() {
            let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
            let inverse_bind_matrices = match skin.inverse_bind_matrices() {
                Some(accessor) => read_mat4(&accessor, buffers)?,
                None => vec![Mat4::IDENTITY; joints.len()],
            };
            if inverse_bind_matrices.len() != joints.len() {
                return Err(BakeError::Accessor {
                    index: skin.inverse_bind_matrices().map_or(0, |a| a.index()),
                    reason: format!(
                        "inverseBindMatrices count ({}) does not match joint count ({}) for skin {}",
                        inverse_bind_matrices.len(),
                        joints.len(),
                        skin.index()
                    ),
                });
            }
            for joint in &joints {
                nodes[*joint].attribute = NodeAttribute::Skeleton;
            }
            if let Some(skeleton_root) = skin.skeleton() {
                nodes[skeleton_root.index()].attribute = NodeAttribute::Skeleton;
            }
            // Exporters often parent the joints under an armature node. The
            // top-level ancestor has to be skeletal for the rig to be found.
            if let Some(mut top) = joints.first().copied() {
                while let Some(parent) = nodes[top].parent {
                    top = parent;
                }
                nodes[top].attribute = NodeAttribute::Skeleton;
            }
            skins.push(SkinData {
                joints,
                inverse_bind_matrices,
            });
        }

        for node in nodes.iter_mut() {
            if node.mesh.is_some() && node.attribute == NodeAttribute::Null {
                node.attribute = NodeAttribute::Mesh;
            }
        }

        let roots = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|node| node.index()).collect(),
            None => (0..nodes.len()).filter(|i| nodes[*i].parent.is_none()).collect(),
        };

        let meshes = document
            .meshes()
            .map(|mesh| read_mesh(&mesh, buffers))
            .collect::<Result<Vec<_>>>()?;

        let clips = document
            .animations()
            .map(|animation| read_clip(&animation, buffers))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            nodes,
            roots,
            skins,
            meshes,
            clips,
            frame_rate: DEFAULT_FRAME_RATE,
        })
    }

    fn local_at(&self, index: usize, seconds: f32) -> Mat4 {
        let (mut translation, mut rotation, mut scale) = self.nodes[index].rest;
        if let Some(channels) = self.clips.first().and_then(|clip| clip.channels.get(&index)) {
            if let Some(t) = channels.translation.as_ref().and_then(|c| c.sample(seconds)) {
                translation = t;
            }
            if let Some(r) = channels.rotation.as_ref().and_then(|c| c.sample(seconds)) {
                rotation = r;
            }
            if let Some(s) = channels.scale.as_ref().and_then(|c| c.sample(seconds)) {
                scale = s;
            }
        }
        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }

    fn global_with(&self, index: usize, local: impl Fn(usize) -> Mat4) -> Mat4 {
        let mut global = Mat4::IDENTITY;
        let mut current = Some(index);
        while let Some(i) = current {
            global = local(i) * global;
            current = self.nodes[i].parent;
        }
        global
    }

    pub fn rest_global_transform(&self, node: GltfNode) -> Mat4 {
        match node {
            GltfNode::Root => Mat4::IDENTITY,
            GltfNode::Node(index) => self.global_with(index, |i| {
                let (t, r, s) = self.nodes[i].rest;
                Mat4::from_scale_rotation_translation(s, r, t)
            }),
        }
    }
}

/// Sets every node's parent from the children lists. The nodes must form a
/// forest: no node with two parents and no cycles.
fn link_parents(nodes: &mut [NodeData]) -> Result<()> {
    for index in 0..nodes.len() {
        for child in nodes[index].children.clone() {
            if let Some(previous) = nodes[child].parent {
                return Err(BakeError::InvalidHierarchy(format!(
                    "node {} is a child of both node {} and node {}",
                    child, previous, index
                )));
            }
            nodes[child].parent = Some(index);
        }
    }

    for start in 0..nodes.len() {
        let mut current = start;
        let mut depth = 0;
        while let Some(parent) = nodes[current].parent {
            depth += 1;
            if depth > nodes.len() {
                return Err(BakeError::InvalidHierarchy(format!(
                    "node {} is its own ancestor",
                    start
                )));
            }
            current = parent;
        }
    }
    Ok(())
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let mut data = MeshData::default();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "skipping non-triangle primitive {} of mesh {}",
                primitive.index(),
                mesh.index()
            );
            continue;
        }
        let indices = read_index_buffer(&primitive, buffers)?;
        if indices.len() % 3 != 0 {
            log::warn!(
                "primitive {} of mesh {} has a non-triangular index count, skipping",
                primitive.index(),
                mesh.index()
            );
            continue;
        }
        let base_vertex = data.control_points.len() as u32;
        data.control_points
            .extend(read_position_buffer(&primitive, buffers)?.into_iter().map(Vec3::from));
        data.triangles.extend(
            indices
                .chunks_exact(3)
                .map(|tri| [tri[0] + base_vertex, tri[1] + base_vertex, tri[2] + base_vertex]),
        );
    }
    Ok(data)
}

fn read_clip(animation: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> Result<ClipData> {
    let mut channels = HashMap::<usize, NodeChannels>::new();
    let mut time_range: Option<(f32, f32)> = None;

    for channel in animation.channels() {
        let target = channel.target();
        let sampler = channel.sampler();
        let times = readf32(&sampler.input(), buffers)?.into_boxed_slice();
        let interpolation = sampler.interpolation().into();

        let entry = channels.entry(target.node().index()).or_default();
        let range = match target.property() {
            gltf::animation::Property::Translation => {
                let values = read3f32(&sampler.output(), buffers)?;
                let channel = Channel {
                    times,
                    values: values.into_iter().map(Vec3::from).collect(),
                    interpolation,
                };
                let range = channel.first_time().zip(channel.last_time());
                entry.translation = Some(channel);
                range
            }
            gltf::animation::Property::Rotation => {
                let values = read4f32(&sampler.output(), buffers)?;
                let channel = Channel {
                    times,
                    values: values.into_iter().map(Quat::from_array).collect(),
                    interpolation,
                };
                let range = channel.first_time().zip(channel.last_time());
                entry.rotation = Some(channel);
                range
            }
            gltf::animation::Property::Scale => {
                let values = read3f32(&sampler.output(), buffers)?;
                let channel = Channel {
                    times,
                    values: values.into_iter().map(Vec3::from).collect(),
                    interpolation,
                };
                let range = channel.first_time().zip(channel.last_time());
                entry.scale = Some(channel);
                range
            }
            gltf::animation::Property::MorphTargetWeights => {
                log::debug!(
                    "ignoring morph target weights on node {} in animation {}",
                    target.node().index(),
                    animation.index()
                );
                None
            }
        };

        if let Some((first, last)) = range {
            time_range = Some(match time_range {
                Some((start, stop)) => (f32::min(start, first), f32::max(stop, last)),
                None => (first, last),
            });
        }
    }

    Ok(ClipData {
        name: animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation{}", animation.index())),
        time_range,
        channels,
    })
}

impl SceneGraph for GltfScene {
    type Node = GltfNode;

    fn root(&self) -> GltfNode {
        GltfNode::Root
    }

    fn children(&self, node: GltfNode) -> Vec<GltfNode> {
        let indices = match node {
            GltfNode::Root => &self.roots,
            GltfNode::Node(index) => &self.nodes[index].children,
        };
        indices.iter().map(|i| GltfNode::Node(*i)).collect()
    }

    fn name(&self, node: GltfNode) -> &str {
        match node {
            GltfNode::Root => "RootNode",
            GltfNode::Node(index) => &self.nodes[index].name,
        }
    }

    fn attribute(&self, node: GltfNode) -> NodeAttribute {
        match node {
            GltfNode::Root => NodeAttribute::Null,
            GltfNode::Node(index) => self.nodes[index].attribute,
        }
    }

    fn geometric_offset(&self, _node: GltfNode) -> GeometricOffset {
        GeometricOffset::default()
    }

    fn skins(&self, mesh: GltfNode) -> Vec<Skin<GltfNode>> {
        let GltfNode::Node(index) = mesh else {
            return vec![];
        };
        let node = &self.nodes[index];
        let (Some(_), Some(skin)) = (node.mesh, node.skin) else {
            return vec![];
        };

        let skin = &self.skins[skin];
        let transform = self.rest_global_transform(mesh);
        let clusters = skin
            .joints
            .iter()
            .zip(&skin.inverse_bind_matrices)
            .map(|(joint, inverse_bind_matrix)| Cluster {
                link: GltfNode::Node(*joint),
                transform,
                // inverse bind matrices are relative to the skinned mesh node
                transform_link: transform * inverse_bind_matrix.inverse(),
            })
            .collect();
        vec![Skin { clusters }]
    }

    fn control_points(&self, mesh: GltfNode) -> Vec<Vec3> {
        self.mesh_data(mesh)
            .map(|data| data.control_points.clone())
            .unwrap_or_default()
    }

    fn triangles(&self, mesh: GltfNode) -> Vec<[u32; 3]> {
        self.mesh_data(mesh)
            .map(|data| data.triangles.clone())
            .unwrap_or_default()
    }

    fn animation_stacks(&self) -> Vec<String> {
        self.clips.iter().map(|clip| clip.name.clone()).collect()
    }

    fn take_info(&self, stack: &str) -> Option<TimeSpan> {
        let clip = self.clips.iter().find(|clip| clip.name == stack)?;
        let (start, stop) = clip.time_range?;
        Some(TimeSpan::new(
            seconds_to_frame(start, self.frame_rate),
            seconds_to_frame(stop, self.frame_rate),
        ))
    }

    fn evaluate_global_transform(&self, node: GltfNode, frame: i64) -> Mat4 {
        match node {
            GltfNode::Root => Mat4::IDENTITY,
            GltfNode::Node(index) => {
                let seconds = (frame as f64 / self.frame_rate) as f32;
                self.global_with(index, |i| self.local_at(i, seconds))
            }
        }
    }
}

impl GltfScene {
    fn mesh_data(&self, node: GltfNode) -> Option<&MeshData> {
        match node {
            GltfNode::Root => None,
            GltfNode::Node(index) => self.nodes[index].mesh.and_then(|mesh| self.meshes.get(mesh)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_snap_to_whole_values() {
        assert_eq!(seconds_to_frame(0.0, 30.0), 0);
        assert_eq!(seconds_to_frame(0.1, 30.0), 3);
        assert_eq!(seconds_to_frame(1.0 / 3.0, 30.0), 10);
        assert_eq!(seconds_to_frame(0.05, 30.0), 1);
        assert_eq!(seconds_to_frame(2.0, 24.0), 48);
    }

    const ARMATURE: &str = r#"{
        "asset": { "version": "2.0" },
        "scenes": [ { "nodes": [0, 3] } ],
        "nodes": [
            { "name": "Armature", "children": [1] },
            { "children": [2], "translation": [0.0, 2.0, 0.0] },
            { "name": "hand" },
            { "name": "light" }
        ],
        "skins": [ { "joints": [1, 2] } ]
    }"#;

    fn bare_node(children: Vec<usize>) -> NodeData {
        NodeData {
            name: String::new(),
            parent: None,
            children,
            rest: (Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
            attribute: NodeAttribute::Null,
            mesh: None,
            skin: None,
        }
    }

    #[test]
    fn parents_follow_children_lists() {
        let mut nodes = vec![bare_node(vec![1, 2]), bare_node(vec![]), bare_node(vec![3]), bare_node(vec![])];
        link_parents(&mut nodes).unwrap();
        let parents: Vec<Option<usize>> = nodes.iter().map(|n| n.parent).collect();
        assert_eq!(parents, vec![None, Some(0), Some(0), Some(2)]);
    }

    #[test]
    fn cyclic_hierarchy_is_rejected() {
        let mut nodes = vec![bare_node(vec![1]), bare_node(vec![2]), bare_node(vec![0])];
        assert!(matches!(link_parents(&mut nodes), Err(BakeError::InvalidHierarchy(_))));

        let mut nodes = vec![bare_node(vec![0])];
        assert!(matches!(link_parents(&mut nodes), Err(BakeError::InvalidHierarchy(_))));
    }

    #[test]
    fn shared_child_is_rejected() {
        let mut nodes = vec![bare_node(vec![2]), bare_node(vec![2]), bare_node(vec![])];
        assert!(matches!(link_parents(&mut nodes), Err(BakeError::InvalidHierarchy(_))));
    }

    #[test]
    fn armature_parent_is_skeletal() {
        let scene = GltfScene::from_slice(ARMATURE.as_bytes()).unwrap();
        let roots = scene.children(scene.root());
        assert_eq!(roots, vec![GltfNode::Node(0), GltfNode::Node(3)]);
        assert_eq!(scene.attribute(GltfNode::Node(0)), NodeAttribute::Skeleton);
        assert_eq!(scene.attribute(GltfNode::Node(3)), NodeAttribute::Null);
        assert_eq!(scene.name(GltfNode::Node(1)), "node1");
        assert!(scene.animation_stacks().is_empty());
        assert_eq!(scene.take_info("animation0"), None);
    }

    #[test]
    fn rest_pose_without_animation() {
        let scene = GltfScene::from_slice(ARMATURE.as_bytes()).unwrap();
        let hand = scene.evaluate_global_transform(GltfNode::Node(2), 12);
        assert_eq!(hand, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        assert_eq!(hand, scene.rest_global_transform(GltfNode::Node(2)));
        assert!(scene.skins(GltfNode::Node(2)).is_empty());
    }
}
