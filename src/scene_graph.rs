//! Read-only view of an imported scene.
//!
//! The baking stages only ever talk to a scene through [`SceneGraph`]; the
//! glTF importer and the in-memory scene both implement it.

use std::fmt::Debug;
use std::ops::RangeInclusive;

use glam::{EulerRot, Mat4, Quat, Vec3};

/// What kind of object is attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAttribute {
    Skeleton,
    Mesh,
    Null,
}

/// One joint's binding to a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster<N> {
    /// Joint node driving this cluster
    pub link: N,
    /// World transform of the mesh at bind time
    pub transform: Mat4,
    /// World transform of the joint at bind time
    pub transform_link: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skin<N> {
    pub clusters: Vec<Cluster<N>>,
}

/// Inclusive frame range of an animation take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: i64,
    pub stop: i64,
}

impl TimeSpan {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn is_valid(&self) -> bool {
        self.stop >= self.start
    }

    /// Both endpoints count, so a valid span is at least one frame long.
    pub fn length_in_frames(&self) -> i64 {
        self.stop - self.start + 1
    }

    pub fn frames(&self) -> RangeInclusive<i64> {
        self.start..=self.stop
    }
}

/// Node-local translate/rotate/scale applied to geometry only, not inherited
/// by children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricOffset {
    pub translation: Vec3,
    /// Euler angles in degrees, applied X first, then Y, then Z
    pub rotation: Vec3,
    pub scaling: Vec3,
}

impl Default for GeometricOffset {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scaling: Vec3::ONE,
        }
    }
}

impl GeometricOffset {
    pub fn to_mat4(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            self.rotation.z.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.scaling, rotation, self.translation)
    }
}

pub trait SceneGraph {
    /// Non-owning handle to a node, valid for the lifetime of the scene.
    type Node: Copy + Eq + Debug;

    fn root(&self) -> Self::Node;
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    fn name(&self, node: Self::Node) -> &str;
    fn attribute(&self, node: Self::Node) -> NodeAttribute;
    fn geometric_offset(&self, node: Self::Node) -> GeometricOffset;

    /// Skin deformers attached to a mesh node, empty for anything else.
    fn skins(&self, mesh: Self::Node) -> Vec<Skin<Self::Node>>;
    fn control_points(&self, mesh: Self::Node) -> Vec<Vec3>;
    fn triangles(&self, mesh: Self::Node) -> Vec<[u32; 3]>;

    /// Animation stack names in declaration order.
    fn animation_stacks(&self) -> Vec<String>;
    fn take_info(&self, stack: &str) -> Option<TimeSpan>;
    fn evaluate_global_transform(&self, node: Self::Node, frame: i64) -> Mat4;
}
