//! Scene built in code rather than imported from a file.

use std::collections::BTreeMap;

use glam::{Mat4, Vec3};

use crate::scene_graph::{Cluster, GeometricOffset, NodeAttribute, SceneGraph, Skin, TimeSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct MemoryNode {
    name: String,
    attribute: NodeAttribute,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Mat4,
    /// frame -> local transform, held until the next key
    keyed_locals: BTreeMap<i64, Mat4>,
    geometric_offset: GeometricOffset,
    skins: Vec<Skin<NodeId>>,
    control_points: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl MemoryNode {
    fn new(name: &str, attribute: NodeAttribute, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            attribute,
            parent,
            children: vec![],
            local: Mat4::IDENTITY,
            keyed_locals: BTreeMap::new(),
            geometric_offset: GeometricOffset::default(),
            skins: vec![],
            control_points: vec![],
            triangles: vec![],
        }
    }

    fn local_at(&self, frame: i64) -> Mat4 {
        self.keyed_locals
            .range(..=frame)
            .next_back()
            .map(|(_, local)| *local)
            .unwrap_or(self.local)
    }
}

/// Arena of nodes; `NodeId(0)` is the root.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    nodes: Vec<MemoryNode>,
    stacks: Vec<(String, Option<TimeSpan>)>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            nodes: vec![MemoryNode::new("RootNode", NodeAttribute::Null, None)],
            stacks: vec![],
        }
    }

    pub fn add_node(&mut self, parent: NodeId, name: &str, attribute: NodeAttribute) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MemoryNode::new(name, attribute, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_local_transform(&mut self, node: NodeId, local: Mat4) {
        self.nodes[node.0].local = local;
    }

    pub fn set_keyed_local_transform(&mut self, node: NodeId, frame: i64, local: Mat4) {
        self.nodes[node.0].keyed_locals.insert(frame, local);
    }

    pub fn set_geometric_offset(&mut self, node: NodeId, offset: GeometricOffset) {
        self.nodes[node.0].geometric_offset = offset;
    }

    pub fn add_skin(&mut self, mesh: NodeId, clusters: Vec<Cluster<NodeId>>) {
        self.nodes[mesh.0].skins.push(Skin { clusters });
    }

    pub fn set_mesh_geometry(&mut self, mesh: NodeId, control_points: Vec<Vec3>, triangles: Vec<[u32; 3]>) {
        let node = &mut self.nodes[mesh.0];
        node.control_points = control_points;
        node.triangles = triangles;
    }

    /// A stack without a span models a stack whose take info is missing.
    pub fn add_animation_stack(&mut self, name: &str, span: Option<TimeSpan>) {
        self.stacks.push((name.to_string(), span));
    }

    /// Cluster for `joint` using the joint's and the mesh's current rest
    /// world transforms.
    pub fn rest_cluster(&self, mesh: NodeId, joint: NodeId) -> Cluster<NodeId> {
        Cluster {
            link: joint,
            transform: self.rest_global_transform(mesh),
            transform_link: self.rest_global_transform(joint),
        }
    }

    pub fn rest_global_transform(&self, node: NodeId) -> Mat4 {
        self.global_transform(node, |n| n.local)
    }

    fn global_transform(&self, node: NodeId, local: impl Fn(&MemoryNode) -> Mat4) -> Mat4 {
        let mut global = Mat4::IDENTITY;
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.0];
            global = local(n) * global;
            current = n.parent;
        }
        global
    }
}

impl SceneGraph for MemoryScene {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    fn attribute(&self, node: NodeId) -> NodeAttribute {
        self.nodes[node.0].attribute
    }

    fn geometric_offset(&self, node: NodeId) -> GeometricOffset {
        self.nodes[node.0].geometric_offset
    }

    fn skins(&self, mesh: NodeId) -> Vec<Skin<NodeId>> {
        self.nodes[mesh.0].skins.clone()
    }

    fn control_points(&self, mesh: NodeId) -> Vec<Vec3> {
        self.nodes[mesh.0].control_points.clone()
    }

    fn triangles(&self, mesh: NodeId) -> Vec<[u32; 3]> {
        self.nodes[mesh.0].triangles.clone()
    }

    fn animation_stacks(&self) -> Vec<String> {
        self.stacks.iter().map(|(name, _)| name.clone()).collect()
    }

    fn take_info(&self, stack: &str) -> Option<TimeSpan> {
        self.stacks
            .iter()
            .find(|(name, _)| name == stack)
            .and_then(|(_, span)| *span)
    }

    fn evaluate_global_transform(&self, node: NodeId, frame: i64) -> Mat4 {
        self.global_transform(node, |n| n.local_at(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_locals_hold_until_next_key() {
        let mut scene = MemoryScene::new();
        let root = scene.root();
        let node = scene.add_node(root, "n", NodeAttribute::Null);
        let at = |x: f32| Mat4::from_translation(Vec3::new(x, 0.0, 0.0));
        scene.set_local_transform(node, at(-1.0));
        scene.set_keyed_local_transform(node, 0, at(0.0));
        scene.set_keyed_local_transform(node, 2, at(2.0));

        assert_eq!(scene.evaluate_global_transform(node, -5), at(-1.0));
        assert_eq!(scene.evaluate_global_transform(node, 1), at(0.0));
        assert_eq!(scene.evaluate_global_transform(node, 9), at(2.0));
    }

    #[test]
    fn global_composes_parent_first() {
        let mut scene = MemoryScene::new();
        let root = scene.root();
        let parent = scene.add_node(root, "p", NodeAttribute::Null);
        let child = scene.add_node(parent, "c", NodeAttribute::Null);
        scene.set_local_transform(parent, Mat4::from_scale(Vec3::splat(2.0)));
        scene.set_local_transform(child, Mat4::from_translation(Vec3::X));

        let p = scene.rest_global_transform(child).transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn take_info_of_unknown_stack_is_none() {
        let mut scene = MemoryScene::new();
        scene.add_animation_stack("walk", Some(TimeSpan::new(0, 10)));
        scene.add_animation_stack("broken", None);
        assert_eq!(scene.take_info("walk"), Some(TimeSpan::new(0, 10)));
        assert_eq!(scene.take_info("broken"), None);
        assert_eq!(scene.take_info("run"), None);
        assert_eq!(scene.animation_stacks(), vec!["walk", "broken"]);
    }
}
