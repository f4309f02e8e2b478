use std::collections::HashMap;

use glam::Mat4;

use crate::error::{BakeError, Result};
use crate::scene_graph::{NodeAttribute, SceneGraph};

/// Where a joint was bound to skin data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinBinding<N> {
    /// Scene node of the joint itself
    pub node: N,
    /// Mesh node the binding cluster belongs to
    pub mesh: N,
    /// Geometric offset of `mesh`, composed into one matrix
    pub geometric_offset: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint<N> {
    pub name: String,
    /// None for the root, otherwise the index of an earlier joint
    pub parent: Option<usize>,
    pub bind_pose_inverse: Mat4,
    pub binding: Option<SkinBinding<N>>,
}

impl<N> Joint<N> {
    fn new(name: String, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            bind_pose_inverse: Mat4::IDENTITY,
            binding: None,
        }
    }

    /// Parent index as written to documents, -1 for the root.
    pub fn parent_index(&self) -> i64 {
        self.parent.map_or(-1, |parent| parent as i64)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Bind data is write-once.
    pub(crate) fn bind(&mut self, binding: SkinBinding<N>, bind_pose_inverse: Mat4) -> Result<()> {
        if self.binding.is_some() {
            return Err(BakeError::DuplicateBinding(self.name.clone()));
        }
        self.binding = Some(binding);
        self.bind_pose_inverse = bind_pose_inverse;
        Ok(())
    }
}

/// Joints in creation order. A joint's position is its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton<N> {
    joints: Vec<Joint<N>>,
}

impl<N> Default for Skeleton<N> {
    fn default() -> Self {
        Self { joints: Vec::new() }
    }
}

impl<N> Skeleton<N> {
    pub fn joints(&self) -> &[Joint<N>] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub(crate) fn joint_mut(&mut self, index: usize) -> Option<&mut Joint<N>> {
        self.joints.get_mut(index)
    }

    fn push(&mut self, joint: Joint<N>) -> usize {
        self.joints.push(joint);
        self.joints.len() - 1
    }

    /// Name to index map; the first joint with a given name wins.
    pub fn name_lookup(&self) -> HashMap<String, usize> {
        let mut lookup = HashMap::with_capacity(self.joints.len());
        for (index, joint) in self.joints.iter().enumerate() {
            if let Some(first) = lookup.get(&joint.name) {
                log::warn!(
                    "duplicate joint name '{}' at index {} (first seen at {}), lookups resolve to {}",
                    joint.name,
                    index,
                    first,
                    first
                );
                continue;
            }
            lookup.insert(joint.name.clone(), index);
        }
        lookup
    }
}

/// Builds the joint hierarchy from the first skeletal child of the scene root.
///
/// Traversal is depth-first pre-order, so every parent is appended before its
/// descendants. Returns an empty skeleton when the root has no skeletal child.
pub fn build_skeleton<S: SceneGraph>(scene: &S) -> Skeleton<S::Node> {
    let mut skeleton = Skeleton::default();

    let skeleton_root = scene
        .children(scene.root())
        .into_iter()
        .find(|child| scene.attribute(*child) == NodeAttribute::Skeleton);
    let Some(skeleton_root) = skeleton_root else {
        log::warn!("no skeleton found under the scene root");
        return skeleton;
    };

    let mut stack = vec![(skeleton_root, None)];
    while let Some((node, parent)) = stack.pop() {
        let index = skeleton.push(Joint::new(scene.name(node).to_string(), parent));
        for child in scene.children(node).into_iter().rev() {
            stack.push((child, Some(index)));
        }
    }

    log::info!(
        "built skeleton with {} joints rooted at '{}'",
        skeleton.len(),
        scene.name(skeleton_root)
    );
    skeleton
}
