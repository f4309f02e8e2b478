use std::collections::HashMap;

use crate::error::{BakeError, Result};
use crate::sampling::{active_clip, ClipInfo};
use crate::scene_graph::{NodeAttribute, SceneGraph};
use crate::skeleton::{Skeleton, SkinBinding};

/// Binds every skin cluster in the scene to its joint and stores the joint's
/// bind pose inverse.
///
/// All mesh nodes reachable from the scene root are visited, not only those
/// under the skeleton. The active clip is looked up when the first cluster is
/// met; `None` is returned when the scene has no clusters at all.
pub fn resolve_bind_poses<S: SceneGraph>(
    scene: &S,
    skeleton: &mut Skeleton<S::Node>,
) -> Result<Option<ClipInfo>> {
    let lookup = skeleton.name_lookup();
    let mut clip = None;

    let mut stack = vec![scene.root()];
    while let Some(node) = stack.pop() {
        if scene.attribute(node) == NodeAttribute::Mesh {
            resolve_mesh(scene, node, skeleton, &lookup, &mut clip)?;
        }
        stack.extend(scene.children(node).into_iter().rev());
    }

    Ok(clip)
}

fn resolve_mesh<S: SceneGraph>(
    scene: &S,
    mesh: S::Node,
    skeleton: &mut Skeleton<S::Node>,
    lookup: &HashMap<String, usize>,
    clip: &mut Option<ClipInfo>,
) -> Result<()> {
    let geometric_offset = scene.geometric_offset(mesh).to_mat4();

    for skin in scene.skins(mesh) {
        for cluster in skin.clusters {
            let joint_name = scene.name(cluster.link);
            let index = *lookup
                .get(joint_name)
                .ok_or_else(|| BakeError::JointNotFound(joint_name.to_string()))?;

            let bind_pose_inverse =
                cluster.transform_link.inverse() * cluster.transform * geometric_offset;
            let binding = SkinBinding {
                node: cluster.link,
                mesh,
                geometric_offset,
            };
            skeleton
                .joint_mut(index)
                .ok_or_else(|| BakeError::JointNotFound(joint_name.to_string()))?
                .bind(binding, bind_pose_inverse)?;
            log::debug!(
                "bound joint {} '{}' through mesh '{}'",
                index,
                joint_name,
                scene.name(mesh)
            );

            if clip.is_none() {
                *clip = Some(active_clip(scene)?);
            }
        }
    }

    Ok(())
}
