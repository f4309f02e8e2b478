//! Static mesh export: the control points and triangles of one mesh, with
//! the handedness flipped for the consuming engine.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{BakeError, Result};
use crate::file_formats::meshfile::{Indices, MeshFile, Vertex, Vertices};
use crate::scene_graph::{NodeAttribute, SceneGraph};

/// Exports the last mesh node met in a pre-order walk of the scene.
pub fn extract_mesh<S: SceneGraph>(scene: &S) -> Result<MeshFile> {
    let mut mesh = None;
    let mut stack = vec![scene.root()];
    while let Some(node) = stack.pop() {
        if scene.attribute(node) == NodeAttribute::Mesh {
            if let Some(previous) = mesh {
                log::debug!("mesh '{}' replaces '{}'", scene.name(node), scene.name(previous));
            }
            mesh = Some(node);
        }
        stack.extend(scene.children(node).into_iter().rev());
    }
    let mesh = mesh.ok_or(BakeError::NoMesh)?;

    let vertex: Vec<Vertex> = scene
        .control_points(mesh)
        .into_iter()
        .map(|p| Vertex {
            x: -p.x,
            y: p.y,
            z: p.z,
        })
        .collect();
    let triangles = scene.triangles(mesh);
    let index = triangles.iter().flat_map(|[a, b, c]| [*c, *b, *a]).collect();

    log::info!(
        "extracted mesh '{}': {} vertices, {} triangles",
        scene.name(mesh),
        vertex.len(),
        triangles.len()
    );

    Ok(MeshFile {
        vertices: Vertices {
            num_vertices: vertex.len(),
            vertex,
        },
        indices: Indices {
            num_triangles: triangles.len(),
            index,
        },
    })
}

pub fn bake_mesh_to_path<S: SceneGraph>(scene: &S, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = extract_mesh(scene)?.to_json()?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}
